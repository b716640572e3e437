//! Purpose: Parse SQL-like statements typed at the CLI into engine requests.
//! Exports: `Statement`, `parse_statement`.
//! Role: Front-end adapter; owns no evaluation semantics beyond shaping a `Request`.
//! Invariants: Keywords are case-insensitive; quoted values are taken literally.
//! Invariants: Unquoted values may span several words and keep their inner spacing; they
//! end at WHERE, ORDER, a comma, a parenthesis, `=`, `;`, or the end of input.
//! Invariants: `table.column` qualifiers naming a table in the statement are stripped.
use flatquery::api::{
    Direction, Error, ErrorKind, Filter, ID_COLUMN, Join, Order, Record, Request, Result,
    TableStore,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer, Word};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    Select {
        table: String,
        columns: Vec<String>,
        join: Option<Join>,
        filter: Option<Filter>,
        order: Option<Order>,
    },
    Insert {
        table: String,
        values: Vec<String>,
    },
    Update {
        table: String,
        changes: Vec<(String, String)>,
        filter: Option<Filter>,
    },
    Delete {
        table: String,
        filter: Option<Filter>,
    },
}

impl Statement {
    /// Builds the engine request; inserts read the table header to name their values.
    pub fn into_request(self, store: &TableStore) -> Result<Request> {
        match self {
            Statement::Select {
                table,
                columns,
                join,
                filter,
                order,
            } => {
                let mut request = Request::new().from(table).select(columns);
                if let Some(join) = join {
                    request = request.join(join.left_column, join.table, join.right_column);
                }
                if let Some(filter) = filter {
                    request = request.filter(filter.column, filter.value);
                }
                if let Some(order) = order {
                    request = request.order(order.direction, order.column);
                }
                Ok(request)
            }
            Statement::Insert { table, values } => {
                let header = store.header(&table)?;
                let record = zip_insert_values(&table, &header, values)?;
                Ok(Request::new().insert(table).values(record))
            }
            Statement::Update {
                table,
                changes,
                filter,
            } => {
                let mut request = Request::new()
                    .update(table)
                    .set(changes.into_iter().collect());
                if let Some(filter) = filter {
                    request = request.filter(filter.column, filter.value);
                }
                Ok(request)
            }
            Statement::Delete { table, filter } => {
                let mut request = Request::new().from(table).delete();
                if let Some(filter) = filter {
                    request = request.filter(filter.column, filter.value);
                }
                Ok(request)
            }
        }
    }
}

// Values line up with the full header (a supplied ID is later replaced) or with the
// header minus ID.
fn zip_insert_values(table: &str, header: &[String], values: Vec<String>) -> Result<Record> {
    let data_columns: Vec<&String> = header.iter().filter(|name| *name != ID_COLUMN).collect();
    if !header.is_empty() && values.len() == header.len() {
        return Ok(header.iter().cloned().zip(values).collect());
    }
    if !data_columns.is_empty() && values.len() == data_columns.len() {
        return Ok(data_columns.into_iter().cloned().zip(values).collect());
    }
    Err(Error::new(ErrorKind::InvalidInsert)
        .with_message(format!(
            "mismatch between columns and values: table has {} columns, got {} values",
            header.len(),
            values.len()
        ))
        .with_table(table)
        .with_hint(format!("Columns: {}", header.join(", "))))
}

pub fn parse_statement(input: &str) -> Result<Statement> {
    let tokens = Tokenizer::new(&GenericDialect {}, input)
        .tokenize()
        .map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("cannot read statement: {err}"))
                .with_hint(STATEMENT_HINT)
        })?;
    let mut parser = Parser { tokens, pos: 0 };
    let first = match parser.peek() {
        Some(Token::Word(word)) if word.quote_style.is_none() => word.value.clone(),
        _ => {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("empty or unrecognized statement")
                .with_hint(STATEMENT_HINT));
        }
    };
    match first.to_ascii_uppercase().as_str() {
        "SELECT" => parser.select(),
        "INSERT" => parser.insert(),
        "UPDATE" => parser.update(),
        "DELETE" => parser.delete(),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unknown command: {first}"))
            .with_hint(STATEMENT_HINT)),
    }
}

const STATEMENT_HINT: &str = "Statements start with SELECT, INSERT, UPDATE, or DELETE.";

const CLAUSE_KEYWORDS: &[&str] = &["FROM", "JOIN", "ON", "WHERE", "ORDER", "SET", "VALUES"];

// Bare values run until one of these keywords, or a separator token.
const VALUE_STOP_KEYWORDS: &[&str] = &["WHERE", "ORDER"];

// Walks the tokenizer output; whitespace stays in `tokens` so bare values keep
// their inner spacing, but `peek` and `advance` step over it.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn next_index(&self) -> Option<usize> {
        (self.pos..self.tokens.len())
            .find(|&idx| !matches!(self.tokens[idx], Token::Whitespace(_)))
            .filter(|&idx| self.tokens[idx] != Token::EOF)
    }

    fn peek(&self) -> Option<&Token> {
        self.next_index().map(|idx| &self.tokens[idx])
    }

    fn advance(&mut self) {
        if let Some(idx) = self.next_index() {
            self.pos = idx + 1;
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(word)) if is_keyword(word, keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str, statement: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.syntax_error(statement, &format!("expected {keyword}")))
        }
    }

    fn expect(&mut self, token: &Token, statement: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.syntax_error(statement, &format!("expected `{token}`")))
        }
    }

    fn name_part(&mut self, statement: &str) -> Result<String> {
        match self.peek() {
            Some(Token::Word(word))
                if word.quote_style.is_some() || !is_clause_keyword(&word.value) =>
            {
                let name = word.value.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.syntax_error(statement, "expected a name")),
        }
    }

    /// A column or table name, with `table.column` parts joined back by a dot.
    fn ident(&mut self, statement: &str) -> Result<String> {
        let mut name = self.name_part(statement)?;
        while self.tokens.get(self.pos) == Some(&Token::Period) {
            self.pos += 1;
            name.push('.');
            name.push_str(&self.name_part(statement)?);
        }
        Ok(name)
    }

    fn value(&mut self, statement: &str) -> Result<String> {
        match self.peek() {
            Some(Token::SingleQuotedString(value)) => {
                let value = value.clone();
                self.advance();
                return Ok(value);
            }
            Some(Token::Word(word)) if word.quote_style.is_some() => {
                let value = word.value.clone();
                self.advance();
                return Ok(value);
            }
            _ => {}
        }

        let mut raw = String::new();
        while let Some(token) = self.tokens.get(self.pos) {
            let stop = match token {
                Token::Comma
                | Token::LParen
                | Token::RParen
                | Token::Eq
                | Token::SemiColon
                | Token::EOF => true,
                Token::Word(word) => VALUE_STOP_KEYWORDS
                    .iter()
                    .any(|keyword| is_keyword(word, keyword)),
                _ => false,
            };
            if stop {
                break;
            }
            raw.push_str(&token.to_string());
            self.pos += 1;
        }
        let value = raw.trim();
        if value.is_empty() {
            return Err(self.syntax_error(statement, "expected a value"));
        }
        Ok(value.to_string())
    }

    fn finish(&mut self, statement: &str) -> Result<()> {
        self.eat(&Token::SemiColon);
        if self.peek().is_some() {
            return Err(self.syntax_error(statement, "unexpected trailing input"));
        }
        Ok(())
    }

    fn syntax_error(&self, statement: &str, detail: &str) -> Error {
        let near = match self.peek() {
            Some(token) => format!(" near `{token}`"),
            None => " at end of input".to_string(),
        };
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid {statement} syntax: {detail}{near}"))
            .with_hint(syntax_hint(statement))
    }

    fn where_clause(&mut self, statement: &str) -> Result<Option<Filter>> {
        if !self.eat_keyword("WHERE") {
            return Ok(None);
        }
        let column = self.ident(statement)?;
        self.expect(&Token::Eq, statement)?;
        let value = self.value(statement)?;
        Ok(Some(Filter { column, value }))
    }

    fn select(&mut self) -> Result<Statement> {
        const STMT: &str = "SELECT";
        self.expect_keyword("SELECT", STMT)?;
        let mut columns = Vec::new();
        if !self.eat(&Token::Mul) {
            loop {
                columns.push(self.ident(STMT)?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect_keyword("FROM", STMT)?;
        let table = self.ident(STMT)?;

        let mut join = None;
        if self.eat_keyword("JOIN") {
            let other = self.ident(STMT)?;
            self.expect_keyword("ON", STMT)?;
            let left = self.ident(STMT)?;
            self.expect(&Token::Eq, STMT)?;
            let right = self.ident(STMT)?;
            join = Some(orient_join(&table, other, left, right));
        }

        let mut filter = self.where_clause(STMT)?;
        let mut order = None;
        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY", STMT)?;
            let column = self.ident(STMT)?;
            let direction = if self.eat_keyword("DESC") {
                Direction::Desc
            } else {
                self.eat_keyword("ASC");
                Direction::Asc
            };
            order = Some(Order { column, direction });
        }
        self.finish(STMT)?;

        let tables = [Some(table.as_str()), join.as_ref().map(|join| join.table.as_str())];
        let strip = |name: String| strip_qualifier(name, &tables);
        let columns = columns.into_iter().map(strip).collect();
        if let Some(filter) = filter.as_mut() {
            filter.column = strip(std::mem::take(&mut filter.column));
        }
        if let Some(order) = order.as_mut() {
            order.column = strip(std::mem::take(&mut order.column));
        }
        Ok(Statement::Select {
            table,
            columns,
            join,
            filter,
            order,
        })
    }

    fn insert(&mut self) -> Result<Statement> {
        const STMT: &str = "INSERT";
        self.expect_keyword("INSERT", STMT)?;
        self.expect_keyword("INTO", STMT)?;
        let table = self.ident(STMT)?;
        self.expect_keyword("VALUES", STMT)?;
        self.expect(&Token::LParen, STMT)?;
        let mut values = Vec::new();
        loop {
            values.push(self.value(STMT)?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, STMT)?;
        self.finish(STMT)?;
        Ok(Statement::Insert { table, values })
    }

    fn update(&mut self) -> Result<Statement> {
        const STMT: &str = "UPDATE";
        self.expect_keyword("UPDATE", STMT)?;
        let table = self.ident(STMT)?;
        self.expect_keyword("SET", STMT)?;
        let mut changes = Vec::new();
        loop {
            let column = self.ident(STMT).map_err(invalid_set)?;
            self.expect(&Token::Eq, STMT).map_err(invalid_set)?;
            let value = self.value(STMT).map_err(invalid_set)?;
            changes.push((column, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let filter = self.where_clause(STMT)?;
        self.finish(STMT)?;
        Ok(Statement::Update {
            table,
            changes,
            filter,
        })
    }

    fn delete(&mut self) -> Result<Statement> {
        const STMT: &str = "DELETE";
        self.expect_keyword("DELETE", STMT)?;
        self.expect_keyword("FROM", STMT)?;
        let table = self.ident(STMT)?;
        let filter = self.where_clause(STMT)?;
        self.finish(STMT)?;
        Ok(Statement::Delete { table, filter })
    }
}

fn invalid_set(err: Error) -> Error {
    let message = err.message().unwrap_or("invalid SET clause").to_string();
    Error::new(ErrorKind::InvalidUpdate)
        .with_message(message)
        .with_hint("Format: SET column1=value1, column2=value2")
}

fn is_keyword(word: &Word, keyword: &str) -> bool {
    word.quote_style.is_none() && word.value.eq_ignore_ascii_case(keyword)
}

fn is_clause_keyword(word: &str) -> bool {
    CLAUSE_KEYWORDS
        .iter()
        .any(|keyword| word.eq_ignore_ascii_case(keyword))
}

fn syntax_hint(statement: &str) -> &'static str {
    match statement {
        "SELECT" => {
            "SELECT col[, col]|* FROM t [JOIN u ON t.a = u.b] [WHERE col = value] [ORDER BY col [ASC|DESC]]"
        }
        "INSERT" => "INSERT INTO t VALUES (v1, v2, ...)",
        "UPDATE" => "UPDATE t SET col = value[, col = value] [WHERE col = value]",
        _ => "DELETE FROM t [WHERE col = value]",
    }
}

fn split_qualifier(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((qualifier, column)) if !qualifier.is_empty() && !column.is_empty() => {
            (Some(qualifier), column)
        }
        _ => (None, name),
    }
}

fn strip_qualifier(name: String, tables: &[Option<&str>]) -> String {
    match split_qualifier(&name) {
        (Some(qualifier), column) if tables.iter().any(|table| *table == Some(qualifier)) => {
            column.to_string()
        }
        _ => name,
    }
}

// `ON u.b = t.a` names the joined table first; swap so the left column belongs to `table`.
fn orient_join(table: &str, other: String, left: String, right: String) -> Join {
    let tables = [Some(table), Some(other.as_str())];
    let swap = matches!(split_qualifier(&left).0, Some(q) if q == other && q != table)
        || matches!(split_qualifier(&right).0, Some(q) if q == table && q != other);
    let (left, right) = if swap { (right, left) } else { (left, right) };
    Join {
        left_column: strip_qualifier(left, &tables),
        right_column: strip_qualifier(right, &tables),
        table: other,
    }
}

#[cfg(test)]
mod tests {
    use super::{Statement, parse_statement, zip_insert_values};
    use flatquery::api::{Direction, ErrorKind, Filter, Join, Order};

    fn filter(column: &str, value: &str) -> Option<Filter> {
        Some(Filter {
            column: column.into(),
            value: value.into(),
        })
    }

    #[test]
    fn select_star_with_where() {
        let statement = parse_statement("select * from people where name = 'Hugo Boss'")
            .expect("parse");
        assert_eq!(
            statement,
            Statement::Select {
                table: "people".into(),
                columns: Vec::new(),
                join: None,
                filter: filter("name", "Hugo Boss"),
                order: None,
            }
        );
    }

    #[test]
    fn select_columns_order_desc() {
        let statement =
            parse_statement("SELECT name, age FROM people ORDER BY age DESC;").expect("parse");
        let Statement::Select { columns, order, .. } = statement else {
            panic!("expected select");
        };
        assert_eq!(columns, vec!["name", "age"]);
        assert_eq!(
            order,
            Some(Order {
                column: "age".into(),
                direction: Direction::Desc
            })
        );
    }

    #[test]
    fn join_qualifiers_are_stripped_and_oriented() {
        let statement = parse_statement(
            "SELECT players.Player, birth_state FROM players JOIN data ON data.name=players.Player WHERE Player='Pascal Siakam'",
        )
        .expect("parse");
        let Statement::Select {
            table,
            columns,
            join,
            filter: where_filter,
            ..
        } = statement
        else {
            panic!("expected select");
        };
        assert_eq!(table, "players");
        assert_eq!(columns, vec!["Player", "birth_state"]);
        assert_eq!(
            join,
            Some(Join {
                left_column: "Player".into(),
                table: "data".into(),
                right_column: "name".into(),
            })
        );
        assert_eq!(where_filter, filter("Player", "Pascal Siakam"));
    }

    #[test]
    fn insert_values_keep_quoted_commas() {
        let statement = parse_statement(
            r#"INSERT INTO data VALUES (4553,"Hugo Boss",1990,"March 8, 1979",Trevor Levor)"#,
        )
        .expect("parse");
        assert_eq!(
            statement,
            Statement::Insert {
                table: "data".into(),
                values: vec![
                    "4553".into(),
                    "Hugo Boss".into(),
                    "1990".into(),
                    "March 8, 1979".into(),
                    "Trevor Levor".into(),
                ],
            }
        );
    }

    #[test]
    fn update_multi_set_with_bare_multiword_values() {
        let statement =
            parse_statement("UPDATE data SET name=Hugy Boss, weight=109 WHERE name=Hugo Boss")
                .expect("parse");
        assert_eq!(
            statement,
            Statement::Update {
                table: "data".into(),
                changes: vec![
                    ("name".into(), "Hugy Boss".into()),
                    ("weight".into(), "109".into()),
                ],
                filter: filter("name", "Hugo Boss"),
            }
        );
    }

    #[test]
    fn bare_values_keep_inner_spacing() {
        let statement =
            parse_statement("INSERT INTO p VALUES (  Hugo  Boss , 1990-01-02 )").expect("parse");
        assert_eq!(
            statement,
            Statement::Insert {
                table: "p".into(),
                values: vec!["Hugo  Boss".into(), "1990-01-02".into()],
            }
        );

        let statement =
            parse_statement("SELECT * FROM p WHERE name = Hugo  Boss ORDER BY name").expect("parse");
        let Statement::Select { filter: f, .. } = statement else {
            panic!("expected select");
        };
        assert_eq!(f, filter("name", "Hugo  Boss"));
    }

    #[test]
    fn delete_without_where() {
        let statement = parse_statement("DELETE FROM data").expect("parse");
        assert_eq!(
            statement,
            Statement::Delete {
                table: "data".into(),
                filter: None,
            }
        );
    }

    #[test]
    fn doubled_quotes_escape() {
        let statement =
            parse_statement("DELETE FROM t WHERE name = 'O''Neal'").expect("parse");
        let Statement::Delete { filter: f, .. } = statement else {
            panic!("expected delete");
        };
        assert_eq!(f, filter("name", "O'Neal"));
    }

    #[test]
    fn unknown_and_malformed_statements_are_usage_errors() {
        let err = parse_statement("DROP TABLE t").expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.message().unwrap_or_default().contains("DROP"));

        let err = parse_statement("SELECT name people").expect_err("no from");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = parse_statement("DELETE FROM t WHERE name = 'open").expect_err("quote");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn broken_set_clause_is_invalid_update() {
        let err = parse_statement("UPDATE t SET = 3").expect_err("set");
        assert_eq!(err.kind(), ErrorKind::InvalidUpdate);
    }

    #[test]
    fn insert_values_zip_with_or_without_id() {
        let header = vec!["ID".to_string(), "name".to_string()];
        let with_id = zip_insert_values("t", &header, vec!["9".into(), "A".into()]).expect("zip");
        assert_eq!(with_id.get("ID"), Some("9"));
        assert_eq!(with_id.get("name"), Some("A"));

        let without_id = zip_insert_values("t", &header, vec!["A".into()]).expect("zip");
        assert_eq!(without_id.iter().collect::<Vec<_>>(), vec![("name", "A")]);

        let err = zip_insert_values("t", &header, vec!["A".into(), "B".into(), "C".into()])
            .expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::InvalidInsert);
    }
}
