//! Public API: the request builder, the engine, and the core types they carry.

mod engine;
mod request;

pub use crate::core::error::{Error, ErrorKind, Result, to_exit_code};
pub use crate::core::record::{ID_COLUMN, Record};
pub use crate::core::store::{StoreOptions, Table, TableStore};
pub use engine::{DELETED, Engine, INSERTED, Outcome, UPDATED};
pub use request::{Direction, Filter, Join, Order, Query, ReadSpec, Request};
