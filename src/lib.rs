//! Purpose: Library crate backing the `flatquery` CLI and tests.
//! Exports: `core` (records, table files, errors) and `api` (request builder, engine).
//! Role: Evaluate SQL-like requests against CSV files, one file per table.
//! Invariants: Every execution reloads tables from disk; nothing is cached between runs.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
