//! tasktrack - personal task tracking library
//!
//! Tasks live in an in-memory cache that mirrors a local document store.
//! Every change is written to the store first and only then applied to the
//! cache, so a failed write leaves both sides as they were.
//!
//! # Module Organization
//!
//! - `task`: Task entity, field validation and id generation
//! - `store`: Store contract and the file-backed document store
//! - `manager`: Cache, filtering, sorting and write-through operations
//! - `events`: Structured domain events written as JSON lines
//! - `config`: Configuration loading from `tasktrack.toml`
//! - `output`: JSON envelopes and human-readable tables
//! - `cli`: Command-line interface and interactive shell
//! - `error`: Error types and result aliases
//! - `storage`: Data directory layout and JSONL files
//! - `lock`: File locking and atomic writes

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod lock;
pub mod manager;
pub mod output;
pub mod storage;
pub mod store;
pub mod task;

pub use error::{Error, Result};
