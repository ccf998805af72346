//! OPSQ - Support-Queue Dispatcher
//!
//! Maintains a rotating roster of operators tagged by language capability,
//! assigns incoming tasks to the first eligible operator in the queue, and
//! defers unmatched tasks to an awaiting list reconciled when operators
//! join.

pub mod audit;
pub mod collab;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod server;
pub mod slack;
pub mod store;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
