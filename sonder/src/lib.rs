//! Sonder - interaction engine for a physics symbol picker
//!
//! Filters a fixed symbol catalog by free-text query, drives keyboard focus
//! over the filtered view, copies symbols in several textual formats and keeps
//! a persisted list of recently used symbols.
//!
//! Types are exported via UniFFI proc-macros (#[derive(uniffi::Record/Enum)]).

mod clipboard;
pub mod database;
pub mod filter;
pub mod interface;
pub mod location;
pub mod logging;
pub mod models;
pub mod navigator;
mod persist;
pub mod recency;
mod store;

pub use clipboard::{ClipboardPort, CopyFeedback};
pub use interface::*;
pub use persist::PersistQueue;
pub use store::{EventRunSummary, SymbolSession};

uniffi::setup_scaffolding!("sonder");
