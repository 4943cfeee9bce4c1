//! Local-first flashcards: decks of front/back cards in SQLite, per-day study
//! statistics, and TSV import/export with merge support.

pub mod config;
pub mod db;
pub mod error;
mod import;
pub mod logging;
pub mod models;
mod operations;
pub mod sheets;
pub mod study;
pub mod tsv;
pub mod tui;

pub use db::Database;
pub use error::{Error, Result};
