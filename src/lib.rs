//! backrooms - AI persona conversation relay
//!
//! A fixed rotation of language-model personas take turns replying to the
//! full transcript of one viewer's session. Every provider call is charged
//! against a file-backed daily budget shared by all sessions.

pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod orchestrator;
pub mod persona;
pub mod provider;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
