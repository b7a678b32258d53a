pub mod app;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod error;
pub mod index;
pub mod input;
pub mod logging;
pub mod mailbox;
pub mod query;
pub mod render;
pub mod root;
pub mod terminal;

pub use error::{Error, Result};
