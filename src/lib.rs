//! `jt`: a cached command-line companion for a Jira sprint board.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod jira;
pub mod logging;
pub mod record;
pub mod repository;
pub mod vcs;

pub use error::{Error, Result};
