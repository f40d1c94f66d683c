//! launch-service: turns a startup idea into a streamed, HTML-formatted
//! 48-hour launch framework using one of several LLM providers.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{build_router, AppState, Application};
