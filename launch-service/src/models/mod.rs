//! Domain models for the launch service.

pub mod session;

pub use session::Session;
