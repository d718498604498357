// Session engine for Agora: everything but the wire transport.

pub mod api;
pub mod bus;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod session;
pub mod topics;

pub use error::{Error, Result, ValidationError};
