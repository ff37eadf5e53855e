//! Request dispatch.
//!
//! This module handles:
//! - Sending resolved requests over HTTP
//! - Wrapping responses in a [`ResponseEnvelope`]

pub mod client;
pub mod envelope;

pub use client::{join_url, DispatchHandle, Dispatcher};
pub use envelope::ResponseEnvelope;
