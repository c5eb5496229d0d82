//! Background coding session provider.
//!
//! The poller reads session status through [`SessionProvider`]. [`DevinClient`]
//! is the HTTP implementation for the Devin API.

mod client;
mod error;
mod provider;

pub use client::{DEFAULT_DEVIN_API_URL, DevinClient, DevinConfig};
pub use error::DevinApiError;
pub use provider::SessionProvider;
