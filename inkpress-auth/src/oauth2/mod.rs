//! Consumption of third-party authorization codes.
//!
//! This crate is not an OAuth2 server: the only provider interaction is
//! exchanging a callback code for tokens and fetching the user profile,
//! under an explicit timeout with bounded retries on transient network
//! failures only.

mod client;
mod errors;
mod types;

pub use client::OAuth2Client;
pub use errors::OAuth2Error;
pub use types::{OidcTokenResponse, ProviderUserInfo};
