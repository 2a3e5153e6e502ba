//! Session lifecycle: durable rotation families, reuse detection, CSRF
//! issuance and cookie plumbing.

mod cookie;
mod csrf;
mod errors;
mod rotation;
mod storage;
mod types;

pub use cookie::{clear_cookie, get_cookie_from_headers, set_cookie};
pub use csrf::{issue_csrf_token, verify_csrf_token};
pub use errors::SessionError;
pub use rotation::RotationEngine;
pub use storage::SessionStore;
pub use types::{ClientInfo, RevocationReason, Session};
