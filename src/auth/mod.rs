//! Authentication: token expiry, Hub HTTP client, session resolution.

mod client;
pub mod jwt;
mod local;
mod session;

pub use client::{serialize_query, HubHttpClient, HTTP_TIMEOUT};
pub use local::{FileConfigSource, HttpConfigSource, LocalConfigSource, StaticConfigSource};
pub use session::{Session, SessionResolver};
