//! HTTP client, session management and typed wire shapes for the external
//! ERP system.

mod client;
mod error;
mod session;
mod types;

pub use client::ErpClient;
pub use error::{ErpClientError, ErpRetryClass, Result};
pub use session::{ErpConfig, ErpSession, SessionToken};
pub use types::*;
