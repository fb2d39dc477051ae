//! ERP session lifecycle: lazy login, cached credential, explicit
//! invalidation on auth failure.

use log::{debug, warn};
use md5::{Digest, Md5};
use tokio::sync::Mutex;

use crate::client::ErpClient;
use crate::error::{ErpClientError, Result};
use crate::types::LoginRequest;

/// ERP connection settings.
#[derive(Debug, Clone)]
pub struct ErpConfig {
    pub base_url: String,
    pub user_name: String,
    pub password: String,
}

impl ErpConfig {
    /// Read the ERP settings from the environment.
    ///
    /// Fails with an authentication error when any of the variables is
    /// missing or blank; a run without credentials must not reach the wire.
    pub fn from_env() -> Result<Self> {
        fn required(name: &'static str) -> Result<String> {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    ErpClientError::auth(format!("Missing ERP configuration: {}", name))
                })
        }

        Ok(Self {
            base_url: required("SHOPLINK_ERP_URL")?,
            user_name: required("SHOPLINK_ERP_USER")?,
            password: required("SHOPLINK_ERP_PASSWORD")?,
        })
    }
}

/// Cached bearer credential plus the session-scoped visitor identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub visitor_id: i64,
}

/// Process-wide mutable session state, made explicit and injectable.
///
/// Both engines share one session; whichever touches the ERP first pays
/// for the login. A 401/403 observed by either engine calls
/// [`ErpSession::invalidate`] so the next call re-authenticates.
pub struct ErpSession {
    config: ErpConfig,
    cached: Mutex<Option<SessionToken>>,
}

impl ErpSession {
    pub fn new(config: ErpConfig) -> Self {
        Self {
            config,
            cached: Mutex::new(None),
        }
    }

    /// One-way password transform required by the ERP login protocol.
    fn password_hash(password: &str) -> String {
        let digest = Md5::digest(password.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Return the cached credential, performing the login handshake first
    /// if none is cached.
    pub async fn ensure_valid(&self, client: &ErpClient) -> Result<SessionToken> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        debug!("No cached ERP session, logging in");
        let response = client
            .login(LoginRequest {
                user_name: self.config.user_name.clone(),
                password_hash: Self::password_hash(&self.config.password),
            })
            .await?;

        let token = SessionToken {
            token: response.token,
            visitor_id: response.visitor_id,
        };
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached credential. Called when the ERP reports an auth
    /// failure so the next run re-authenticates instead of replaying a
    /// stale token.
    pub async fn invalidate(&self) {
        warn!("Invalidating cached ERP session");
        *self.cached.lock().await = None;
    }
}
