//! Seam between the engines and the ERP wire client.
//!
//! The engines talk to [`ErpApi`] only; [`ErpGateway`] is the production
//! implementation binding the HTTP client to the shared session.

use async_trait::async_trait;

use shoplink_core::errors::Error;
use shoplink_erp_client::{
    ErpClient, ErpClientError, ErpConfig, ErpSession, GetAllDataRequest, GetAllDataResponse,
    SaveOrderRequest, SaveOrderResponse, SessionToken,
};

/// ERP operations as the engines see them. Session handling is part of the
/// seam so engine tests never need a live token.
#[async_trait]
pub trait ErpApi: Send + Sync {
    /// Cached credential, logging in first when necessary.
    async fn ensure_session(&self) -> Result<SessionToken, ErpClientError>;

    /// Drop the cached credential after an auth rejection.
    async fn invalidate_session(&self);

    async fn get_all_data(
        &self,
        session: &SessionToken,
        request: GetAllDataRequest,
    ) -> Result<GetAllDataResponse, ErpClientError>;

    async fn save_order(
        &self,
        session: &SessionToken,
        request: SaveOrderRequest,
    ) -> Result<SaveOrderResponse, ErpClientError>;
}

/// HTTP client plus shared session, as one injectable unit.
pub struct ErpGateway {
    client: ErpClient,
    session: ErpSession,
}

impl ErpGateway {
    pub fn new(config: ErpConfig) -> Self {
        let client = ErpClient::new(&config.base_url);
        let session = ErpSession::new(config);
        Self { client, session }
    }
}

#[async_trait]
impl ErpApi for ErpGateway {
    async fn ensure_session(&self) -> Result<SessionToken, ErpClientError> {
        self.session.ensure_valid(&self.client).await
    }

    async fn invalidate_session(&self) {
        self.session.invalidate().await;
    }

    async fn get_all_data(
        &self,
        session: &SessionToken,
        request: GetAllDataRequest,
    ) -> Result<GetAllDataResponse, ErpClientError> {
        self.client.get_all_data(session, request).await
    }

    async fn save_order(
        &self,
        session: &SessionToken,
        request: SaveOrderRequest,
    ) -> Result<SaveOrderResponse, ErpClientError> {
        self.client.save_order(session, request).await
    }
}

/// Map a wire error into the shared taxonomy for logs and summaries.
pub(crate) fn erp_error(err: &ErpClientError) -> Error {
    Error::Unexpected(format!("ERP request failed: {}", err))
}
