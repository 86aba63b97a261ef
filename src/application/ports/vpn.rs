use async_trait::async_trait;

use crate::app_error::AppResult;

/// A credential minted by the key server.
#[derive(Debug, Clone)]
pub struct VpnKey {
    pub id: String,
    pub access_url: String,
    pub port: Option<u16>,
}

/// The external key-management capability: mint a credential for a label,
/// get back its id and access descriptor. Implementations must fail with a
/// distinguishable error on network/protocol/parse failures and must bound
/// the request with a timeout.
#[async_trait]
pub trait VpnKeyService: Send + Sync {
    async fn create_key(&self, label: &str) -> AppResult<VpnKey>;
}
