//! Authentication with the earth-observation service.
//!
//! Two seams:
//! - [`Authenticator`] obtains an access token once, at startup
//! - [`CloudAuth`] adds authentication headers to each outgoing request

pub mod service_account;

pub use service_account::{ServiceAccountAuth, ServiceAccountKey};

use async_trait::async_trait;

use crate::error::Result;

/// Trait for signing HTTP requests to the earth-observation service.
///
/// Implementations add authentication headers (e.g. Bearer tokens)
/// to outgoing requests before they are sent.
pub trait CloudAuth: Send + Sync {
    /// Sign a request by adding authentication headers.
    ///
    /// `url` is the full request URL, `headers` is a mutable map where
    /// auth headers should be inserted.
    fn sign_request(
        &self,
        url: &str,
        method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()>;
}

/// Two-phase startup handshake: obtain a token, then initialize the
/// service with it.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials for an access token.
    async fn authenticate(&self) -> Result<String>;

    /// Finish initialization with the freshly issued token.
    async fn initialize(&self, _token: &str) -> Result<()> {
        Ok(())
    }
}

/// A pre-issued access token, used as-is.
pub struct StaticToken(pub String);

#[async_trait]
impl Authenticator for StaticToken {
    async fn authenticate(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
