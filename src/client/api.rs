use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::cart::dto::{CartView, ErrorBody, SyncCartRequest, ValidateCartRequest};
use crate::catalog::CatalogProduct;
use crate::config::ClientConfig;
use crate::stock::{StockCheckItem, StockIssue, StockValidation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(String),
    /// The server understood the request and refused it.
    #[error("rejected ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        issues: Vec<StockIssue>,
    },
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    /// Cancelled by a newer push, a cleared cart, or logout.
    #[error("push superseded")]
    Superseded,
}

impl SyncError {
    /// Network trouble and 5xx are worth another try; rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(_) | SyncError::Server { .. })
    }

    pub fn stock_issues(&self) -> &[StockIssue] {
        match self {
            SyncError::Rejected { issues, .. } => issues,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SyncError::Decode(e.to_string())
        } else {
            SyncError::Transport(e.to_string())
        }
    }
}

/// Who the cart belongs to on the server.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub customer_id: Uuid,
    pub access_token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("customer_id", &self.customer_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait CartApi: Send + Sync {
    async fn fetch_cart(&self, session: &Session) -> Result<CartView, SyncError>;
    /// Replace the server cart with `items`.
    async fn sync_cart(
        &self,
        session: &Session,
        items: &[StockCheckItem],
    ) -> Result<CartView, SyncError>;
    async fn validate(&self, items: &[StockCheckItem]) -> Result<StockValidation, SyncError>;
    /// `None` when the product does not exist.
    async fn product(&self, product_id: Uuid) -> Result<Option<CatalogProduct>, SyncError>;
}

/// [`CartApi`] over the HTTP cart endpoints.
#[derive(Debug, Clone)]
pub struct HttpCartApi {
    http: Client,
    base_url: String,
}

impl HttpCartApi {
    pub fn new(config: &ClientConfig) -> Result<Self, SyncError> {
        let http = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder, session: &Session) -> RequestBuilder {
        req.bearer_auth(&session.access_token)
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, SyncError> {
        let res = req.send().await?;
        let res = error_for_status(res).await?;
        Ok(res.json::<T>().await?)
    }
}

async fn error_for_status(res: Response) -> Result<Response, SyncError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_default();
    let (message, issues) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error, body.items),
        Err(_) if text.is_empty() => (status.canonical_reason().unwrap_or("error").to_string(), Vec::new()),
        Err(_) => (text, Vec::new()),
    };
    debug!(status = status.as_u16(), %message, "cart api error response");
    if status.is_server_error() {
        Err(SyncError::Server {
            status: status.as_u16(),
            message,
        })
    } else {
        Err(SyncError::Rejected {
            status: status.as_u16(),
            message,
            issues,
        })
    }
}

#[async_trait]
impl CartApi for HttpCartApi {
    #[instrument(skip(self))]
    async fn fetch_cart(&self, session: &Session) -> Result<CartView, SyncError> {
        let req = self.authed(self.http.get(self.url("/cart")), session);
        Self::send(req).await
    }

    #[instrument(skip(self, items), fields(items = items.len()))]
    async fn sync_cart(
        &self,
        session: &Session,
        items: &[StockCheckItem],
    ) -> Result<CartView, SyncError> {
        let body = SyncCartRequest {
            items: items.to_vec(),
        };
        let req = self.authed(self.http.post(self.url("/cart/sync")), session).json(&body);
        Self::send(req).await
    }

    #[instrument(skip(self, items), fields(items = items.len()))]
    async fn validate(&self, items: &[StockCheckItem]) -> Result<StockValidation, SyncError> {
        let body = ValidateCartRequest {
            items: items.to_vec(),
        };
        Self::send(self.http.post(self.url("/cart/validate")).json(&body)).await
    }

    #[instrument(skip(self))]
    async fn product(&self, product_id: Uuid) -> Result<Option<CatalogProduct>, SyncError> {
        let res = self
            .http
            .get(self.url(&format!("/products/{product_id}/stock")))
            .send()
            .await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let res = error_for_status(res).await?;
        Ok(Some(res.json().await?))
    }
}
