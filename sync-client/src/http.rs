//! HTTP client for the sync server API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::message::Notification;
use shared::models::Customer;
use shared::order::{
    AmendmentDelta, AmendmentResponseRequest, DeletedResponse, Order, OrderSnapshotDto,
    OrderStatusResponse, ProposeAmendmentRequest, StatusUpdateRequest, SyncResult,
};

use crate::{ClientConfig, ClientError, ClientResult};

/// Tenant header checked by the server against the token
const TENANT_HEADER: &str = "X-Tenant-ID";

/// Push/pull seam used by [`crate::SyncWorker`]
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// POST the offline batch, returns one result per snapshot
    async fn push(&self, batch: &[OrderSnapshotDto]) -> ClientResult<Vec<SyncResult>>;

    /// GET the server's recent orders
    async fn pull(&self) -> ClientResult<Vec<OrderSnapshotDto>>;
}

/// HTTP client for making network requests to the sync server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    tenant_id: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            tenant_id: config.tenant_id.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach bearer token and tenant header
    fn authorize(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(tenant_id) = &self.tenant_id {
            request = request.header(TENANT_HEADER, tenant_id);
        }
        request
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.authorize(self.client.get(self.url(path)));
        Self::handle_response(request.send().await?).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        Self::handle_response(request.send().await?).await
    }

    /// Make a POST request without body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.authorize(self.client.post(self.url(path)));
        Self::handle_response(request.send().await?).await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.authorize(self.client.delete(self.url(path)));
        Self::handle_response(request.send().await?).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::CONFLICT => Err(ClientError::Conflict(text)),
                StatusCode::BAD_REQUEST => Err(ClientError::Validation(text)),
                _ => Err(ClientError::Internal(text)),
            };
        }

        response.json().await.map_err(Into::into)
    }

    // ========== Sync API ==========

    /// Push offline snapshots
    pub async fn sync_orders(&self, batch: &[OrderSnapshotDto]) -> ClientResult<Vec<SyncResult>> {
        self.post("/api/sync/orders", batch).await
    }

    /// Pull the most recent orders (snapshot shape)
    pub async fn fetch_orders(&self) -> ClientResult<Vec<OrderSnapshotDto>> {
        self.get("/api/orders").await
    }

    // ========== Order API ==========

    pub async fn get_order(&self, order_id: &str) -> ClientResult<Order> {
        self.get(&format!("/api/orders/{}", order_id)).await
    }

    pub async fn update_status(
        &self,
        order_id: &str,
        request: &StatusUpdateRequest,
    ) -> ClientResult<OrderStatusResponse> {
        self.post(&format!("/api/orders/{}/status", order_id), request)
            .await
    }

    pub async fn propose_amendment(
        &self,
        order_id: &str,
        deltas: Vec<AmendmentDelta>,
    ) -> ClientResult<OrderStatusResponse> {
        self.post(
            &format!("/api/orders/{}/propose-amendment", order_id),
            &ProposeAmendmentRequest { deltas },
        )
        .await
    }

    pub async fn respond_amendment(
        &self,
        order_id: &str,
        request: &AmendmentResponseRequest,
    ) -> ClientResult<OrderStatusResponse> {
        self.post(&format!("/api/orders/{}/respond-amendment", order_id), request)
            .await
    }

    pub async fn delete_order(&self, order_id: &str) -> ClientResult<DeletedResponse> {
        self.delete(&format!("/api/orders/{}", order_id)).await
    }

    // ========== Customer API ==========

    pub async fn get_customer(&self, customer_id: &str) -> ClientResult<Customer> {
        self.get(&format!("/api/customers/{}", customer_id)).await
    }

    pub async fn delete_customer(&self, customer_id: &str) -> ClientResult<DeletedResponse> {
        self.delete(&format!("/api/customers/{}", customer_id)).await
    }

    // ========== Notification API ==========

    /// Durable notifications for the caller's role
    pub async fn notifications(&self) -> ClientResult<Vec<Notification>> {
        self.get("/api/notifications").await
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> ClientResult<()> {
        self.post_empty::<shared::ApiResponse<()>>(&format!(
            "/api/notifications/{}/read",
            notification_id
        ))
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SyncTransport for HttpClient {
    async fn push(&self, batch: &[OrderSnapshotDto]) -> ClientResult<Vec<SyncResult>> {
        self.sync_orders(batch).await
    }

    async fn pull(&self) -> ClientResult<Vec<OrderSnapshotDto>> {
        self.fetch_orders().await
    }
}
