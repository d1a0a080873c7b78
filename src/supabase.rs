//! PostgREST client shared by the remote stores
//!
//! Every table the application touches (chat history, favorites, job
//! postings) is reached through the same `/rest/v1/<table>` surface with the
//! project's `apikey` header and a bearer token.

use crate::config::SupabaseConfig;
use crate::error::{RecruitChatError, Result, StoreError};
use crate::retry::RetryPolicy;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Thin typed wrapper over the PostgREST HTTP API
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    rest_url: String,
    api_key: String,
    bearer: String,
    retry: RetryPolicy,
}

/// A PostgREST filter, e.g. `("session_id", "eq.abc")`
pub type Filter = (&'static str, String);

/// Build an equality filter
pub fn eq(column: &'static str, value: impl std::fmt::Display) -> Filter {
    (column, format!("eq.{}", value))
}

impl SupabaseClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("recruitchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                RecruitChatError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!("Initialized Supabase client: url={}", config.url);

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            bearer: config.bearer_token().to_string(),
            retry: config.retry,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }

    /// `GET /rest/v1/<table>` with filters, ordering and column selection
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[Filter],
    ) -> std::result::Result<Vec<T>, StoreError> {
        let url = self.table_url(table);
        let url = url.as_str();
        self.retry
            .run(
                &format!("select {}", table),
                || async move {
                    let response = self
                        .authorized(self.client.get(url))
                        .query(query)
                        .send()
                        .await
                        .map_err(request_error)?;
                    decode(check_status(response).await?).await
                },
                StoreError::is_transient,
            )
            .await
    }

    /// `POST /rest/v1/<table>` returning the inserted rows
    ///
    /// Only retried on 5xx and 429 answers; a timed-out insert may already
    /// have been stored.
    pub async fn insert<B, T>(
        &self,
        table: &str,
        body: &B,
    ) -> std::result::Result<Vec<T>, StoreError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.table_url(table);
        let url = url.as_str();
        self.retry
            .run(
                &format!("insert {}", table),
                || async move {
                    let response = self
                        .authorized(self.client.post(url))
                        .header("Prefer", "return=representation")
                        .json(body)
                        .send()
                        .await
                        .map_err(request_error)?;
                    decode(check_status(response).await?).await
                },
                StoreError::is_retryable_write,
            )
            .await
    }

    /// `DELETE /rest/v1/<table>` for rows matching every filter
    pub async fn delete(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> std::result::Result<(), StoreError> {
        if filters.is_empty() {
            return Err(StoreError::InvalidInput(
                "refusing to delete without filters".to_string(),
            ));
        }
        let url = self.table_url(table);
        let url = url.as_str();
        self.retry
            .run(
                &format!("delete {}", table),
                || async move {
                    let response = self
                        .authorized(self.client.delete(url))
                        .header("Prefer", "return=minimal")
                        .query(filters)
                        .send()
                        .await
                        .map_err(request_error)?;
                    check_status(response).await.map(|_| ())
                },
                StoreError::is_transient,
            )
            .await
    }
}

fn request_error(e: reqwest::Error) -> StoreError {
    tracing::error!("Supabase request failed: {}", e);
    StoreError::Request(e.to_string())
}

async fn check_status(response: Response) -> std::result::Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.as_u16() == 409 || body.contains(UNIQUE_VIOLATION_CODE) {
        tracing::debug!("Supabase unique violation: {}", body);
        return Err(StoreError::UniqueViolation(body));
    }

    tracing::error!("Supabase returned error {}: {}", status, body);
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(
    response: Response,
) -> std::result::Result<Vec<T>, StoreError> {
    let body = response.text().await.map_err(request_error)?;
    serde_json::from_str(&body).map_err(|e| {
        tracing::error!("Failed to parse Supabase response: {}", e);
        StoreError::Decode(e.to_string())
    })
}
