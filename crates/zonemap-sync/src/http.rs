//! 基于 HTTP 的区域仓库
//!
//! REST 接口：
//! - `GET    /zones`
//! - `POST   /zones`
//! - `PUT    /zones/{id}`
//! - `DELETE /zones/{id}`
//!
//! 每个请求携带 `Authorization: Bearer <token>`（如已设置）。

use crate::error::{SyncError, SyncResult};
use crate::repository::ZoneRepository;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use zonemap_core::wire::ZoneRecord;
use zonemap_core::zone::PersistedId;

/// 默认请求超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP 区域仓库
#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRepository {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    /// 设置认证令牌
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> SyncResult<reqwest::Response> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        tracing::warn!("Zone request failed with {}: {}", status, text);
        Err(match status {
            StatusCode::UNAUTHORIZED => SyncError::Unauthorized,
            StatusCode::NOT_FOUND => SyncError::NotFound(text),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => SyncError::Rejected(text),
            _ => SyncError::Server(format!("{}: {}", status, text)),
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> SyncResult<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(Into::into)
    }
}

#[async_trait]
impl ZoneRepository for HttpRepository {
    async fn fetch_all(&self) -> SyncResult<Vec<ZoneRecord>> {
        self.json(self.client.get(self.url("zones"))).await
    }

    async fn create(&self, record: &ZoneRecord) -> SyncResult<ZoneRecord> {
        let created: ZoneRecord = self
            .json(self.client.post(self.url("zones")).json(&record.without_id()))
            .await?;
        if created.id.is_none() {
            return Err(SyncError::InvalidResponse(
                "created zone has no id".to_string(),
            ));
        }
        Ok(created)
    }

    async fn update(&self, id: &PersistedId, record: &ZoneRecord) -> SyncResult<ZoneRecord> {
        let path = format!("zones/{}", id);
        self.json(self.client.put(self.url(&path)).json(record)).await
    }

    async fn delete(&self, id: &PersistedId) -> SyncResult<()> {
        let path = format!("zones/{}", id);
        self.send(self.client.delete(self.url(&path))).await?;
        Ok(())
    }
}
