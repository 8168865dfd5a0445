//! You.com 检索模块
//!
//! 绑定检索服务凭据与每次查询的结果数，交给引擎使用。适配层只负责构造它，
//! 检索本身由引擎在研究阶段驱动。

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::citations::UrlInfo;

/// You.com 检索 API 默认地址
pub const DEFAULT_BASE_URL: &str = "https://api.ydc-index.io";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 检索错误
#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("You.com API key rejected")]
    Unauthorized,

    #[error("You.com rate limit exceeded")]
    RateLimited,

    #[error("HTTP error {0}: {1}")]
    Http(u16, String),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to parse search response: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct YouSearchResponse {
    #[serde(default)]
    hits: Vec<YouHit>,
}

#[derive(Debug, Deserialize)]
struct YouHit {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    snippets: Vec<String>,
}

impl From<YouHit> for UrlInfo {
    fn from(hit: YouHit) -> Self {
        UrlInfo {
            url: Some(hit.url),
            title: hit.title,
            description: hit.description,
            snippets: hit.snippets,
        }
    }
}

/// 交给引擎的检索设置（不含凭据）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrieverSettings {
    pub provider: String,
    pub k: u32,
    pub base_url: String,
}

/// You.com 检索模块
///
/// `ProcessRunner` 只把 [`YouRM::settings`] 交给外部引擎；`search`、`forward` 与
/// `usage_and_reset` 供在进程内执行检索的 `RunnerFactory` 实现使用。
#[derive(Clone)]
pub struct YouRM {
    api_key: String,
    k: u32,
    base_url: String,
    timeout: Duration,
    client: Client,
    usage: Arc<AtomicUsize>,
}

impl std::fmt::Debug for YouRM {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouRM")
            .field("k", &self.k)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YouRM {
    pub fn new(api_key: impl Into<String>, k: u32) -> Self {
        Self {
            api_key: api_key.into(),
            k,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            client: Client::new(),
            usage: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn settings(&self) -> RetrieverSettings {
        RetrieverSettings {
            provider: "you".to_string(),
            k: self.k,
            base_url: self.base_url.clone(),
        }
    }

    /// 返回累计查询次数并清零
    pub fn usage_and_reset(&self) -> usize {
        self.usage.swap(0, Ordering::SeqCst)
    }

    /// 执行单条查询，最多返回 k 条结果
    pub async fn search(&self, query: &str) -> Result<Vec<UrlInfo>, RetrieverError> {
        self.usage.fetch_add(1, Ordering::SeqCst);
        debug!(query, k = self.k, "You.com search");

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .header("X-API-Key", &self.api_key)
            .query(&[("query", query)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RetrieverError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return match status.as_u16() {
                401 | 403 => Err(RetrieverError::Unauthorized),
                429 => Err(RetrieverError::RateLimited),
                code => Err(RetrieverError::Http(code, error_text)),
            };
        }

        let body: YouSearchResponse = response
            .json()
            .await
            .map_err(|e| RetrieverError::Parse(e.to_string()))?;

        Ok(body
            .hits
            .into_iter()
            .take(self.k as usize)
            .map(UrlInfo::from)
            .collect())
    }

    /// 对多条查询检索并合并结果，跳过排除列表中的 URL
    ///
    /// 单条查询失败只记录警告，不影响其余查询。
    pub async fn forward(&self, queries: &[String], exclude_urls: &[String]) -> Vec<UrlInfo> {
        let excluded: HashSet<&str> = exclude_urls.iter().map(String::as_str).collect();
        let mut collected = Vec::new();

        for query in queries {
            match self.search(query).await {
                Ok(hits) => collected.extend(hits.into_iter().filter(|hit| {
                    hit.url
                        .as_deref()
                        .is_none_or(|url| !excluded.contains(url))
                })),
                Err(e) => warn!(query = %query, error = %e, "You.com search failed"),
            }
        }

        collected
    }
}
