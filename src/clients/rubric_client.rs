/// 评分数据 HTTP 客户端
///
/// 拉取远程的评分分析 JSON；失败时退回内置样例数据
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, FileError, SourceError};
use crate::models::{fallback_dataset, RubricDataset};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// 评分数据客户端
pub struct RubricClient {
    client: Client,
    url: String,
}

impl RubricClient {
    /// 创建新的客户端
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }

    /// 拉取评分数据
    pub async fn fetch(&self) -> AppResult<RubricDataset> {
        debug!("正在拉取评分数据: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| SourceError::RequestFailed {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::BadStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|source| SourceError::RequestFailed {
                url: self.url.clone(),
                source,
            })?;

        RubricDataset::from_json_str(&body).map_err(|source| {
            AppError::File(FileError::JsonParseFailed {
                path: self.url.clone(),
                source,
            })
        })
    }

    /// 拉取评分数据，任何失败都退回内置样例
    ///
    /// # 返回
    /// `(数据, 是否来自远程)`
    pub async fn fetch_or_fallback(&self) -> (RubricDataset, bool) {
        match self.fetch().await {
            Ok(dataset) if !dataset.is_empty() => (dataset, true),
            Ok(_) => {
                warn!("⚠️ 远程评分数据为空，使用内置样例数据");
                (fallback_dataset(), false)
            }
            Err(e) => {
                warn!("⚠️ 拉取评分数据失败，使用内置样例数据: {}", e);
                (fallback_dataset(), false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_source_falls_back() {
        // 端口 9 (discard) 在测试环境中不会有 HTTP 服务
        let client = RubricClient::new("http://127.0.0.1:9/rubric-analysis.json");
        let (dataset, remote) = client.fetch_or_fallback().await;
        assert!(!remote);
        assert_eq!(dataset.len(), fallback_dataset().len());
    }

    #[tokio::test]
    async fn test_fetch_reports_request_failure() {
        let client = RubricClient::new("http://127.0.0.1:9/rubric-analysis.json");
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Source(SourceError::RequestFailed { .. })
        ));
    }

    #[tokio::test]
    #[ignore] // 需要网络：cargo test -- --ignored
    async fn test_fetch_remote_dataset() {
        let url = std::env::var("RUBRIC_SOURCE_URL").expect("需要设置 RUBRIC_SOURCE_URL");
        let dataset = RubricClient::new(url).fetch().await.expect("拉取失败");
        assert!(!dataset.is_empty());
    }
}
