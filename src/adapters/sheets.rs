use crate::config::ValueInputOption;
use crate::domain::model::{AppendReceipt, Credential, SheetRow};
use crate::domain::ports::{SheetDestination, SheetSink};
use crate::utils::error::{ConfigError, WriteError};
use crate::utils::retry::{parse_retry_after, RetryPolicy};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_range: Option<String>,
    #[serde(default)]
    updated_rows: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// 試算表 values API：append 追加列、讀取 A 欄作為去重依據
pub struct HttpSheetWriter {
    client: Client,
    base_url: Url,
    value_input: ValueInputOption,
    static_token: Option<String>,
    retry: RetryPolicy,
}

impl HttpSheetWriter {
    pub fn new(
        client: Client,
        base_url: &str,
        value_input: ValueInputOption,
        retry: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url).map_err(|e| ConfigError::Invalid {
            field: "endpoints.sheets_base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            base_url,
            value_input,
            static_token: None,
            retry,
        })
    }

    /// A dedicated sheet token instead of the run credential.
    pub fn with_static_token(mut self, token: Option<String>) -> Self {
        self.static_token = token.filter(|t| !t.is_empty());
        self
    }

    fn bearer<'a>(&'a self, credential: &'a Credential) -> &'a str {
        self.static_token.as_deref().unwrap_or(credential.token())
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{suffix}`, each part percent-encoded.
    fn values_url(&self, destination: &SheetDestination, range: &str, suffix: &str) -> Url {
        let mut url = self.base_url.clone();
        let target = format!("{}{}", range, suffix);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "v4",
                "spreadsheets",
                destination.spreadsheet_id.as_str(),
                "values",
                target.as_str(),
            ]);
        }
        url
    }

    async fn send_with_quota_retry<F>(&self, request: F) -> Result<Response, WriteError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = request().send().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            let retry_after = parse_retry_after(response.headers());
            if attempt >= self.retry.max_attempts() {
                return Err(WriteError::QuotaExceeded {
                    attempts: attempt,
                    retry_after,
                });
            }
            let Some(delay) = self.retry.delay(attempt, retry_after) else {
                tracing::warn!(
                    "📝 Sheet quota exceeded; server asked to wait {:?}, leaving it to the next cycle",
                    retry_after
                );
                return Err(WriteError::QuotaExceeded {
                    attempts: attempt,
                    retry_after,
                });
            };
            tracing::warn!(
                "📝 Sheet quota exceeded (attempt {}/{}), waiting {:?}",
                attempt,
                self.retry.max_attempts(),
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn check_status(response: Response, range: &str) -> Result<Response, WriteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => WriteError::AuthFailure {
                status: status.as_u16(),
                body,
            },
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => WriteError::InvalidRange {
                range: range.to_string(),
                body,
            },
            _ => WriteError::Api {
                status: status.as_u16(),
                body,
            },
        })
    }
}

#[async_trait]
impl SheetSink for HttpSheetWriter {
    async fn append(
        &self,
        credential: &Credential,
        destination: &SheetDestination,
        rows: &[SheetRow],
    ) -> Result<AppendReceipt, WriteError> {
        if rows.is_empty() {
            return Ok(AppendReceipt::default());
        }

        let range = destination.append_range();
        let url = self.values_url(destination, &range, ":append");
        let body = ValueRange {
            range: &range,
            major_dimension: "ROWS",
            values: rows.iter().map(SheetRow::cells).collect(),
        };
        let token = self.bearer(credential);

        tracing::debug!("📝 Appending {} rows to {}", rows.len(), range);
        let response = self
            .send_with_quota_retry(|| {
                self.client
                    .post(url.clone())
                    .bearer_auth(token)
                    .query(&[
                        ("valueInputOption", self.value_input.as_str()),
                        ("insertDataOption", "INSERT_ROWS"),
                    ])
                    .json(&body)
            })
            .await?;
        let response = Self::check_status(response, &range).await?;

        // 回應內容只用於回報，解析失敗不影響已完成的寫入
        let text = response.text().await.unwrap_or_default();
        let updates = serde_json::from_str::<AppendResponse>(&text)
            .unwrap_or_default()
            .updates
            .unwrap_or_default();

        Ok(AppendReceipt {
            updated_range: updates.updated_range,
            updated_rows: updates.updated_rows.unwrap_or(rows.len()),
        })
    }

    async fn existing_ids(
        &self,
        credential: &Credential,
        destination: &SheetDestination,
    ) -> Result<Vec<String>, WriteError> {
        let range = destination.id_column_range();
        let url = self.values_url(destination, &range, "");
        let token = self.bearer(credential);

        let response = self
            .send_with_quota_retry(|| {
                self.client
                    .get(url.clone())
                    .bearer_auth(token)
                    .query(&[("majorDimension", "ROWS")])
            })
            .await?;
        let response = Self::check_status(response, &range).await?;

        let values: ValuesResponse = response.json().await?;
        Ok(values
            .values
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(|cell| match cell {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .filter(|id| !id.is_empty())
            .collect())
    }
}
