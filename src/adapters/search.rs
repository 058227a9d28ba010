use crate::domain::model::{Credential, Cursor, Profile, SearchPage};
use crate::domain::ports::ProfileSearch;
use crate::utils::error::SearchError;
use crate::utils::retry::{parse_retry_after, RetryPolicy};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

pub const DEFAULT_FIELDS: &str =
    "id,firstName,lastName,headline,publicProfileUrl,positions:(title,startDate,endDate)";

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    elements: Vec<serde_json::Value>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    start: Option<u32>,
    #[serde(default)]
    total: Option<u32>,
}

/// 搜尋 API 的 HTTP 用戶端，一次取一頁
pub struct HttpProfileSearch {
    client: Client,
    search_url: String,
    fields: String,
    retry: RetryPolicy,
}

impl HttpProfileSearch {
    pub fn new(client: Client, search_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            fields: DEFAULT_FIELDS.to_string(),
            retry,
        }
    }

    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = fields.into();
        self
    }
}

/// Decodes one page. Elements are decoded one by one so a single bad element
/// does not sink the batch.
pub fn decode_page(body: &str, start: u32, page_size: u32) -> Result<SearchPage, SearchError> {
    let envelope: SearchEnvelope =
        serde_json::from_str(body).map_err(|e| SearchError::Malformed {
            message: e.to_string(),
        })?;

    let returned = envelope.elements.len() as u32;
    let profiles: Vec<Profile> = envelope
        .elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| match serde_json::from_value(element) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("📡 Skipping undecodable element {} at offset {}: {}", index, start, e);
                None
            }
        })
        .collect();

    let page_start = envelope
        .paging
        .as_ref()
        .and_then(|p| p.start)
        .unwrap_or(start);
    let consumed = page_start.saturating_add(returned);

    let next_cursor = if returned == 0 {
        None
    } else if let Some(total) = envelope.paging.as_ref().and_then(|p| p.total) {
        (consumed < total).then(|| Cursor::from_offset(consumed))
    } else if returned < page_size {
        None
    } else {
        Some(Cursor::from_offset(consumed))
    };

    Ok(SearchPage {
        profiles,
        next_cursor,
    })
}

#[async_trait]
impl ProfileSearch for HttpProfileSearch {
    async fn search(
        &self,
        credential: &Credential,
        hashtag: &str,
        page_size: u32,
        cursor: Option<Cursor>,
    ) -> Result<SearchPage, SearchError> {
        let start = cursor.map(|c| c.offset()).unwrap_or(0);
        let filter = format!("hashtag:{}", hashtag);
        let count = page_size.to_string();
        let offset = start.to_string();
        let query = [
            ("q", filter.as_str()),
            ("count", count.as_str()),
            ("start", offset.as_str()),
            ("fields", self.fields.as_str()),
        ];

        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!(
                "📡 Search request to {} (start={}, count={}, attempt {})",
                self.search_url,
                start,
                page_size,
                attempt
            );

            let response = self
                .client
                .get(&self.search_url)
                .bearer_auth(credential.token())
                .query(&query)
                .send()
                .await?;

            let status = response.status();
            tracing::debug!("📡 Search response status: {}", status);

            if status == StatusCode::UNAUTHORIZED {
                return Err(SearchError::Unauthorized);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = parse_retry_after(response.headers());
                if attempt >= self.retry.max_attempts() {
                    return Err(SearchError::RateLimited {
                        attempts: attempt,
                        retry_after,
                    });
                }
                let Some(delay) = self.retry.delay(attempt, retry_after) else {
                    tracing::warn!(
                        "📡 Search rate limited; server asked to wait {:?}, leaving it to the next cycle",
                        retry_after
                    );
                    return Err(SearchError::RateLimited {
                        attempts: attempt,
                        retry_after,
                    });
                };
                tracing::warn!(
                    "📡 Search rate limited (attempt {}/{}), waiting {:?}",
                    attempt,
                    self.retry.max_attempts(),
                    delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SearchError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response.text().await?;
            return decode_page(&body, start, page_size);
        }
    }
}
