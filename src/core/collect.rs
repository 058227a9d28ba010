use crate::domain::model::{Credential, Cursor, Profile};
use crate::domain::ports::{CredentialProvider, ProfileSearch};
use crate::utils::error::{HarvestError, Result, SearchError};

/// 搜尋條件與安全上限
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub hashtag: String,
    pub page_size: u32,
    pub max_results: u32,
}

impl SearchQuery {
    pub fn new(hashtag: impl Into<String>, page_size: u32, max_results: u32) -> Self {
        Self {
            hashtag: hashtag.into(),
            page_size: page_size.max(1),
            max_results,
        }
    }
}

#[derive(Debug, Default)]
pub struct Collected {
    pub profiles: Vec<Profile>,
    pub pages: usize,
    pub refreshed: bool,
    /// Set when a malformed page ended paging early.
    pub truncated: bool,
}

/// Pages through the search API until it reports no more results or the cap
/// is reached. The credential is refreshed at most once per collection: when
/// it has expired or a page comes back `Unauthorized`. A `Malformed` page
/// stops paging and keeps what was fetched.
pub async fn collect_profiles<A, S>(
    auth: &A,
    search: &S,
    credential: &mut Credential,
    query: &SearchQuery,
) -> Result<Collected>
where
    A: CredentialProvider + ?Sized,
    S: ProfileSearch + ?Sized,
{
    let cap = query.max_results as usize;
    let mut collected = Collected::default();
    let mut cursor: Option<Cursor> = None;

    while collected.profiles.len() < cap {
        let remaining = (cap - collected.profiles.len()) as u32;
        let page_size = query.page_size.min(remaining);

        if credential.is_expired() && !collected.refreshed {
            tracing::info!("🔑 Credential expired during paging, refreshing");
            *credential = auth.acquire().await?;
            collected.refreshed = true;
        }

        let page = match search
            .search(credential, &query.hashtag, page_size, cursor)
            .await
        {
            Ok(page) => page,
            Err(SearchError::Unauthorized) if !collected.refreshed => {
                tracing::warn!("🔑 Search token rejected, refreshing credential once");
                *credential = auth.acquire().await?;
                collected.refreshed = true;
                continue;
            }
            Err(SearchError::Malformed { message }) => {
                tracing::warn!(
                    "📡 Malformed search page at cursor {:?}, keeping {} profiles already fetched: {}",
                    cursor,
                    collected.profiles.len(),
                    message
                );
                collected.truncated = true;
                break;
            }
            Err(e) => return Err(HarvestError::from(e)),
        };

        collected.pages += 1;
        tracing::debug!(
            "📡 Page {}: {} profiles (cursor {:?} -> {:?})",
            collected.pages,
            page.profiles.len(),
            cursor,
            page.next_cursor
        );
        collected.profiles.extend(page.profiles);

        match page.next_cursor {
            Some(next) if Some(next) == cursor => {
                tracing::warn!("📡 Search cursor did not advance ({}), stopping", next);
                break;
            }
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    collected.profiles.truncate(cap);
    Ok(collected)
}
