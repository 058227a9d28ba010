use crate::domain::model::{AppendReceipt, Credential, Cursor, SearchPage, SheetRow};
use crate::utils::error::{AuthError, SearchError, WriteError};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn acquire(&self) -> Result<Credential, AuthError>;
}

#[async_trait]
pub trait ProfileSearch: Send + Sync {
    /// Fetches a single page of results.
    async fn search(
        &self,
        credential: &Credential,
        hashtag: &str,
        page_size: u32,
        cursor: Option<Cursor>,
    ) -> Result<SearchPage, SearchError>;
}

/// 試算表目的地
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDestination {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl SheetDestination {
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    /// Sheet names with anything beyond `[A-Za-z0-9_]` must be quoted in A1 notation.
    pub fn quoted_sheet_name(&self) -> String {
        let plain = !self.sheet_name.is_empty()
            && self
                .sheet_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain {
            self.sheet_name.clone()
        } else {
            format!("'{}'", self.sheet_name.replace('\'', "''"))
        }
    }

    pub fn append_range(&self) -> String {
        format!("{}!A1:E", self.quoted_sheet_name())
    }

    pub fn id_column_range(&self) -> String {
        format!("{}!A:A", self.quoted_sheet_name())
    }
}

#[async_trait]
pub trait SheetSink: Send + Sync {
    async fn append(
        &self,
        credential: &Credential,
        destination: &SheetDestination,
        rows: &[SheetRow],
    ) -> Result<AppendReceipt, WriteError>;

    /// Ids already present in the destination's first column.
    async fn existing_ids(
        &self,
        _credential: &Credential,
        _destination: &SheetDestination,
    ) -> Result<Vec<String>, WriteError> {
        Ok(Vec::new())
    }
}

/// 互動授權時顯示網址並讀取授權碼（同步、會阻塞）
pub trait AuthPrompt: Send + Sync {
    fn present(&self, authorization_url: &Url);

    /// Waits at most `timeout` for one line. `Ok(None)` means the input was
    /// closed; running out of time is an `ErrorKind::TimedOut` error.
    fn read_code(&self, timeout: Duration) -> std::io::Result<Option<String>>;
}
