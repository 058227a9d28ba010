use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parsing error: {message}")]
    Parse { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    Invalid {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token endpoint rejected client credentials ({status}): {body}")]
    InvalidCredentials { status: u16, body: String },

    #[error("Authorization grant was denied ({status}): {body}")]
    GrantDenied { status: u16, body: String },

    #[error("Authorization cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("Token response could not be decoded: {message}")]
    MalformedResponse { message: String },

    #[error("Authorization prompt failed: {0}")]
    Prompt(#[from] std::io::Error),

    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search request unauthorized (expired or invalid token)")]
    Unauthorized,

    #[error("Search API rate limited after {attempts} attempts")]
    RateLimited {
        attempts: u32,
        retry_after: Option<Duration>,
    },

    #[error("Search response could not be decoded: {message}")]
    Malformed { message: String },

    #[error("Search API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Search request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Sheet service rejected credentials ({status}): {body}")]
    AuthFailure { status: u16, body: String },

    #[error("Sheet quota exceeded after {attempts} attempts")]
    QuotaExceeded {
        attempts: u32,
        retry_after: Option<Duration>,
    },

    #[error("Invalid destination range '{range}': {body}")]
    InvalidRange { range: String, body: String },

    #[error("Sheet API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Sheet request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Append failed after {written} rows were already written: {source}")]
    PartialWrite {
        written: usize,
        #[source]
        source: WriteError,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Search,
    Destination,
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HarvestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarvestError::Config(_) => ErrorCategory::Configuration,
            HarvestError::Auth(_) => ErrorCategory::Authentication,
            HarvestError::Search(_) => ErrorCategory::Search,
            HarvestError::Write(_) | HarvestError::PartialWrite { .. } => {
                ErrorCategory::Destination
            }
            HarvestError::Http(_) => ErrorCategory::Network,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HarvestError::Config(_) => ErrorSeverity::Critical,
            HarvestError::Write(WriteError::InvalidRange { .. }) => ErrorSeverity::Critical,
            HarvestError::Search(SearchError::RateLimited { .. })
            | HarvestError::Write(WriteError::QuotaExceeded { .. })
            | HarvestError::Auth(AuthError::Cancelled { .. })
            | HarvestError::Http(_) => ErrorSeverity::Medium,
            HarvestError::Search(SearchError::Http(_))
            | HarvestError::Write(WriteError::Http(_))
            | HarvestError::Auth(AuthError::Http(_)) => ErrorSeverity::Medium,
            _ => ErrorSeverity::High,
        }
    }

    /// 依錯誤嚴重程度決定程序退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            HarvestError::Config(_) => "Check the configuration file and environment variables",
            HarvestError::Auth(AuthError::Cancelled { .. }) => {
                "Run again and paste the authorization code before the prompt times out"
            }
            HarvestError::Auth(_) => "Verify client_id/client_secret and the redirect URI",
            HarvestError::Search(SearchError::RateLimited { .. }) => {
                "The search API is throttling requests; lengthen poll_interval or lower max_results"
            }
            HarvestError::Search(_) => "Check the search endpoint and the requested hashtag",
            HarvestError::Write(WriteError::InvalidRange { .. }) => {
                "Check spreadsheet_id and sheet_name; the sheet must already exist"
            }
            HarvestError::Write(WriteError::AuthFailure { .. }) => {
                "Check sheet_access_token or the sheet's sharing permissions"
            }
            HarvestError::Write(_) | HarvestError::PartialWrite { .. } => {
                "Inspect the destination sheet; already written rows are not repeated on the next run"
            }
            HarvestError::Http(_) => "Check network connectivity",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Authentication => format!("Could not authenticate: {}", self),
            ErrorCategory::Search => format!("Profile search failed: {}", self),
            ErrorCategory::Destination => format!("Writing to the sheet failed: {}", self),
            ErrorCategory::Network => format!("Network problem: {}", self),
        }
    }
}

/// Pipeline 各階段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Authenticating,
    Searching,
    Filtering,
    Writing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Authenticating => "authenticating",
            Stage::Searching => "searching",
            Stage::Filtering => "filtering",
            Stage::Writing => "writing",
        };
        f.write_str(name)
    }
}

/// 單次執行失敗，附帶失敗階段
#[derive(Error, Debug)]
#[error("[{stage}] {error}")]
pub struct RunFailure {
    pub stage: Stage,
    #[source]
    pub error: HarvestError,
}

impl RunFailure {
    pub fn new(stage: Stage, error: impl Into<HarvestError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_severity() {
        let config = HarvestError::from(ConfigError::Missing {
            field: "hashtag".to_string(),
        });
        assert_eq!(config.exit_code(), 3);

        let auth = HarvestError::from(AuthError::InvalidCredentials {
            status: 401,
            body: String::new(),
        });
        assert_eq!(auth.exit_code(), 1);

        let throttled = HarvestError::from(SearchError::RateLimited {
            attempts: 3,
            retry_after: None,
        });
        assert_eq!(throttled.exit_code(), 2);
    }

    #[test]
    fn test_run_failure_is_stage_tagged() {
        let failure = RunFailure::new(
            Stage::Writing,
            WriteError::InvalidRange {
                range: "Nope!A1:E".to_string(),
                body: "Unable to parse range".to_string(),
            },
        );
        let message = failure.to_string();
        assert!(message.starts_with("[writing]"));
        assert!(message.contains("Nope!A1:E"));
        assert_eq!(failure.error.category(), ErrorCategory::Destination);
    }
}
