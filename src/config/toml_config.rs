use crate::config::{AuthStrategy, ValueInputOption};
use crate::domain::model::FilterCriteria;
use crate::domain::ports::SheetDestination;
use crate::utils::error::ConfigError;
use crate::utils::retry::RetryPolicy;
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// 執行期設定：啟動時建立一次，之後以參考傳給各元件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auth_strategy: AuthStrategy,
    pub api_key: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub code_timeout_secs: u64,

    pub hashtag: String,
    pub job_title: String,
    pub experience_years: u32,
    pub page_size: u32,
    pub max_results: u32,
    /// Projection sent as the `fields` query parameter; the built-in default when unset.
    pub search_fields: Option<String>,

    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub value_input_option: ValueInputOption,
    pub sheet_access_token: Option<String>,
    pub write_batch_size: usize,
    pub dedupe_against_sheet: bool,

    pub poll_interval: Option<PollInterval>,
    pub request_timeout_secs: u64,

    pub endpoints: Endpoints,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auth_strategy: AuthStrategy::ClientCredentials,
            api_key: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: None,
            scope: None,
            code_timeout_secs: 300,
            hashtag: String::new(),
            job_title: String::new(),
            experience_years: 0,
            page_size: 10,
            max_results: 100,
            search_fields: None,
            spreadsheet_id: String::new(),
            sheet_name: String::new(),
            value_input_option: ValueInputOption::Raw,
            sheet_access_token: None,
            write_batch_size: 500,
            dedupe_against_sheet: true,
            poll_interval: None,
            request_timeout_secs: 30,
            endpoints: Endpoints::default(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub token_url: String,
    pub authorize_url: String,
    pub search_url: String,
    pub sheets_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: "https://www.linkedin.com/oauth/v2/accessToken".to_string(),
            authorize_url: "https://www.linkedin.com/oauth/v2/authorization".to_string(),
            search_url: "https://api.linkedin.com/v2/search".to_string(),
            sheets_base_url: "https://sheets.googleapis.com".to_string(),
        }
    }
}

/// `poll_interval = 900` or `poll_interval = "15m"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PollInterval {
    Seconds(u64),
    Text(String),
}

impl PollInterval {
    pub fn to_duration(&self) -> Result<Duration, ConfigError> {
        let invalid = |value: String, reason: &str| ConfigError::Invalid {
            field: "poll_interval".to_string(),
            value,
            reason: reason.to_string(),
        };

        let secs = match self {
            PollInterval::Seconds(secs) => *secs,
            PollInterval::Text(text) => {
                let text = text.trim();
                let split = text
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(text.len());
                let (number, unit) = text.split_at(split);
                let number: u64 = number
                    .parse()
                    .map_err(|_| invalid(text.to_string(), "Expected a number followed by s, m, h or d"))?;
                let multiplier = match unit.trim() {
                    "" | "s" => 1,
                    "m" => 60,
                    "h" => 3_600,
                    "d" => 86_400,
                    _ => return Err(invalid(text.to_string(), "Unknown unit; use s, m, h or d")),
                };
                number.saturating_mul(multiplier)
            }
        };

        if secs == 0 {
            return Err(invalid(secs.to_string(), "Interval must be greater than zero"));
        }
        Ok(Duration::from_secs(secs))
    }
}

fn env_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

impl Settings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ConfigError::Parse {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LINKEDIN_CLIENT_SECRET})；未設定的保留原樣，交給驗證處理
    fn substitute_env_vars(content: &str) -> String {
        env_placeholder()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// `client_id`, falling back to the bare `api_key`.
    pub fn effective_client_id(&self) -> &str {
        if self.client_id.trim().is_empty() {
            &self.api_key
        } else {
            &self.client_id
        }
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria::new(self.job_title.clone(), self.experience_years)
    }

    pub fn destination(&self) -> SheetDestination {
        SheetDestination::new(self.spreadsheet_id.clone(), self.sheet_name.clone())
    }

    pub fn poll_interval(&self) -> Result<Option<Duration>, ConfigError> {
        self.poll_interval
            .as_ref()
            .map(PollInterval::to_duration)
            .transpose()
    }

    pub fn code_timeout(&self) -> Duration {
        Duration::from_secs(self.code_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_required_string("client_id/api_key", self.effective_client_id())?;
        validation::validate_resolved("client_secret", &self.client_secret)?;

        if self.auth_strategy == AuthStrategy::Interactive {
            let redirect_uri = self.redirect_uri.as_deref().unwrap_or_default();
            validation::validate_url("redirect_uri", redirect_uri)?;
            validation::validate_url("endpoints.authorize_url", &self.endpoints.authorize_url)?;
            validation::validate_positive_number("code_timeout_secs", self.code_timeout_secs, 1)?;
        }

        validation::validate_required_string("hashtag", &self.hashtag)?;
        validation::validate_required_string("job_title", &self.job_title)?;
        validation::validate_range("experience_years", self.experience_years, 0, 80)?;
        validation::validate_range("page_size", self.page_size, 1, 100)?;
        validation::validate_positive_number("max_results", u64::from(self.max_results), 1)?;
        if let Some(fields) = &self.search_fields {
            validation::validate_required_string("search_fields", fields)?;
        }

        validation::validate_required_string("spreadsheet_id", &self.spreadsheet_id)?;
        validation::validate_required_string("sheet_name", &self.sheet_name)?;
        validation::validate_positive_number("write_batch_size", self.write_batch_size as u64, 1)?;
        if let Some(token) = &self.sheet_access_token {
            validation::validate_resolved("sheet_access_token", token)?;
        }

        validation::validate_url("endpoints.token_url", &self.endpoints.token_url)?;
        validation::validate_url("endpoints.search_url", &self.endpoints.search_url)?;
        validation::validate_url("endpoints.sheets_base_url", &self.endpoints.sheets_base_url)?;

        validation::validate_positive_number("retry.max_attempts", u64::from(self.retry.max_attempts), 1)?;
        validation::validate_positive_number("request_timeout_secs", self.request_timeout_secs, 1)?;

        self.poll_interval()?;
        Ok(())
    }
}
