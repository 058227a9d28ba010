#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use toml_config::{Endpoints, PollInterval, Settings};

use serde::{Deserialize, Serialize};

/// 取得 token 的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthStrategy {
    ClientCredentials,
    Interactive,
}

/// How the sheet service interprets appended cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueInputOption {
    #[serde(rename = "RAW", alias = "raw")]
    Raw,
    #[serde(rename = "USER_ENTERED", alias = "user-entered", alias = "interpreted")]
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}
