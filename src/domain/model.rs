use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 缺欄位與 `null` 一律視為零值
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts either a plain array or the `{ "values": [...] }` envelope.
fn positions_field<'de, D>(deserializer: D) -> Result<Vec<Position>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Positions {
        List(Vec<Position>),
        Wrapped {
            #[serde(default)]
            values: Vec<Position>,
        },
    }

    Ok(match Option::<Positions>::deserialize(deserializer)? {
        Some(Positions::List(list)) => list,
        Some(Positions::Wrapped { values }) => values,
        None => Vec::new(),
    })
}

/// Year 0 means the date was absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearMonth {
    #[serde(default, deserialize_with = "null_as_default")]
    pub year: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub month: i32,
}

impl YearMonth {
    pub const fn new(year: i32, month: i32) -> Self {
        Self { year, month }
    }

    pub fn current() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self::new(at.year(), at.month() as i32)
    }

    pub fn is_absent(&self) -> bool {
        self.year == 0
    }

    /// `i64` so that absurd years from the API cannot overflow.
    pub fn total_months(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(
        default,
        rename = "startDate",
        alias = "start",
        deserialize_with = "null_as_default"
    )]
    pub start: YearMonth,
    #[serde(
        default,
        rename = "endDate",
        alias = "end",
        deserialize_with = "null_as_default"
    )]
    pub end: YearMonth,
}

impl Position {
    pub fn is_ongoing(&self) -> bool {
        self.end.is_absent()
    }

    /// 任職月數；起始日缺失時無法計算，回傳 None
    pub fn duration_months(&self, today: YearMonth) -> Option<i64> {
        if self.start.is_absent() {
            return None;
        }
        let end = if self.is_ongoing() { today } else { self.end };
        Some(end.total_months() - self.start.total_months())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headline: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_profile_url: String,
    #[serde(default, deserialize_with = "positions_field")]
    pub positions: Vec<Position>,
}

impl Profile {
    pub fn to_row(&self) -> SheetRow {
        SheetRow {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            headline: self.headline.clone(),
            url: self.public_profile_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub job_title: String,
    pub min_years: u32,
}

impl FilterCriteria {
    pub fn new(job_title: impl Into<String>, min_years: u32) -> Self {
        Self {
            job_title: job_title.into(),
            min_years,
        }
    }
}

/// 寫入試算表的一列：id、名、姓、標題、網址
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub headline: String,
    pub url: String,
}

impl SheetRow {
    pub fn cells(&self) -> Vec<serde_json::Value> {
        [
            &self.id,
            &self.first_name,
            &self.last_name,
            &self.headline,
            &self.url,
        ]
        .into_iter()
        .map(|cell| serde_json::Value::String(cell.clone()))
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendReceipt {
    pub updated_range: Option<String>,
    pub updated_rows: usize,
}

/// Opaque pagination token; for the search API it is a result offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor(u32);

impl Cursor {
    pub const fn from_offset(offset: u32) -> Self {
        Self(offset)
    }

    pub fn offset(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub profiles: Vec<Profile>,
    pub next_cursor: Option<Cursor>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(token, None)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
