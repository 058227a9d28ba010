use crate::utils::error::ConfigError;
use std::fmt::Display;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

fn invalid(field_name: &str, value: impl Display, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<(), ConfigError> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", scheme),
        )),
    }
}

/// 必填字串：不可為空白，也不可是未解析的 `${VAR}` 佔位符
pub fn validate_required_string(field_name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: field_name.to_string(),
        });
    }
    validate_resolved(field_name, value)
}

pub fn validate_resolved(field_name: &str, value: &str) -> Result<(), ConfigError> {
    if value.contains("${") {
        return Err(invalid(
            field_name,
            value,
            "Environment variable placeholder was not resolved",
        ));
    }
    Ok(())
}

pub fn validate_positive_number(
    field_name: &str,
    value: u64,
    min_value: u64,
) -> Result<(), ConfigError> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("endpoints.search_url", "https://example.com").is_ok());
        assert!(validate_url("endpoints.search_url", "http://127.0.0.1:8080/v2").is_ok());
        assert!(validate_url("endpoints.search_url", "").is_err());
        assert!(validate_url("endpoints.search_url", "invalid-url").is_err());
        assert!(validate_url("endpoints.search_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_required_string() {
        assert!(validate_required_string("hashtag", "hiring").is_ok());
        assert!(matches!(
            validate_required_string("hashtag", "   "),
            Err(ConfigError::Missing { .. })
        ));
        assert!(matches!(
            validate_required_string("client_secret", "${LINKEDIN_SECRET}"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_validate_positive_number_and_range() {
        assert!(validate_positive_number("page_size", 10, 1).is_ok());
        assert!(validate_positive_number("page_size", 0, 1).is_err());
        assert!(validate_range("experience_years", 5u32, 0, 80).is_ok());
        assert!(validate_range("experience_years", 120u32, 0, 80).is_err());
    }
}
