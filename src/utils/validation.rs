use crate::utils::error::{BrokerError, Result};
use regex::Regex;
use std::sync::LazyLock;

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern compiles")
});

// prefix/name，與 Kubernetes label key 相同的規則
static LABEL_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]([-a-z0-9.]*[a-z0-9])?/)?[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$")
        .expect("label key pattern compiles")
});

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BrokerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(BrokerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| BrokerError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_label_key(field_name: &str, key: &str) -> Result<()> {
    if key.len() > 316 || !LABEL_KEY_PATTERN.is_match(key) {
        return Err(BrokerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: key.to_string(),
            reason: "Label key must be an optional DNS prefix followed by '/' and an alphanumeric name"
                .to_string(),
        });
    }
    Ok(())
}

pub fn is_uuid(value: &str) -> bool {
    UUID_PATTERN.is_match(value)
}
