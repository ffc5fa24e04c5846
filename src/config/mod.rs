#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::{
    validate_label_key, validate_non_empty_string, validate_range, Validate,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMPERSONATION_PARAMETER: &str = "requester-username";
pub const DEFAULT_INSTANCE_LABEL: &str = "broker.io/instance-id";
/// A conflicting append is always retried at least once.
pub const MIN_BIND_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// The one bind parameter accepted, naming the principal to act as.
    pub impersonation_parameter: String,
    /// Label tying endpoints and credentials to their instance.
    pub instance_label: String,
    /// Total attempts at the ledger append before giving up on conflicts.
    pub max_bind_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            impersonation_parameter: DEFAULT_IMPERSONATION_PARAMETER.to_string(),
            instance_label: DEFAULT_INSTANCE_LABEL.to_string(),
            max_bind_attempts: 3,
            retry_delay_ms: 10,
        }
    }
}

impl Validate for BrokerConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("broker.impersonation_parameter", &self.impersonation_parameter)?;
        validate_label_key("broker.instance_label", &self.instance_label)?;
        validate_range(
            "broker.max_bind_attempts",
            self.max_bind_attempts,
            MIN_BIND_ATTEMPTS,
            10,
        )?;
        validate_range("broker.retry_delay_ms", self.retry_delay_ms, 0, 5_000)?;
        Ok(())
    }
}
