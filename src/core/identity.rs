use crate::domain::model::Principal;
use crate::domain::ports::IdentityResolver;
use crate::utils::error::{BrokerError, Result};
use std::collections::BTreeMap;

/// Takes the caller's identity from the single bind parameter `parameter`.
///
/// The identity is asserted by request content rather than by transport
/// authentication, so whoever can reach the broker can name any principal.
/// Swap this out for a real identity source by providing another
/// [`IdentityResolver`].
#[derive(Debug, Clone)]
pub struct ParameterImpersonation {
    parameter: String,
}

impl ParameterImpersonation {
    pub fn new(parameter: &str) -> Self {
        Self {
            parameter: parameter.to_string(),
        }
    }
}

impl IdentityResolver for ParameterImpersonation {
    fn principal_from(&self, parameters: &BTreeMap<String, String>) -> Result<Principal> {
        if parameters.len() != 1 {
            return Err(BrokerError::bad_request("parameters not supported on bind"));
        }

        let name = parameters
            .get(&self.parameter)
            .ok_or_else(|| BrokerError::bad_request("parameters not supported on bind"))?;

        if name.trim().is_empty() {
            return Err(BrokerError::bad_request(format!(
                "parameter {} must name a principal",
                self.parameter
            )));
        }

        Ok(Principal::new(name))
    }
}
