use crate::domain::model::{AccessDecision, Principal, ResourceAttributes};
use crate::domain::ports::AccessReviewer;
use crate::utils::error::{BrokerError, Result};

pub const CORE_GROUP: &str = "";
pub const BROKER_GROUP: &str = "broker.io";

pub const ENDPOINTS_RESOURCE: &str = "endpoints";
pub const CREDENTIALS_RESOURCE: &str = "credentials";
pub const PROVISIONING_RESOURCE: &str = "provisioningrecords";

/// Asks the reviewer and turns a denial into `Forbidden` carrying its reason.
pub async fn authorize(
    reviewer: &dyn AccessReviewer,
    principal: &Principal,
    attributes: ResourceAttributes,
) -> Result<()> {
    match reviewer.review(principal, &attributes).await? {
        AccessDecision::Allow => Ok(()),
        AccessDecision::Deny { reason } => {
            tracing::info!(
                "Access denied for {} ({} {} in {})",
                principal.name,
                attributes.verb,
                attributes.resource,
                attributes.namespace
            );
            Err(BrokerError::forbidden(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RuleTableReviewer;

    #[test]
    fn test_denial_becomes_forbidden() {
        let reviewer = RuleTableReviewer::default();
        let err = tokio_test::block_on(authorize(
            &reviewer,
            &Principal::new("bob"),
            ResourceAttributes::new("ns", "list", CORE_GROUP, ENDPOINTS_RESOURCE),
        ))
        .unwrap_err();

        assert_eq!(err.status_code(), 403);
        assert_eq!(
            err.to_string(),
            "principal \"bob\" cannot list endpoints in namespace \"ns\""
        );
    }

    #[test]
    fn test_allow_passes_through() {
        let reviewer = RuleTableReviewer::allow_all("bob");
        let result = tokio_test::block_on(authorize(
            &reviewer,
            &Principal::new("bob"),
            ResourceAttributes::new("ns", "get", BROKER_GROUP, PROVISIONING_RESOURCE),
        ));
        assert!(result.is_ok());
    }
}
