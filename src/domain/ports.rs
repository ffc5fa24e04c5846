use crate::domain::model::{
    AccessDecision, BrokerInstanceRecord, CredentialResource, EndpointResource, LabelSelector,
    Principal, ProvisioningRecord, ResourceAttributes,
};
use crate::utils::error::{Result, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Namespaced object store with optimistic concurrency on instance records.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_instance(&self, instance_id: &str) -> StoreResult<BrokerInstanceRecord>;

    /// Writes `record` if its resource version still matches the stored one,
    /// returning the record carrying the new version.
    async fn update_instance(&self, record: BrokerInstanceRecord)
        -> StoreResult<BrokerInstanceRecord>;

    async fn get_provisioning(&self, namespace: &str, name: &str)
        -> StoreResult<ProvisioningRecord>;

    async fn list_endpoints(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<EndpointResource>>;

    async fn list_credentials(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<CredentialResource>>;
}

/// Decides whether a principal may perform an action.
#[async_trait]
pub trait AccessReviewer: Send + Sync {
    async fn review(
        &self,
        principal: &Principal,
        attributes: &ResourceAttributes,
    ) -> Result<AccessDecision>;
}

/// Derives the acting principal from bind parameters.
pub trait IdentityResolver: Send + Sync {
    fn principal_from(&self, parameters: &BTreeMap<String, String>) -> Result<Principal>;
}
