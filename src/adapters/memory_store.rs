use crate::domain::model::{
    BrokerInstanceRecord, CredentialResource, EndpointResource, LabelSelector, ObjectMeta,
    ProvisioningRecord,
};
use crate::domain::ports::{ResourceStore, StoreResult};
use crate::utils::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const INSTANCE_KIND: &str = "brokerinstancerecords";
const PROVISIONING_KIND: &str = "provisioningrecords";

#[derive(Default)]
struct StoreState {
    instances: HashMap<String, BrokerInstanceRecord>,
    provisioning: HashMap<(String, String), ProvisioningRecord>,
    endpoints: Vec<EndpointResource>,
    credentials: Vec<CredentialResource>,
    last_version: u64,
    instance_updates: usize,
}

impl StoreState {
    fn stamp(&mut self, meta: &mut ObjectMeta) {
        self.last_version += 1;
        meta.resource_version = self.last_version.to_string();
    }
}

/// Process-local store. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_instance(&self, mut record: BrokerInstanceRecord) {
        let mut state = self.state.write().await;
        state.stamp(&mut record.meta);
        state
            .instances
            .insert(record.instance_id().to_string(), record);
    }

    pub async fn insert_provisioning(&self, mut record: ProvisioningRecord) {
        let mut state = self.state.write().await;
        state.stamp(&mut record.meta);
        let key = (record.meta.namespace.clone(), record.meta.name.clone());
        state.provisioning.insert(key, record);
    }

    pub async fn insert_endpoint(&self, mut endpoint: EndpointResource) {
        let mut state = self.state.write().await;
        state.stamp(&mut endpoint.meta);
        state.endpoints.push(endpoint);
    }

    pub async fn insert_credential(&self, mut credential: CredentialResource) {
        let mut state = self.state.write().await;
        state.stamp(&mut credential.meta);
        state.credentials.push(credential);
    }

    /// Number of successful instance record writes so far.
    pub async fn instance_updates(&self) -> usize {
        self.state.read().await.instance_updates
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get_instance(&self, instance_id: &str) -> StoreResult<BrokerInstanceRecord> {
        let state = self.state.read().await;
        state
            .instances
            .get(instance_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: INSTANCE_KIND.to_string(),
                name: instance_id.to_string(),
            })
    }

    async fn update_instance(
        &self,
        mut record: BrokerInstanceRecord,
    ) -> StoreResult<BrokerInstanceRecord> {
        let mut state = self.state.write().await;
        let current_version = match state.instances.get(record.instance_id()) {
            Some(current) => current.meta.resource_version.clone(),
            None => {
                return Err(StoreError::NotFound {
                    kind: INSTANCE_KIND.to_string(),
                    name: record.instance_id().to_string(),
                })
            }
        };

        if current_version != record.meta.resource_version {
            tracing::debug!(
                "Rejecting stale write to {} (have {}, got {})",
                record.instance_id(),
                current_version,
                record.meta.resource_version
            );
            return Err(StoreError::Conflict {
                kind: INSTANCE_KIND.to_string(),
                name: record.instance_id().to_string(),
            });
        }

        state.stamp(&mut record.meta);
        state.instance_updates += 1;
        state
            .instances
            .insert(record.instance_id().to_string(), record.clone());
        Ok(record)
    }

    async fn get_provisioning(
        &self,
        namespace: &str,
        name: &str,
    ) -> StoreResult<ProvisioningRecord> {
        let state = self.state.read().await;
        state
            .provisioning
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: PROVISIONING_KIND.to_string(),
                name: name.to_string(),
            })
    }

    async fn list_endpoints(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<EndpointResource>> {
        let state = self.state.read().await;
        Ok(state
            .endpoints
            .iter()
            .filter(|e| e.meta.namespace == namespace && selector.matches(&e.meta.labels))
            .cloned()
            .collect())
    }

    async fn list_credentials(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<CredentialResource>> {
        let state = self.state.read().await;
        Ok(state
            .credentials
            .iter()
            .filter(|c| c.meta.namespace == namespace && selector.matches(&c.meta.labels))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CredentialType, ProvisioningRef};
    use std::collections::BTreeMap;

    fn instance(id: &str) -> BrokerInstanceRecord {
        BrokerInstanceRecord::new(
            id,
            ProvisioningRef {
                namespace: "ns".to_string(),
                name: "tpl".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_update_with_current_version_succeeds() {
        let store = InMemoryStore::new();
        store.insert_instance(instance("abc")).await;

        let mut record = store.get_instance("abc").await.unwrap();
        let before = record.meta.resource_version.clone();
        record.binding_ids.push("b1".to_string());

        let updated = store.update_instance(record).await.unwrap();
        assert_ne!(updated.meta.resource_version, before);
        assert_eq!(updated.binding_ids, vec!["b1".to_string()]);
        assert_eq!(store.instance_updates().await, 1);
    }

    #[tokio::test]
    async fn test_update_with_stale_version_conflicts() {
        let store = InMemoryStore::new();
        store.insert_instance(instance("abc")).await;

        let first = store.get_instance("abc").await.unwrap();
        let second = first.clone();

        store.update_instance(first).await.unwrap();
        let err = store.update_instance(second).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.instance_updates().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_instance_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_instance("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_by_namespace_and_label() {
        let store = InMemoryStore::new();
        let label = "broker.io/instance-id";
        for (ns, owner, name) in [("ns", "abc", "a"), ("ns", "xyz", "b"), ("other", "abc", "c")] {
            store
                .insert_credential(CredentialResource {
                    meta: ObjectMeta::new(ns, name).with_label(label, owner),
                    credential_type: CredentialType::Opaque,
                    data: BTreeMap::new(),
                })
                .await;
        }

        let found = store
            .list_credentials("ns", &LabelSelector::equals(label, "abc"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].meta.name, "a");
    }
}
