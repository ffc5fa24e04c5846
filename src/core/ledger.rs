use crate::domain::model::BrokerInstanceRecord;
use crate::domain::ports::ResourceStore;
use crate::utils::error::{BrokerError, Result};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub created: bool,
    pub record: BrokerInstanceRecord,
}

/// Records binding IDs on the instance record. A stale resource version comes
/// back as `BrokerError::Conflict`; the caller owns the retry.
pub struct BindingLedger {
    store: Arc<dyn ResourceStore>,
}

impl BindingLedger {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    pub async fn ensure_bound(
        &self,
        mut record: BrokerInstanceRecord,
        binding_id: &str,
    ) -> Result<LedgerEntry> {
        if record.has_binding(binding_id) {
            tracing::debug!(
                "Binding {} already recorded on {}",
                binding_id,
                record.instance_id()
            );
            return Ok(LedgerEntry {
                created: false,
                record,
            });
        }

        record.binding_ids.push(binding_id.to_string());
        let record = self.store.update_instance(record).await.map_err(|e| {
            if e.is_conflict() {
                BrokerError::conflict(e.to_string())
            } else {
                BrokerError::internal(e.to_string())
            }
        })?;

        Ok(LedgerEntry {
            created: true,
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use crate::domain::model::ProvisioningRef;

    async fn store_with_instance() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_instance(BrokerInstanceRecord::new(
                "abc",
                ProvisioningRef {
                    namespace: "ns".to_string(),
                    name: "pg".to_string(),
                },
            ))
            .await;
        store
    }

    #[tokio::test]
    async fn test_new_binding_is_appended() {
        let store = store_with_instance().await;
        let ledger = BindingLedger::new(Arc::new(store.clone()));

        let record = store.get_instance("abc").await.unwrap();
        let entry = ledger.ensure_bound(record, "b1").await.unwrap();

        assert!(entry.created);
        assert_eq!(entry.record.binding_ids, vec!["b1".to_string()]);
        assert_eq!(store.get_instance("abc").await.unwrap().binding_ids, vec!["b1".to_string()]);
    }

    #[tokio::test]
    async fn test_known_binding_skips_write() {
        let store = store_with_instance().await;
        let ledger = BindingLedger::new(Arc::new(store.clone()));

        let record = store.get_instance("abc").await.unwrap();
        let entry = ledger.ensure_bound(record, "b1").await.unwrap();
        let again = ledger.ensure_bound(entry.record.clone(), "b1").await.unwrap();

        assert!(!again.created);
        assert_eq!(again.record, entry.record);
        assert_eq!(store.instance_updates().await, 1);
    }

    #[tokio::test]
    async fn test_stale_record_surfaces_conflict() {
        let store = store_with_instance().await;
        let ledger = BindingLedger::new(Arc::new(store.clone()));

        let stale = store.get_instance("abc").await.unwrap();
        ledger.ensure_bound(stale.clone(), "b1").await.unwrap();

        let err = ledger.ensure_bound(stale, "b2").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            store.get_instance("abc").await.unwrap().binding_ids,
            vec!["b1".to_string()]
        );
    }
}
