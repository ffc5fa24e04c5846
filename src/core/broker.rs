use crate::config::{BrokerConfig, MIN_BIND_ATTEMPTS};
use crate::core::credentials::CredentialCollector;
use crate::core::identity::ParameterImpersonation;
use crate::core::ledger::{BindingLedger, LedgerEntry};
use crate::core::resolver::InstanceResolver;
use crate::domain::model::{
    BindOutcome, BindRequest, BindResponse, BindStatus, BrokerInstanceRecord, Credentials,
    ProtocolResponse,
};
use crate::domain::ports::{AccessReviewer, IdentityResolver, ResourceStore};
use crate::utils::error::{BrokerError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Bind endpoint of the broker.
///
/// A bind resolves the instance, collects endpoints then secrets under the
/// requesting principal, and finally records the binding ID on the instance.
/// Repeating a bind returns the same credentials with `BindStatus::Ok`
/// instead of `BindStatus::Created`.
pub struct Broker {
    store: Arc<dyn ResourceStore>,
    resolver: InstanceResolver,
    collector: CredentialCollector,
    ledger: BindingLedger,
    config: BrokerConfig,
}

impl Broker {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        reviewer: Arc<dyn AccessReviewer>,
        config: BrokerConfig,
    ) -> Self {
        let identity = Arc::new(ParameterImpersonation::new(&config.impersonation_parameter));
        Self::with_identity(store, reviewer, identity, config)
    }

    pub fn with_identity(
        store: Arc<dyn ResourceStore>,
        reviewer: Arc<dyn AccessReviewer>,
        identity: Arc<dyn IdentityResolver>,
        config: BrokerConfig,
    ) -> Self {
        Self {
            resolver: InstanceResolver::new(store.clone(), reviewer.clone(), identity),
            collector: CredentialCollector::new(
                store.clone(),
                reviewer,
                config.instance_label.clone(),
            ),
            ledger: BindingLedger::new(store.clone()),
            store,
            config,
        }
    }

    pub async fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        request: &BindRequest,
    ) -> Result<BindOutcome> {
        tracing::debug!("Bind: instance {}, binding {}", instance_id, binding_id);

        if binding_id.trim().is_empty() {
            return Err(BrokerError::bad_request("binding_id must not be empty"));
        }

        let resolved = self.resolver.resolve(instance_id, request).await?;
        let namespace = resolved.namespace().to_string();

        let services = self
            .collector
            .collect_endpoints(&resolved.principal, &namespace, instance_id)
            .await?;
        let secrets = self
            .collector
            .collect_secrets(&resolved.principal, &namespace, instance_id)
            .await?;

        let entry = self.record_binding(resolved.record, binding_id).await?;
        let status = if entry.created {
            BindStatus::Created
        } else {
            BindStatus::Ok
        };

        tracing::info!(
            "Bind {} on {} -> {:?} ({} services, {} secrets)",
            binding_id,
            instance_id,
            status,
            services.len(),
            secrets.len()
        );

        Ok(BindOutcome {
            status,
            response: BindResponse {
                credentials: Credentials { services, secrets },
            },
        })
    }

    /// Runs a bind and packages the result the way it goes back on the wire.
    pub async fn respond(
        &self,
        instance_id: &str,
        binding_id: &str,
        request: &BindRequest,
    ) -> ProtocolResponse {
        let result = self.bind(instance_id, binding_id, request).await.and_then(|outcome| {
            let body = serde_json::to_value(&outcome.response)?;
            Ok(ProtocolResponse {
                status: outcome.status.status_code(),
                body,
            })
        });

        match result {
            Ok(response) => response,
            Err(err) => {
                if err.status_code() >= 500 {
                    tracing::error!("❌ Bind {} on {} failed: {}", binding_id, instance_id, err);
                }
                ProtocolResponse {
                    status: err.status_code(),
                    body: serde_json::to_value(err.error_body()).unwrap_or_default(),
                }
            }
        }
    }

    /// Appends the binding, re-reading the instance record after each version
    /// conflict, for at most `max_bind_attempts` attempts but never fewer than
    /// `MIN_BIND_ATTEMPTS`.
    async fn record_binding(
        &self,
        mut record: BrokerInstanceRecord,
        binding_id: &str,
    ) -> Result<LedgerEntry> {
        let instance_id = record.instance_id().to_string();
        let max_attempts = self.config.max_bind_attempts.max(MIN_BIND_ATTEMPTS);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match self.ledger.ensure_bound(record, binding_id).await {
                Ok(entry) => return Ok(entry),
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            if attempt >= max_attempts {
                tracing::warn!(
                    "Giving up on binding {} for {} after {} conflicting attempts",
                    binding_id,
                    instance_id,
                    attempt
                );
                return Err(BrokerError::internal(format!(
                    "binding could not be recorded after {} attempts: {}",
                    attempt, err
                )));
            }

            tracing::warn!(
                "Conflict recording binding {} for {} (attempt {}/{}): {}",
                binding_id,
                instance_id,
                attempt,
                max_attempts,
                err
            );

            let delay = self.config.retry_delay_ms * u64::from(attempt);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            record = self
                .store
                .get_instance(&instance_id)
                .await
                .map_err(|e| BrokerError::internal(e.to_string()))?;
        }
    }
}
