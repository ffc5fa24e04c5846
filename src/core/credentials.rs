use crate::core::access::{authorize, CORE_GROUP, CREDENTIALS_RESOURCE, ENDPOINTS_RESOURCE};
use crate::core::normalize::normalize;
use crate::domain::model::{
    LabelSelector, Principal, ResourceAttributes, BASIC_AUTH_PASSWORD_KEY, BASIC_AUTH_USERNAME_KEY,
};
use crate::domain::ports::{AccessReviewer, ResourceStore};
use crate::utils::error::{BrokerError, Result, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Gathers the endpoints and basic-auth credentials labelled with an instance
/// and renders them as environment-style key/value pairs.
pub struct CredentialCollector {
    store: Arc<dyn ResourceStore>,
    reviewer: Arc<dyn AccessReviewer>,
    instance_label: String,
}

fn list_error(err: StoreError) -> BrokerError {
    match err {
        StoreError::Forbidden(reason) => BrokerError::forbidden(reason),
        other => BrokerError::internal(other.to_string()),
    }
}

impl CredentialCollector {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        reviewer: Arc<dyn AccessReviewer>,
        instance_label: String,
    ) -> Self {
        Self {
            store,
            reviewer,
            instance_label,
        }
    }

    fn selector(&self, instance_id: &str) -> LabelSelector {
        LabelSelector::equals(&self.instance_label, instance_id)
    }

    /// `<NAME>_SERVICE_HOST`, `<NAME>_SERVICE_PORT` and one
    /// `<NAME>_SERVICE_PORT_<PORT>` per named port, for every endpoint that
    /// has both an address and at least one port.
    pub async fn collect_endpoints(
        &self,
        principal: &Principal,
        namespace: &str,
        instance_id: &str,
    ) -> Result<BTreeMap<String, String>> {
        tracing::debug!("Collecting endpoints for instance {} in {}", instance_id, namespace);

        authorize(
            self.reviewer.as_ref(),
            principal,
            ResourceAttributes::new(namespace, "list", CORE_GROUP, ENDPOINTS_RESOURCE),
        )
        .await?;

        let endpoints = self
            .store
            .list_endpoints(namespace, &self.selector(instance_id))
            .await
            .map_err(list_error)?;

        let mut services = BTreeMap::new();
        for endpoint in endpoints {
            let (Some(address), Some(first_port)) =
                (endpoint.routable_address(), endpoint.ports.first())
            else {
                tracing::debug!("Skipping endpoint {} without address or ports", endpoint.meta.name);
                continue;
            };

            let prefix = normalize(&endpoint.meta.name);
            services.insert(format!("{}_SERVICE_HOST", prefix), address.to_string());

            let port_key = format!("{}_SERVICE_PORT", prefix);
            services.insert(port_key.clone(), first_port.port.to_string());

            for port in endpoint.ports.iter().filter(|p| !p.name.is_empty()) {
                services.insert(
                    format!("{}_{}", port_key, normalize(&port.name)),
                    port.port.to_string(),
                );
            }
        }

        Ok(services)
    }

    /// `<NAME>_USERNAME` and `<NAME>_PASSWORD` for every basic-auth credential.
    pub async fn collect_secrets(
        &self,
        principal: &Principal,
        namespace: &str,
        instance_id: &str,
    ) -> Result<BTreeMap<String, String>> {
        tracing::debug!("Collecting secrets for instance {} in {}", instance_id, namespace);

        authorize(
            self.reviewer.as_ref(),
            principal,
            ResourceAttributes::new(namespace, "list", CORE_GROUP, CREDENTIALS_RESOURCE),
        )
        .await?;

        let credentials = self
            .store
            .list_credentials(namespace, &self.selector(instance_id))
            .await
            .map_err(list_error)?;

        let mut secrets = BTreeMap::new();
        for credential in credentials.iter().filter(|c| c.is_basic_auth()) {
            for key in [BASIC_AUTH_USERNAME_KEY, BASIC_AUTH_PASSWORD_KEY] {
                secrets.insert(
                    normalize(&format!("{}_{}", credential.meta.name, key)),
                    credential.field(key).to_string(),
                );
            }
        }

        Ok(secrets)
    }
}
