use crate::core::access::{authorize, BROKER_GROUP, PROVISIONING_RESOURCE};
use crate::domain::model::{
    BindRequest, BrokerInstanceRecord, Principal, ProvisioningRecord, ResourceAttributes,
};
use crate::domain::ports::{AccessReviewer, IdentityResolver, ResourceStore};
use crate::utils::error::{BrokerError, Result};
use crate::utils::validation::is_uuid;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ResolvedInstance {
    pub record: BrokerInstanceRecord,
    pub provisioning: ProvisioningRecord,
    pub principal: Principal,
}

impl ResolvedInstance {
    pub fn namespace(&self) -> &str {
        &self.provisioning.meta.namespace
    }
}

pub struct InstanceResolver {
    store: Arc<dyn ResourceStore>,
    reviewer: Arc<dyn AccessReviewer>,
    identity: Arc<dyn IdentityResolver>,
}

/// `service_id` and `plan_id` must both be UUIDs. Every offending field is
/// reported.
pub fn validate_bind_request(request: &BindRequest) -> Result<()> {
    let mut problems = Vec::new();
    for (field, value) in [("service_id", &request.service_id), ("plan_id", &request.plan_id)] {
        if value.is_empty() {
            problems.push(format!("{}: Required value", field));
        } else if !is_uuid(value) {
            problems.push(format!("{}: Invalid value: \"{}\": must be a valid UUID", field, value));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(BrokerError::bad_request(problems.join(", ")))
    }
}

impl InstanceResolver {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        reviewer: Arc<dyn AccessReviewer>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            store,
            reviewer,
            identity,
        }
    }

    /// Nothing about the provisioning record is read before the principal
    /// has been authorized for it.
    pub async fn resolve(&self, instance_id: &str, request: &BindRequest) -> Result<ResolvedInstance> {
        validate_bind_request(request)?;
        let principal = self.identity.principal_from(&request.parameters)?;

        tracing::debug!("Resolving instance {} for {}", instance_id, principal.name);

        let record = self.store.get_instance(instance_id).await.map_err(|e| {
            if e.is_not_found() {
                BrokerError::bad_request(e.to_string())
            } else {
                BrokerError::internal(e.to_string())
            }
        })?;

        let target = &record.provisioning;
        authorize(
            self.reviewer.as_ref(),
            &principal,
            ResourceAttributes::new(&target.namespace, "get", BROKER_GROUP, PROVISIONING_RESOURCE),
        )
        .await?;

        let provisioning = self
            .store
            .get_provisioning(&target.namespace, &target.name)
            .await
            .map_err(|e| BrokerError::internal(e.to_string()))?;

        if request.service_id != provisioning.service_uid {
            return Err(BrokerError::bad_request(
                "service_id does not match provisioned service",
            ));
        }

        Ok(ResolvedInstance {
            record,
            provisioning,
            principal,
        })
    }
}
