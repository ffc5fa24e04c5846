use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata shared by every stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Opaque token owned by the store; compared on update.
    #[serde(default)]
    pub resource_version: String,
}

impl ObjectMeta {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }
}

/// Points a broker instance at the provisioning record it was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRef {
    pub namespace: String,
    pub name: String,
}

/// Broker-side record for a provisioned instance. Keyed by instance ID
/// (`meta.name`) and not namespaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerInstanceRecord {
    pub meta: ObjectMeta,
    pub provisioning: ProvisioningRef,
    #[serde(default)]
    pub binding_ids: Vec<String>,
}

impl BrokerInstanceRecord {
    pub fn new(instance_id: &str, provisioning: ProvisioningRef) -> Self {
        Self {
            meta: ObjectMeta::new("", instance_id),
            provisioning,
            binding_ids: Vec::new(),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.meta.name
    }

    pub fn has_binding(&self, binding_id: &str) -> bool {
        self.binding_ids.iter().any(|id| id == binding_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRecord {
    pub meta: ObjectMeta,
    /// Identity of the catalog entry this record realizes.
    pub service_uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPort {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub port: u16,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointResource {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub cluster_ip: Option<String>,
    #[serde(default)]
    pub ports: Vec<EndpointPort>,
}

impl EndpointResource {
    /// 無位址或 headless ("None") 的端點不可路由
    pub fn routable_address(&self) -> Option<&str> {
        self.cluster_ip
            .as_deref()
            .filter(|ip| !ip.is_empty() && *ip != "None")
    }
}

pub const BASIC_AUTH_USERNAME_KEY: &str = "username";
pub const BASIC_AUTH_PASSWORD_KEY: &str = "password";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialType {
    BasicAuth,
    Opaque,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialResource {
    pub meta: ObjectMeta,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl CredentialResource {
    pub fn is_basic_auth(&self) -> bool {
        self.credential_type == CredentialType::BasicAuth
    }

    pub fn field(&self, key: &str) -> &str {
        self.data.get(key).map(String::as_str).unwrap_or_default()
    }
}

/// Body of a bind call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BindRequest {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Credentials {
    pub services: BTreeMap<String, String>,
    pub secrets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BindResponse {
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BindStatus {
    Created,
    Ok,
}

impl BindStatus {
    pub fn status_code(&self) -> u16 {
        match self {
            BindStatus::Created => 201,
            BindStatus::Ok => 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    pub status: BindStatus,
    pub response: BindResponse,
}

/// What a transport would write back: status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// The identity requests are evaluated as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
}

impl Principal {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Action a principal wants to perform, as presented to the access reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttributes {
    pub namespace: String,
    pub verb: String,
    pub group: String,
    pub resource: String,
}

impl ResourceAttributes {
    pub fn new(namespace: &str, verb: &str, group: &str, resource: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            verb: verb.to_string(),
            group: group.to_string(),
            resource: resource.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny { reason: String },
}

/// Equality selector over object labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSelector {
    pub key: String,
    pub value: String,
}

impl LabelSelector {
    pub fn equals(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.key).is_some_and(|v| *v == self.value)
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
