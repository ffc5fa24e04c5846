use crate::adapters::{AccessRule, InMemoryStore, RuleTableReviewer};
use crate::config::BrokerConfig;
use crate::domain::model::{
    BrokerInstanceRecord, CredentialResource, CredentialType, EndpointPort, EndpointResource,
    ObjectMeta, ProvisioningRecord, ProvisioningRef,
};
use crate::utils::error::{BrokerError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern compiles"));

/// Broker settings plus the objects and access rules to seed an in-memory
/// store with.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub instances: Vec<InstanceFixture>,
    #[serde(default)]
    pub provisioning: Vec<ProvisioningFixture>,
    #[serde(default)]
    pub endpoints: Vec<EndpointFixture>,
    #[serde(default)]
    pub credentials: Vec<CredentialFixture>,
    #[serde(default)]
    pub rules: Vec<AccessRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceFixture {
    pub instance_id: String,
    pub namespace: String,
    pub provisioning: String,
    #[serde(default)]
    pub binding_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningFixture {
    pub namespace: String,
    pub name: String,
    pub service_uid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointFixture {
    pub namespace: String,
    pub name: String,
    pub instance_id: String,
    pub cluster_ip: Option<String>,
    #[serde(default)]
    pub ports: Vec<EndpointPort>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialFixture {
    pub namespace: String,
    pub name: String,
    pub instance_id: String,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BrokerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| BrokerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DB_PASSWORD})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn reviewer(&self) -> RuleTableReviewer {
        RuleTableReviewer::new(self.rules.clone())
    }

    /// Writes every fixture into `store`, labelling endpoints and credentials
    /// with the configured instance label.
    pub async fn seed_store(&self, store: &InMemoryStore) {
        let label = &self.broker.instance_label;

        for instance in &self.instances {
            let mut record = BrokerInstanceRecord::new(
                &instance.instance_id,
                ProvisioningRef {
                    namespace: instance.namespace.clone(),
                    name: instance.provisioning.clone(),
                },
            );
            record.binding_ids = instance.binding_ids.clone();
            store.insert_instance(record).await;
        }

        for provisioning in &self.provisioning {
            store
                .insert_provisioning(ProvisioningRecord {
                    meta: ObjectMeta::new(&provisioning.namespace, &provisioning.name),
                    service_uid: provisioning.service_uid.clone(),
                })
                .await;
        }

        for endpoint in &self.endpoints {
            store
                .insert_endpoint(EndpointResource {
                    meta: ObjectMeta::new(&endpoint.namespace, &endpoint.name)
                        .with_label(label, &endpoint.instance_id),
                    cluster_ip: endpoint.cluster_ip.clone(),
                    ports: endpoint.ports.clone(),
                })
                .await;
        }

        for credential in &self.credentials {
            store
                .insert_credential(CredentialResource {
                    meta: ObjectMeta::new(&credential.namespace, &credential.name)
                        .with_label(label, &credential.instance_id),
                    credential_type: credential.credential_type.clone(),
                    data: credential.data.clone(),
                })
                .await;
        }

        tracing::debug!(
            "Seeded store with {} instances, {} endpoints, {} credentials",
            self.instances.len(),
            self.endpoints.len(),
            self.credentials.len()
        );
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.broker.validate()?;

        let mut seen = HashSet::new();
        for instance in &self.instances {
            validate_non_empty_string("instances.instance_id", &instance.instance_id)?;
            if !seen.insert(instance.instance_id.as_str()) {
                return Err(BrokerError::InvalidConfigValueError {
                    field: "instances.instance_id".to_string(),
                    value: instance.instance_id.clone(),
                    reason: "Instance IDs must be unique".to_string(),
                });
            }

            let mut ids = HashSet::new();
            if let Some(dup) = instance.binding_ids.iter().find(|id| !ids.insert(id.as_str())) {
                return Err(BrokerError::InvalidConfigValueError {
                    field: "instances.binding_ids".to_string(),
                    value: dup.clone(),
                    reason: "Binding IDs must be unique within an instance".to_string(),
                });
            }

            let provisioned = self.provisioning.iter().any(|p| {
                p.namespace == instance.namespace && p.name == instance.provisioning
            });
            if !provisioned {
                return Err(BrokerError::InvalidConfigValueError {
                    field: "instances.provisioning".to_string(),
                    value: format!("{}/{}", instance.namespace, instance.provisioning),
                    reason: "No provisioning record with that namespace and name".to_string(),
                });
            }
        }

        for endpoint in &self.endpoints {
            validate_non_empty_string("endpoints.name", &endpoint.name)?;
        }
        for credential in &self.credentials {
            validate_non_empty_string("credentials.name", &credential.name)?;
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::LabelSelector;
    use crate::domain::ports::ResourceStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FIXTURE: &str = r#"
[broker]
max_bind_attempts = 4

[[instances]]
instance_id = "abc"
namespace = "ns"
provisioning = "pg"

[[provisioning]]
namespace = "ns"
name = "pg"
service_uid = "0f3c2a3e-8a4b-4c1d-9e2f-1234567890ab"

[[endpoints]]
namespace = "ns"
name = "db"
instance_id = "abc"
cluster_ip = "10.0.0.5"
ports = [{ name = "client", port = 5432 }]

[[credentials]]
namespace = "ns"
name = "db-cred"
instance_id = "abc"
type = "basic-auth"
data = { username = "u", password = "p" }

[[rules]]
principal = "alice"
namespace = "ns"
verbs = ["get", "list"]
resources = ["*"]
"#;

    #[test]
    fn test_parse_fixture() {
        let config = TomlConfig::from_toml_str(FIXTURE).unwrap();
        assert_eq!(config.broker.max_bind_attempts, 4);
        assert_eq!(config.broker.instance_label, "broker.io/instance-id");
        assert_eq!(config.endpoints[0].ports[0].protocol, "TCP");
        assert_eq!(config.credentials[0].credential_type, CredentialType::BasicAuth);
        assert_eq!(config.rules[0].group, "*");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("BIND_BROKER_TEST_PASSWORD", "s3cret");
        let content = FIXTURE.replace(
            "password = \"p\"",
            "password = \"${BIND_BROKER_TEST_PASSWORD}\"",
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.credentials[0].data["password"], "s3cret");

        let untouched = TomlConfig::substitute_env_vars("x = \"${BIND_BROKER_UNSET_VAR}\"");
        assert_eq!(untouched, "x = \"${BIND_BROKER_UNSET_VAR}\"");
    }

    #[test]
    fn test_dangling_provisioning_reference_fails_validation() {
        let content = FIXTURE.replace("provisioning = \"pg\"", "provisioning = \"nope\"");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("instances.provisioning"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[[instances]\n").unwrap_err();
        assert!(matches!(err, BrokerError::ConfigError { .. }));
    }

    #[tokio::test]
    async fn test_from_file_and_seed_store() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let config = TomlConfig::from_file(file.path()).unwrap();
        let store = InMemoryStore::new();
        config.seed_store(&store).await;

        let record = store.get_instance("abc").await.unwrap();
        assert_eq!(record.provisioning.name, "pg");

        let selector = LabelSelector::equals("broker.io/instance-id", "abc");
        assert_eq!(store.list_endpoints("ns", &selector).await.unwrap().len(), 1);
        assert_eq!(store.list_credentials("ns", &selector).await.unwrap().len(), 1);
    }
}
