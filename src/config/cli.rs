use crate::domain::model::BindRequest;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_required_field, Validate};
use clap::Parser;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Parser)]
#[command(name = "bind-broker")]
#[command(about = "Run bind requests against a broker seeded from a TOML fixture")]
pub struct CliConfig {
    /// Path to TOML fixture (broker settings, seeded objects, access rules)
    #[arg(short, long, default_value = "broker.toml")]
    pub config: String,

    #[arg(long)]
    pub instance_id: String,

    #[arg(long)]
    pub binding_id: String,

    /// JSON bind body; replaces --service-id, --plan-id and --requester
    #[arg(long)]
    pub request: Option<String>,

    #[arg(long)]
    pub service_id: Option<String>,

    #[arg(long)]
    pub plan_id: Option<String>,

    /// Principal to act as
    #[arg(long)]
    pub requester: Option<String>,

    /// Issue the same bind this many times
    #[arg(long, default_value = "1")]
    pub repeat: usize,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    /// 由 --request 檔案或個別參數組出 bind 請求
    pub fn bind_request(&self, impersonation_parameter: &str) -> Result<BindRequest> {
        if let Some(path) = &self.request {
            let content = std::fs::read_to_string(path)?;
            return Ok(serde_json::from_str(&content)?);
        }

        let service_id = validate_required_field("service_id", &self.service_id)?;
        let plan_id = validate_required_field("plan_id", &self.plan_id)?;
        let requester = validate_required_field("requester", &self.requester)?;

        let mut parameters = BTreeMap::new();
        parameters.insert(impersonation_parameter.to_string(), requester.clone());

        Ok(BindRequest {
            service_id: service_id.clone(),
            plan_id: plan_id.clone(),
            parameters,
        })
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("config", &self.config)?;
        validate_non_empty_string("instance_id", &self.instance_id)?;
        validate_non_empty_string("binding_id", &self.binding_id)?;
        crate::utils::validation::validate_range("repeat", self.repeat, 1, 100)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(extra: &[&str]) -> CliConfig {
        let mut argv = vec![
            "bind-broker",
            "--instance-id",
            "abc",
            "--binding-id",
            "b1",
        ];
        argv.extend_from_slice(extra);
        CliConfig::parse_from(argv)
    }

    #[test]
    fn test_bind_request_from_flags() {
        let cli = args(&[
            "--service-id",
            "0f3c2a3e-8a4b-4c1d-9e2f-1234567890ab",
            "--plan-id",
            "7d1e4b8a-2c3f-4a5b-8c6d-0e1f2a3b4c5d",
            "--requester",
            "alice",
        ]);
        assert!(cli.validate().is_ok());

        let request = cli.bind_request("requester-username").unwrap();
        assert_eq!(request.parameters.len(), 1);
        assert_eq!(request.parameters["requester-username"], "alice");
    }

    #[test]
    fn test_missing_requester_is_reported() {
        let cli = args(&["--service-id", "s", "--plan-id", "p"]);
        let err = cli.bind_request("requester-username").unwrap_err();
        assert!(err.to_string().contains("requester"));
    }

    #[test]
    fn test_bind_request_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"service_id": "s", "plan_id": "p", "parameters": {"a": "1", "b": "2"}}"#,
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = args(&["--request", &path]);
        let request = cli.bind_request("requester-username").unwrap();
        assert_eq!(request.parameters.len(), 2);
    }

    #[test]
    fn test_zero_repeat_is_invalid() {
        let cli = args(&["--repeat", "0"]);
        assert!(cli.validate().is_err());
    }
}
