use crate::domain::model::{AccessDecision, Principal, ResourceAttributes};
use crate::domain::ports::AccessReviewer;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const WILDCARD: &str = "*";

/// One grant: `principal` may perform any of `verbs` on any of `resources` in
/// `group` within `namespace`. `"*"` matches anything in every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub principal: String,
    #[serde(default = "wildcard")]
    pub namespace: String,
    pub verbs: Vec<String>,
    #[serde(default = "wildcard")]
    pub group: String,
    pub resources: Vec<String>,
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

fn field_matches(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

impl AccessRule {
    pub fn matches(&self, principal: &Principal, attributes: &ResourceAttributes) -> bool {
        field_matches(&self.principal, &principal.name)
            && field_matches(&self.namespace, &attributes.namespace)
            && field_matches(&self.group, &attributes.group)
            && self.verbs.iter().any(|v| field_matches(v, &attributes.verb))
            && self
                .resources
                .iter()
                .any(|r| field_matches(r, &attributes.resource))
    }
}

/// Allow-list reviewer: anything not granted by a rule is denied.
#[derive(Debug, Clone, Default)]
pub struct RuleTableReviewer {
    rules: Vec<AccessRule>,
}

impl RuleTableReviewer {
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }

    pub fn allow_all(principal: &str) -> Self {
        Self::new(vec![AccessRule {
            principal: principal.to_string(),
            namespace: wildcard(),
            verbs: vec![wildcard()],
            group: wildcard(),
            resources: vec![wildcard()],
        }])
    }

    fn deny_reason(principal: &Principal, attributes: &ResourceAttributes) -> String {
        let resource = if attributes.group.is_empty() {
            attributes.resource.clone()
        } else {
            format!("{}.{}", attributes.resource, attributes.group)
        };
        format!(
            "principal \"{}\" cannot {} {} in namespace \"{}\"",
            principal.name, attributes.verb, resource, attributes.namespace
        )
    }
}

#[async_trait]
impl AccessReviewer for RuleTableReviewer {
    async fn review(
        &self,
        principal: &Principal,
        attributes: &ResourceAttributes,
    ) -> Result<AccessDecision> {
        if self.rules.iter().any(|rule| rule.matches(principal, attributes)) {
            return Ok(AccessDecision::Allow);
        }

        Ok(AccessDecision::Deny {
            reason: Self::deny_reason(principal, attributes),
        })
    }
}
