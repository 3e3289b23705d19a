//! IAM allow policies
//!
//! The `Policy` shape shared by every resource that exposes
//! `getIamPolicy` / `setIamPolicy` (projects, Pub/Sub topics and
//! subscriptions, IoT registries).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known principal representing anyone on the internet
pub const ALL_USERS: &str = "allUsers";
/// Basic viewer role
pub const VIEWER: &str = "roles/viewer";
/// Basic editor role
pub const EDITOR: &str = "roles/editor";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl Policy {
    /// Roles that appear in the policy, in binding order
    pub fn roles(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.role.as_str()).collect()
    }

    /// Members granted `role` (unconditional bindings only)
    pub fn members(&self, role: &str) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| b.role == role && b.condition.is_none())
            .flat_map(|b| b.members.iter().map(|m| m.as_str()))
            .collect()
    }

    /// Grant `role` to `member`. Returns false if it was already granted.
    pub fn add(&mut self, member: &str, role: &str) -> bool {
        if let Some(binding) = self
            .bindings
            .iter_mut()
            .find(|b| b.role == role && b.condition.is_none())
        {
            if binding.members.iter().any(|m| m == member) {
                return false;
            }
            binding.members.push(member.to_string());
            return true;
        }

        self.bindings.push(Binding {
            role: role.to_string(),
            members: vec![member.to_string()],
            condition: None,
        });
        true
    }

    /// Revoke `role` from `member`; bindings left empty are removed.
    /// Returns false if the member did not hold the role.
    pub fn remove(&mut self, member: &str, role: &str) -> bool {
        let mut removed = false;
        for binding in self
            .bindings
            .iter_mut()
            .filter(|b| b.role == role && b.condition.is_none())
        {
            let before = binding.members.len();
            binding.members.retain(|m| m != member);
            removed |= binding.members.len() != before;
        }
        self.bindings.retain(|b| !b.members.is_empty());
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_creates_and_extends_bindings() {
        let mut policy = Policy::default();
        assert!(policy.add(ALL_USERS, VIEWER));
        assert!(policy.add("group:cloud-logs@google.com", EDITOR));
        assert!(policy.add("user:a@example.com", VIEWER));
        assert!(!policy.add("user:a@example.com", VIEWER));

        assert_eq!(policy.roles(), vec![VIEWER, EDITOR]);
        assert_eq!(policy.members(VIEWER), vec![ALL_USERS, "user:a@example.com"]);
    }

    #[test]
    fn test_remove_drops_empty_bindings() {
        let mut policy = Policy::default();
        policy.add("user:a@example.com", VIEWER);
        assert!(policy.remove("user:a@example.com", VIEWER));
        assert!(!policy.remove("user:a@example.com", VIEWER));
        assert!(policy.bindings.is_empty());
    }

    #[test]
    fn test_etag_round_trips_through_json() {
        let policy: Policy = serde_json::from_str(
            r#"{"version":1,"etag":"BwX=","bindings":[{"role":"roles/owner","members":["user:o@example.com"]}]}"#,
        )
        .unwrap();
        let value = serde_json::to_value(&policy).unwrap();
        assert_eq!(value["etag"], "BwX=");
        assert_eq!(value["bindings"][0]["role"], "roles/owner");
    }
}
