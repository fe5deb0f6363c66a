//! Declarative group-to-role mapping rules
//!
//! Mapping tables are sourced from backend settings and have to tolerate
//! the four shapes an operator may write for a rule: key absent, a
//! boolean, a single group identifier, or a list of identifiers. Each
//! shape is an explicit `MembershipRule` variant so that "skip this role"
//! and "evaluates false" stay distinct cases.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// Condition controlling whether a principal belongs to a role, derived
/// from external group membership data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MembershipRule {
    /// Key not present in the mapping entry: the role is left entirely
    /// untouched, neither added to nor removed from.
    #[default]
    Absent,
    /// Explicit `false` or an empty list: evaluates false, removal policy
    /// applies.
    Never,
    /// Explicit `true`: every authenticated principal matches.
    Always,
    /// Matches when the principal is a member of at least one of the
    /// listed groups.
    AnyOf(Vec<String>),
}

impl MembershipRule {
    /// Interpret one raw settings value as a rule.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::Bool(true) => Self::Always,
            Value::Bool(false) => Self::Never,
            Value::String(group) => Self::AnyOf(vec![group.clone()]),
            Value::Array(items) => {
                if items.is_empty() {
                    return Self::Never;
                }
                // Non-string entries are dropped rather than rejected.
                let groups = items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_owned))
                    .collect();
                Self::AnyOf(groups)
            }
            _ => Self::Never,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl<'de> Deserialize<'de> for MembershipRule {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl Serialize for MembershipRule {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Never => serializer.serialize_bool(false),
            Self::Always => serializer.serialize_bool(true),
            Self::AnyOf(groups) => groups.serialize(serializer),
        }
    }
}

/// Role mapping for one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationMappingEntry {
    pub admins: MembershipRule,
    pub users: MembershipRule,
    /// Whether a principal that no longer matches a rule is removed from
    /// the role. The per-role overrides below fall back to this flag.
    pub remove: bool,
    pub remove_admins: Option<bool>,
    pub remove_users: Option<bool>,
}

impl Default for OrganizationMappingEntry {
    fn default() -> Self {
        Self {
            admins: MembershipRule::Absent,
            users: MembershipRule::Absent,
            remove: true,
            remove_admins: None,
            remove_users: None,
        }
    }
}

impl OrganizationMappingEntry {
    pub fn admins_removal(&self) -> bool {
        self.remove_admins.unwrap_or(self.remove)
    }

    pub fn users_removal(&self) -> bool {
        self.remove_users.unwrap_or(self.remove)
    }
}

/// Role mapping for one team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMappingEntry {
    /// Owning organization. Entries without one are invalid and skipped.
    pub organization: Option<String>,
    pub users: MembershipRule,
    pub remove: bool,
}

impl Default for TeamMappingEntry {
    fn default() -> Self {
        Self {
            organization: None,
            users: MembershipRule::Absent,
            remove: true,
        }
    }
}

/// Organization and team mapping tables sourced from backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingTable {
    pub organizations: HashMap<String, OrganizationMappingEntry>,
    pub teams: HashMap<String, TeamMappingEntry>,
}

impl MappingTable {
    pub fn is_empty(&self) -> bool {
        self.organizations.is_empty() && self.teams.is_empty()
    }
}
