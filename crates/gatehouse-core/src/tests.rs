//! Unit tests for gatehouse-core

use crate::mapping::{MappingTable, MembershipRule, OrganizationMappingEntry, TeamMappingEntry};
use serde_json::json;

// =============================================================================
// Membership Rule Shape Tests
// =============================================================================

mod rule_shapes {
    use super::*;

    #[test]
    fn test_missing_key_is_absent() {
        let entry: OrganizationMappingEntry = serde_json::from_value(json!({})).unwrap();
        assert_eq!(entry.admins, MembershipRule::Absent);
        assert_eq!(entry.users, MembershipRule::Absent);
    }

    #[test]
    fn test_null_is_absent() {
        let entry: OrganizationMappingEntry =
            serde_json::from_value(json!({ "admins": null })).unwrap();
        assert_eq!(entry.admins, MembershipRule::Absent);
    }

    #[test]
    fn test_booleans() {
        let entry: OrganizationMappingEntry =
            serde_json::from_value(json!({ "admins": true, "users": false })).unwrap();
        assert_eq!(entry.admins, MembershipRule::Always);
        assert_eq!(entry.users, MembershipRule::Never);
    }

    #[test]
    fn test_single_identifier_becomes_list() {
        let entry: OrganizationMappingEntry =
            serde_json::from_value(json!({ "admins": "cn=admins,dc=example,dc=com" })).unwrap();
        assert_eq!(
            entry.admins,
            MembershipRule::AnyOf(vec!["cn=admins,dc=example,dc=com".to_string()])
        );
    }

    #[test]
    fn test_identifier_list() {
        let entry: OrganizationMappingEntry = serde_json::from_value(json!({
            "users": ["cn=eng,dc=x", "cn=ops,dc=x"]
        }))
        .unwrap();
        assert_eq!(
            entry.users,
            MembershipRule::AnyOf(vec!["cn=eng,dc=x".to_string(), "cn=ops,dc=x".to_string()])
        );
    }

    #[test]
    fn test_empty_list_is_never() {
        let entry: OrganizationMappingEntry =
            serde_json::from_value(json!({ "users": [] })).unwrap();
        assert_eq!(entry.users, MembershipRule::Never);
    }

    #[test]
    fn test_non_string_entries_are_dropped() {
        let entry: OrganizationMappingEntry = serde_json::from_value(json!({
            "users": ["cn=eng,dc=x", 42, {"dn": "cn=ops,dc=x"}]
        }))
        .unwrap();
        assert_eq!(
            entry.users,
            MembershipRule::AnyOf(vec!["cn=eng,dc=x".to_string()])
        );
    }

    #[test]
    fn test_unrecognized_scalar_is_never() {
        let rule = MembershipRule::from_value(&json!(42));
        assert_eq!(rule, MembershipRule::Never);
    }
}

// =============================================================================
// Removal Flag Precedence Tests
// =============================================================================

mod removal_flags {
    use super::*;

    #[test]
    fn test_remove_defaults_true() {
        let entry = OrganizationMappingEntry::default();
        assert!(entry.remove);
        assert!(entry.admins_removal());
        assert!(entry.users_removal());
    }

    #[test]
    fn test_per_role_flags_inherit_entry_flag() {
        let entry: OrganizationMappingEntry =
            serde_json::from_value(json!({ "remove": false })).unwrap();
        assert!(!entry.admins_removal());
        assert!(!entry.users_removal());
    }

    #[test]
    fn test_per_role_flags_override_entry_flag() {
        let entry: OrganizationMappingEntry = serde_json::from_value(json!({
            "remove": false,
            "remove_admins": true
        }))
        .unwrap();
        assert!(entry.admins_removal());
        assert!(!entry.users_removal());
    }

    #[test]
    fn test_team_remove_defaults_true() {
        let entry: TeamMappingEntry =
            serde_json::from_value(json!({ "organization": "Engineering" })).unwrap();
        assert!(entry.remove);
    }
}

// =============================================================================
// Mapping Table Tests
// =============================================================================

mod mapping_table {
    use super::*;

    #[test]
    fn test_full_table_from_settings_value() {
        let table: MappingTable = serde_json::from_value(json!({
            "organizations": {
                "Engineering": {
                    "admins": ["cn=admins,dc=example,dc=com"],
                    "users": true,
                    "remove_users": false
                }
            },
            "teams": {
                "QA": { "organization": "Engineering", "users": "cn=qa,dc=example,dc=com" },
                "Orphan": { "users": true }
            }
        }))
        .unwrap();

        let org = &table.organizations["Engineering"];
        assert_eq!(
            org.admins,
            MembershipRule::AnyOf(vec!["cn=admins,dc=example,dc=com".to_string()])
        );
        assert_eq!(org.users, MembershipRule::Always);
        assert!(org.admins_removal());
        assert!(!org.users_removal());

        assert_eq!(
            table.teams["QA"].organization.as_deref(),
            Some("Engineering")
        );
        assert!(table.teams["Orphan"].organization.is_none());
    }

    #[test]
    fn test_empty_table() {
        let table = MappingTable::default();
        assert!(table.is_empty());
    }

    #[test]
    fn test_rule_serialization_round_trip() {
        let rules = vec![
            MembershipRule::Never,
            MembershipRule::Always,
            MembershipRule::AnyOf(vec!["cn=eng,dc=x".to_string()]),
        ];
        for rule in rules {
            let json = serde_json::to_value(&rule).unwrap();
            let parsed = MembershipRule::from_value(&json);
            assert_eq!(parsed, rule);
        }
    }
}
