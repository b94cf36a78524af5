use std::collections::BTreeSet;

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use tessera_core::{AppError, CompanyId, DirectoryId, PermissionId, RoleId, UserId};
use tessera_domain::{
    AuthorizationDecision, Permission, PermissionType, ResourceScope, RolePermission,
    SUPER_ADMIN_ROLE, UserRole,
};

use crate::security_ports::{AssignedRole, RoleGrant};
use crate::test_support::Harness;

use super::{Authorizer, FieldAccess};

fn role(name: &str) -> UserRole {
    UserRole::new(RoleId::new(), name, false).unwrap_or_else(|_| unreachable!())
}

fn grant(
    role: &UserRole,
    permission_type: PermissionType,
    directory_id: Option<DirectoryId>,
    until: Option<chrono::DateTime<Utc>>,
    constraint_data: Option<serde_json::Value>,
) -> RoleGrant {
    let permission = Permission::new(
        PermissionId::new(),
        format!("{}-{}", permission_type.as_str(), PermissionId::new()),
        permission_type,
        None,
        directory_id,
    )
    .unwrap_or_else(|_| unreachable!());
    let grant = RolePermission::new(role.id(), permission.id(), None, until, constraint_data)
        .unwrap_or_else(|_| unreachable!());

    RoleGrant { grant, permission }
}

fn scoped(company_id: CompanyId, directory_id: DirectoryId) -> ResourceScope {
    ResourceScope {
        company_id: Some(company_id),
        module_id: None,
        directory_id: Some(directory_id),
    }
}

#[test]
fn read_grant_allows_read_and_denies_write() {
    let company_id = CompanyId::new();
    let directory_id = DirectoryId::new();
    let reader = role("reader");
    let authorizer = Authorizer::new(
        UserId::new(),
        Utc::now(),
        vec![AssignedRole {
            company_id: Some(company_id),
            role: reader.clone(),
        }],
        vec![grant(&reader, PermissionType::Read, Some(directory_id), None, None)],
    );

    let resource = scoped(company_id, directory_id);
    assert_eq!(
        authorizer.decide(PermissionType::Read, &resource),
        AuthorizationDecision::Allow
    );
    assert_eq!(
        authorizer.decide(PermissionType::Write, &resource),
        AuthorizationDecision::Deny
    );
}

#[test]
fn manage_grant_implies_read_and_write() {
    let directory_id = DirectoryId::new();
    let manager = role("manager");
    let authorizer = Authorizer::new(
        UserId::new(),
        Utc::now(),
        vec![AssignedRole {
            company_id: None,
            role: manager.clone(),
        }],
        vec![grant(&manager, PermissionType::Manage, Some(directory_id), None, None)],
    );

    let resource = ResourceScope::directory(directory_id);
    assert!(authorizer.decide(PermissionType::Read, &resource).is_allowed());
    assert!(authorizer.decide(PermissionType::Write, &resource).is_allowed());
    assert!(
        !authorizer
            .decide(PermissionType::Read, &ResourceScope::directory(DirectoryId::new()))
            .is_allowed()
    );
}

#[test]
fn grant_stops_applying_after_effective_until() {
    let directory_id = DirectoryId::new();
    let until = Utc
        .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(|| unreachable!());
    let reader = role("reader");
    let grants = vec![grant(
        &reader,
        PermissionType::Read,
        Some(directory_id),
        Some(until),
        None,
    )];
    let assigned = vec![AssignedRole {
        company_id: None,
        role: reader,
    }];
    let resource = ResourceScope::directory(directory_id);

    let at_bound = Authorizer::new(UserId::new(), until, assigned.clone(), grants.clone());
    assert!(at_bound.decide(PermissionType::Read, &resource).is_allowed());

    let after = Authorizer::new(
        UserId::new(),
        until + Duration::milliseconds(1),
        assigned,
        grants,
    );
    assert!(!after.decide(PermissionType::Read, &resource).is_allowed());
}

#[test]
fn company_assignment_does_not_apply_to_other_companies() {
    let home = CompanyId::new();
    let directory_id = DirectoryId::new();
    let reader = role("reader");
    let authorizer = Authorizer::new(
        UserId::new(),
        Utc::now(),
        vec![AssignedRole {
            company_id: Some(home),
            role: reader.clone(),
        }],
        vec![grant(&reader, PermissionType::Read, Some(directory_id), None, None)],
    );

    assert!(
        authorizer
            .decide(PermissionType::Read, &scoped(home, directory_id))
            .is_allowed()
    );
    assert!(
        !authorizer
            .decide(PermissionType::Read, &scoped(CompanyId::new(), directory_id))
            .is_allowed()
    );
}

#[test]
fn field_restrictions_are_united_across_grants() {
    let directory_id = DirectoryId::new();
    let first = role("first");
    let second = role("second");
    let authorizer = Authorizer::new(
        UserId::new(),
        Utc::now(),
        vec![
            AssignedRole {
                company_id: None,
                role: first.clone(),
            },
            AssignedRole {
                company_id: None,
                role: second.clone(),
            },
        ],
        vec![
            grant(
                &first,
                PermissionType::Read,
                Some(directory_id),
                None,
                Some(json!({"fields": ["name"]})),
            ),
            grant(
                &second,
                PermissionType::Read,
                Some(directory_id),
                None,
                Some(json!({"fields": ["email"]})),
            ),
        ],
    );

    let access =
        authorizer.field_access(PermissionType::Read, &ResourceScope::directory(directory_id));
    assert_eq!(
        access,
        Some(FieldAccess::Only(BTreeSet::from([
            "email".to_owned(),
            "name".to_owned()
        ])))
    );
}

#[test]
fn unrestricted_grant_wins_over_restricted_grant() {
    let reader = role("reader");
    let authorizer = Authorizer::new(
        UserId::new(),
        Utc::now(),
        vec![AssignedRole {
            company_id: None,
            role: reader.clone(),
        }],
        vec![
            grant(
                &reader,
                PermissionType::Read,
                None,
                None,
                Some(json!({"fields": ["name"]})),
            ),
            grant(&reader, PermissionType::Read, None, None, None),
        ],
    );

    assert_eq!(
        authorizer.field_access(PermissionType::Read, &ResourceScope::global()),
        Some(FieldAccess::All)
    );
}

#[tokio::test]
async fn super_admin_is_allowed_without_grants() {
    let harness = Harness::new().await;

    let decision = harness
        .authorization
        .authorize(
            harness.admin.user_id(),
            PermissionType::Manage,
            &scoped(CompanyId::new(), DirectoryId::new()),
            Utc::now(),
        )
        .await;
    assert_eq!(decision.ok(), Some(AuthorizationDecision::Allow));
}

#[tokio::test]
async fn user_without_roles_is_denied() {
    let harness = Harness::new().await;

    let decision = harness
        .authorization
        .authorize(
            UserId::new(),
            PermissionType::Read,
            &ResourceScope::global(),
            Utc::now(),
        )
        .await;
    assert_eq!(decision.ok(), Some(AuthorizationDecision::Deny));
}

#[tokio::test]
async fn require_returns_forbidden_for_missing_grant() {
    let harness = Harness::new().await;
    let directory_id = DirectoryId::new();
    let user = harness
        .user_with_grant(PermissionType::Read, Some(directory_id), None, None)
        .await;

    let allowed = harness
        .authorization
        .require(&user, PermissionType::Read, &ResourceScope::directory(directory_id))
        .await;
    assert!(allowed.is_ok());

    let denied = harness
        .authorization
        .require(&user, PermissionType::Write, &ResourceScope::directory(directory_id))
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
}

#[test]
fn global_decisions_ignore_company_scoped_assignments() {
    let company_id = CompanyId::new();
    let directory_id = DirectoryId::new();
    let manager = role("manager");
    let super_admin = UserRole::new(RoleId::new(), SUPER_ADMIN_ROLE, true)
        .unwrap_or_else(|_| unreachable!());
    let scoped_manager = Authorizer::new(
        UserId::new(),
        Utc::now(),
        vec![
            AssignedRole {
                company_id: Some(company_id),
                role: manager.clone(),
            },
            AssignedRole {
                company_id: Some(company_id),
                role: super_admin.clone(),
            },
        ],
        vec![grant(&manager, PermissionType::Manage, None, None, None)],
    );

    assert!(scoped_manager.is_super_admin());
    assert!(!scoped_manager.is_global_super_admin());
    assert_eq!(
        scoped_manager.decide(PermissionType::Manage, &scoped(company_id, directory_id)),
        AuthorizationDecision::Allow
    );
    assert_eq!(
        scoped_manager.decide_global(PermissionType::Manage, &ResourceScope::global()),
        AuthorizationDecision::Deny
    );

    let global_manager = Authorizer::new(
        UserId::new(),
        Utc::now(),
        vec![AssignedRole {
            company_id: None,
            role: manager.clone(),
        }],
        vec![grant(&manager, PermissionType::Manage, None, None, None)],
    );
    assert_eq!(
        global_manager.decide_global(
            PermissionType::Manage,
            &ResourceScope::directory(directory_id)
        ),
        AuthorizationDecision::Allow
    );
    assert!(!global_manager.is_global_super_admin());
}
