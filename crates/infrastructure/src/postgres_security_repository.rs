use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use tessera_application::{AssignedRole, RoleGrant, SecurityRepository};
use tessera_core::{
    AppError, AppResult, CompanyId, DirectoryId, ModuleId, PermissionId, RoleId, UserId,
};
use tessera_domain::{Permission, PermissionType, RolePermission, UserRole, UserRoleAssignment};

use crate::postgres_errors::{is_foreign_key_violation, is_unique_violation, store_error};

/// PostgreSQL-backed repository for permissions, roles, grants and assignments.
#[derive(Clone)]
pub struct PostgresSecurityRepository {
    pool: PgPool,
}

impl PostgresSecurityRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    name: String,
    permission_type: String,
    module_id: Option<uuid::Uuid>,
    directory_id: Option<uuid::Uuid>,
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    is_system: bool,
}

#[derive(Debug, FromRow)]
struct GrantRow {
    role_id: uuid::Uuid,
    permission_id: uuid::Uuid,
    effective_from: Option<DateTime<Utc>>,
    effective_until: Option<DateTime<Utc>>,
    constraint_data: Option<Value>,
}

#[derive(Debug, FromRow)]
struct RoleGrantRow {
    #[sqlx(flatten)]
    grant: GrantRow,
    name: String,
    permission_type: String,
    module_id: Option<uuid::Uuid>,
    directory_id: Option<uuid::Uuid>,
}

#[derive(Debug, FromRow)]
struct AssignedRoleRow {
    company_id: Option<uuid::Uuid>,
    #[sqlx(flatten)]
    role: RoleRow,
}

const GRANT_COLUMNS: &str =
    "role_id, permission_id, effective_from, effective_until, constraint_data";

#[async_trait]
impl SecurityRepository for PostgresSecurityRepository {
    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permissions (id, name, permission_type, module_id, directory_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(permission.id().as_uuid())
        .bind(permission.name().as_str())
        .bind(permission.permission_type().as_str())
        .bind(permission.module_id().map(|module_id| module_id.as_uuid()))
        .bind(permission.directory_id().map(|directory_id| directory_id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "permission '{}' already exists",
                    permission.name().as_str()
                ));
            }
            if is_foreign_key_violation(&error) {
                return AppError::NotFound(format!(
                    "scope of permission '{}' does not exist",
                    permission.name().as_str()
                ));
            }

            store_error("failed to save permission", error)
        })?;

        Ok(())
    }

    async fn find_permission(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, permission_type, module_id, directory_id
            FROM permissions
            WHERE id = $1
            "#,
        )
        .bind(permission_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to find permission", error))?;

        row.map(permission_from_row).transpose()
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, permission_type, module_id, directory_id
            FROM permissions
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list permissions", error))?;

        rows.into_iter().map(permission_from_row).collect()
    }

    async fn save_role(&self, role: UserRole) -> AppResult<()> {
        sqlx::query("INSERT INTO user_roles (id, name, is_system) VALUES ($1, $2, $3)")
            .bind(role.id().as_uuid())
            .bind(role.name().as_str())
            .bind(role.is_system())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                if is_unique_violation(&error) {
                    return AppError::Conflict(format!(
                        "role '{}' already exists",
                        role.name().as_str()
                    ));
                }

                store_error("failed to save role", error)
            })?;

        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<UserRole>> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, is_system FROM user_roles WHERE id = $1",
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to find role", error))?;

        row.map(role_from_row).transpose()
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<UserRole>> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, is_system FROM user_roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to find role by name", error))?;

        row.map(role_from_row).transpose()
    }

    async fn list_roles(&self) -> AppResult<Vec<UserRole>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, is_system FROM user_roles ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list roles", error))?;

        rows.into_iter().map(role_from_row).collect()
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        sqlx::query("DELETE FROM user_roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| store_error("failed to delete role", error))?;

        Ok(())
    }

    async fn find_grant(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<Option<RolePermission>> {
        let row = sqlx::query_as::<_, GrantRow>(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM role_permissions
            WHERE role_id = $1 AND permission_id = $2
            "#
        ))
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to find grant", error))?;

        row.map(grant_from_row).transpose()
    }

    async fn insert_grant(&self, grant: RolePermission) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO role_permissions ({GRANT_COLUMNS}) VALUES ($1, $2, $3, $4, $5)"
        ))
        .bind(grant.role_id().as_uuid())
        .bind(grant.permission_id().as_uuid())
        .bind(grant.effective_from())
        .bind(grant.effective_until())
        .bind(grant.constraint_data())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::DuplicateGrant(format!(
                    "role '{}' already holds permission '{}'",
                    grant.role_id(),
                    grant.permission_id()
                ));
            }
            if is_foreign_key_violation(&error) {
                return AppError::NotFound("role or permission does not exist".to_owned());
            }

            store_error("failed to insert grant", error)
        })?;

        Ok(())
    }

    async fn replace_grant(&self, grant: RolePermission) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO role_permissions ({GRANT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (role_id, permission_id)
            DO UPDATE SET
                effective_from = EXCLUDED.effective_from,
                effective_until = EXCLUDED.effective_until,
                constraint_data = EXCLUDED.constraint_data
            "#
        ))
        .bind(grant.role_id().as_uuid())
        .bind(grant.permission_id().as_uuid())
        .bind(grant.effective_from())
        .bind(grant.effective_until())
        .bind(grant.constraint_data())
        .execute(&self.pool)
        .await
        .map_err(|error| store_error("failed to replace grant", error))?;

        Ok(())
    }

    async fn delete_grant(&self, role_id: RoleId, permission_id: PermissionId) -> AppResult<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id.as_uuid())
            .bind(permission_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| store_error("failed to delete grant", error))?;

        Ok(())
    }

    async fn list_grants(&self, role_id: RoleId) -> AppResult<Vec<RolePermission>> {
        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM role_permissions
            WHERE role_id = $1
            ORDER BY permission_id
            "#
        ))
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list grants", error))?;

        rows.into_iter().map(grant_from_row).collect()
    }

    async fn list_role_grants(&self, role_ids: &[RoleId]) -> AppResult<Vec<RoleGrant>> {
        let role_uuids: Vec<uuid::Uuid> =
            role_ids.iter().map(|role_id| role_id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, RoleGrantRow>(
            r#"
            SELECT
                grants.role_id,
                grants.permission_id,
                grants.effective_from,
                grants.effective_until,
                grants.constraint_data,
                permissions.name,
                permissions.permission_type,
                permissions.module_id,
                permissions.directory_id
            FROM role_permissions AS grants
            JOIN permissions ON permissions.id = grants.permission_id
            WHERE grants.role_id = ANY($1)
            "#,
        )
        .bind(&role_uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list role grants", error))?;

        rows.into_iter()
            .map(|row| {
                let permission = permission_from_row(PermissionRow {
                    id: row.grant.permission_id,
                    name: row.name,
                    permission_type: row.permission_type,
                    module_id: row.module_id,
                    directory_id: row.directory_id,
                })?;

                Ok(RoleGrant {
                    grant: grant_from_row(row.grant)?,
                    permission,
                })
            })
            .collect()
    }

    async fn assign_role(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_role_assignments (user_id, role_id, company_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(assignment.user_id.as_uuid())
        .bind(assignment.role_id.as_uuid())
        .bind(assignment.company_id.map(|company_id| company_id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                return AppError::NotFound("role or company does not exist".to_owned());
            }

            store_error("failed to assign role", error)
        })?;

        Ok(())
    }

    async fn unassign_role(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM user_role_assignments
            WHERE user_id = $1 AND role_id = $2 AND company_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(assignment.user_id.as_uuid())
        .bind(assignment.role_id.as_uuid())
        .bind(assignment.company_id.map(|company_id| company_id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| store_error("failed to unassign role", error))?;

        Ok(())
    }

    async fn list_assigned_roles(&self, user_id: UserId) -> AppResult<Vec<AssignedRole>> {
        let rows = sqlx::query_as::<_, AssignedRoleRow>(
            r#"
            SELECT assignments.company_id, roles.id, roles.name, roles.is_system
            FROM user_role_assignments AS assignments
            JOIN user_roles AS roles ON roles.id = assignments.role_id
            WHERE assignments.user_id = $1
            ORDER BY assignments.created_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list assigned roles", error))?;

        rows.into_iter()
            .map(|row| {
                Ok(AssignedRole {
                    company_id: row.company_id.map(CompanyId::from_uuid),
                    role: role_from_row(row.role)?,
                })
            })
            .collect()
    }

    async fn detach_company_assignments(&self, company_id: CompanyId) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            store_error("failed to start assignment detach transaction", error)
        })?;

        // Global duplicates would violate the assignment uniqueness once detached.
        sqlx::query(
            r#"
            DELETE FROM user_role_assignments AS scoped
            WHERE scoped.company_id = $1
                AND EXISTS (
                    SELECT 1
                    FROM user_role_assignments AS global
                    WHERE global.user_id = scoped.user_id
                        AND global.role_id = scoped.role_id
                        AND global.company_id IS NULL
                )
            "#,
        )
        .bind(company_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| store_error("failed to drop duplicate assignments", error))?;

        sqlx::query("UPDATE user_role_assignments SET company_id = NULL WHERE company_id = $1")
            .bind(company_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| store_error("failed to detach company assignments", error))?;

        transaction
            .commit()
            .await
            .map_err(|error| store_error("failed to commit assignment detach", error))
    }
}

fn permission_from_row(row: PermissionRow) -> AppResult<Permission> {
    Permission::new(
        PermissionId::from_uuid(row.id),
        row.name,
        PermissionType::from_str(row.permission_type.as_str())?,
        row.module_id.map(ModuleId::from_uuid),
        row.directory_id.map(DirectoryId::from_uuid),
    )
}

fn role_from_row(row: RoleRow) -> AppResult<UserRole> {
    UserRole::new(RoleId::from_uuid(row.id), row.name, row.is_system)
}

fn grant_from_row(row: GrantRow) -> AppResult<RolePermission> {
    RolePermission::new(
        RoleId::from_uuid(row.role_id),
        PermissionId::from_uuid(row.permission_id),
        row.effective_from,
        row.effective_until,
        row.constraint_data,
    )
}
