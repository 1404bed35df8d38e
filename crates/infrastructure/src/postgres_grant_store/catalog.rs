use async_trait::async_trait;

use warden_application::CatalogRepository;
use warden_core::{AppError, AppResult};
use warden_domain::{Permission, Role, RoleId, UserAccount, UserId, UserRoleAssignment};

use super::PostgresGrantStore;
use super::rows::{PermissionRow, RoleRow};

fn map_unique_violation(error: sqlx::Error, conflict: String, action: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(conflict);
    }

    AppError::Internal(format!("failed to {action}: {error}"))
}

#[async_trait]
impl CatalogRepository for PostgresGrantStore {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, description
            FROM warden_permissions
            ORDER BY normalized_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?
        .into_iter()
        .map(PermissionRow::into_permission)
        .collect()
    }

    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warden_permissions (id, name, normalized_name, description)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(permission.id.as_uuid())
        .bind(permission.name.as_str())
        .bind(permission.name.normalized())
        .bind(permission.description.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                format!("permission '{}' already exists", permission.name),
                "save permission",
            )
        })?;

        Ok(())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description
            FROM warden_roles
            ORDER BY normalized_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?
        .into_iter()
        .map(RoleRow::into_role)
        .collect()
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warden_roles (id, name, normalized_name, description)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.name.as_str())
        .bind(role.name.normalized())
        .bind(role.description.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                format!("role '{}' already exists", role.name),
                "save role",
            )
        })?;

        Ok(())
    }

    async fn save_user(&self, user: UserAccount) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warden_users (id, display_name, email, email_verified, two_factor_enabled)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.display_name.as_str())
        .bind(user.email.as_deref())
        .bind(user.email_verified)
        .bind(user.two_factor_enabled)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                format!("user '{}' already exists", user.id),
                "save user",
            )
        })?;

        Ok(())
    }

    async fn assign_role(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warden_user_roles (user_id, role_id, assigned_at, assigned_by)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(assignment.user_id.as_uuid())
        .bind(assignment.role_id.as_uuid())
        .bind(assignment.assigned_at)
        .bind(assignment.assigned_by.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                format!(
                    "user '{}' already holds role '{}'",
                    assignment.user_id, assignment.role_id
                ),
                "assign role",
            )
        })?;

        Ok(())
    }

    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM warden_user_roles
            WHERE user_id = $1 AND role_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove role: {error}")))?;

        Ok(result.rows_affected() > 0)
    }
}
