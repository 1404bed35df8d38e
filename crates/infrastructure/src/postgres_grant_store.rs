use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

use warden_application::{GrantStore, GrantedPermission, RoleGrantName};
use warden_core::{AppError, AppResult};
use warden_domain::{
    ConcurrencyToken, GrantExpectation, GrantTarget, Permission, PermissionId, PermissionName,
    Role, RoleId, UserAccount, UserId,
};

mod catalog;
mod rows;

use rows::{GrantRow, GrantTokenRow, PermissionRow, RoleGrantNameRow, RoleRow, UserRow};

/// PostgreSQL-backed grant store and catalog repository.
#[derive(Clone)]
pub struct PostgresGrantStore {
    pool: PgPool,
}

impl PostgresGrantStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
    }
}

/// Grant relation of a target: table, owner column, owner id.
fn grant_relation(target: GrantTarget) -> (&'static str, &'static str, Uuid) {
    match target {
        GrantTarget::Role(role_id) => ("warden_role_grants", "role_id", role_id.as_uuid()),
        GrantTarget::User(user_id) => ("warden_user_grants", "user_id", user_id.as_uuid()),
    }
}

async fn restamp(
    transaction: &mut Transaction<'_, Postgres>,
    target: GrantTarget,
    actor: &str,
    at: DateTime<Utc>,
) -> AppResult<ConcurrencyToken> {
    let (table, owner_column, owner_id) = grant_relation(target);
    let token = ConcurrencyToken::new();

    sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET concurrency_token = $2, modified_at = $3, modified_by = $4
        WHERE {owner_column} = $1
        "#
    ))
    .bind(owner_id)
    .bind(token.as_uuid())
    .bind(at)
    .bind(actor)
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to re-stamp grants: {error}")))?;

    Ok(token)
}

#[async_trait]
impl GrantStore for PostgresGrantStore {
    async fn get_role_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description
            FROM warden_roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?
        .map(RoleRow::into_role)
        .transpose()
    }

    async fn get_user_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
        Ok(sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, display_name, email, email_verified, two_factor_enabled
            FROM warden_users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user: {error}")))?
        .map(UserRow::into_user))
    }

    async fn get_user_roles(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT roles.id, roles.name, roles.description
            FROM warden_user_roles AS assignments
            INNER JOIN warden_roles AS roles ON roles.id = assignments.role_id
            WHERE assignments.user_id = $1
            ORDER BY roles.normalized_name
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user roles: {error}")))?
        .into_iter()
        .map(RoleRow::into_role)
        .collect()
    }

    async fn get_permissions_by_normalized_names(
        &self,
        normalized_names: &[String],
    ) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, description
            FROM warden_permissions
            WHERE normalized_name = ANY($1)
            "#,
        )
        .bind(normalized_names)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve permissions: {error}")))?
        .into_iter()
        .map(PermissionRow::into_permission)
        .collect()
    }

    async fn get_permission_names_by_role_ids(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<RoleGrantName>> {
        let role_ids: Vec<Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();

        sqlx::query_as::<_, RoleGrantNameRow>(
            r#"
            SELECT grants.role_id, permissions.name
            FROM warden_role_grants AS grants
            INNER JOIN warden_permissions AS permissions ON permissions.id = grants.permission_id
            WHERE grants.role_id = ANY($1)
            "#,
        )
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role grants: {error}")))?
        .into_iter()
        .map(RoleGrantNameRow::into_role_grant_name)
        .collect()
    }

    async fn get_permission_names_by_user_id(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<PermissionName>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT permissions.name
            FROM warden_user_grants AS grants
            INNER JOIN warden_permissions AS permissions ON permissions.id = grants.permission_id
            WHERE grants.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user grants: {error}")))?
        .iter()
        .map(|name| rows::parse_permission_name(name))
        .collect()
    }

    async fn list_grants(&self, target: GrantTarget) -> AppResult<Vec<GrantedPermission>> {
        let (table, owner_column, owner_id) = grant_relation(target);

        sqlx::query_as::<_, GrantRow>(&format!(
            r#"
            SELECT
                grants.permission_id,
                grants.concurrency_token,
                grants.created_at,
                grants.created_by,
                grants.modified_at,
                grants.modified_by,
                permissions.name,
                permissions.description
            FROM {table} AS grants
            INNER JOIN warden_permissions AS permissions ON permissions.id = grants.permission_id
            WHERE grants.{owner_column} = $1
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list grants: {error}")))?
        .into_iter()
        .map(|row| row.into_granted_permission(target))
        .collect()
    }

    async fn link_permissions(
        &self,
        target: GrantTarget,
        permission_ids: &[PermissionId],
        actor: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ConcurrencyToken> {
        let (table, owner_column, owner_id) = grant_relation(target);
        let permission_ids: Vec<Uuid> = permission_ids.iter().map(PermissionId::as_uuid).collect();
        let mut transaction = self.begin().await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {table} (
                {owner_column},
                permission_id,
                concurrency_token,
                created_at,
                created_by,
                modified_at,
                modified_by
            )
            SELECT $1, permission_id, $3, $4, $5, $4, $5
            FROM UNNEST($2::UUID[]) AS requested (permission_id)
            ON CONFLICT ({owner_column}, permission_id) DO NOTHING
            "#
        ))
        .bind(owner_id)
        .bind(&permission_ids)
        .bind(Uuid::new_v4())
        .bind(at)
        .bind(actor)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(database_error) = &error
                && database_error.code().as_deref() == Some("23503")
            {
                return AppError::NotFound(format!(
                    "cannot grant unknown permission to {target}"
                ));
            }

            AppError::Internal(format!("failed to link permissions: {error}"))
        })?;

        let token = restamp(&mut transaction, target, actor, at).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(token)
    }

    async fn unlink_permissions(
        &self,
        target: GrantTarget,
        expectations: &[GrantExpectation],
        actor: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ConcurrencyToken> {
        let (table, owner_column, owner_id) = grant_relation(target);
        let mut transaction = self.begin().await?;

        let current = sqlx::query_as::<_, GrantTokenRow>(&format!(
            r#"
            SELECT permission_id, concurrency_token
            FROM {table}
            WHERE {owner_column} = $1
            FOR UPDATE
            "#
        ))
        .bind(owner_id)
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock grants: {error}")))?;

        for expectation in expectations {
            let matches = current.iter().any(|row| {
                row.permission_id == expectation.permission_id.as_uuid()
                    && row.concurrency_token == expectation.concurrency_token.as_uuid()
            });
            if !matches {
                warn!(
                    grant_target = %target,
                    permission_id = %expectation.permission_id,
                    "grant token mismatch on unlink"
                );
                return Err(AppError::ConcurrencyConflict(format!(
                    "grant of permission '{}' to {target} was modified concurrently",
                    expectation.permission_id
                )));
            }
        }

        let permission_ids: Vec<Uuid> = expectations
            .iter()
            .map(|expectation| expectation.permission_id.as_uuid())
            .collect();
        sqlx::query(&format!(
            r#"
            DELETE FROM {table}
            WHERE {owner_column} = $1 AND permission_id = ANY($2)
            "#
        ))
        .bind(owner_id)
        .bind(&permission_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to unlink permissions: {error}")))?;

        let token = restamp(&mut transaction, target, actor, at).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(token)
    }
}
