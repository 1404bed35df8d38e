use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use warden_application::{GrantedPermission, RoleGrantName};
use warden_core::{AppError, AppResult};
use warden_domain::{
    AuditStamp, ConcurrencyToken, Grant, GrantTarget, Permission, PermissionId, PermissionName,
    Role, RoleId, RoleName, UserAccount, UserId,
};

pub(super) fn parse_permission_name(value: &str) -> AppResult<PermissionName> {
    PermissionName::parse(value).map_err(|error| {
        AppError::Internal(format!("stored permission name '{value}' is invalid: {error}"))
    })
}

#[derive(Debug, FromRow)]
pub(super) struct PermissionRow {
    id: Uuid,
    name: String,
    description: Option<String>,
}

impl PermissionRow {
    pub(super) fn into_permission(self) -> AppResult<Permission> {
        Ok(Permission {
            id: PermissionId::from_uuid(self.id),
            name: parse_permission_name(&self.name)?,
            description: self.description,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct RoleRow {
    id: Uuid,
    name: String,
    description: Option<String>,
}

impl RoleRow {
    pub(super) fn into_role(self) -> AppResult<Role> {
        let name = RoleName::parse(&self.name).map_err(|error| {
            AppError::Internal(format!("stored role name '{}' is invalid: {error}", self.name))
        })?;

        Ok(Role {
            id: RoleId::from_uuid(self.id),
            name,
            description: self.description,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct UserRow {
    id: Uuid,
    display_name: String,
    email: Option<String>,
    email_verified: bool,
    two_factor_enabled: bool,
}

impl UserRow {
    pub(super) fn into_user(self) -> UserAccount {
        UserAccount {
            id: UserId::from_uuid(self.id),
            display_name: self.display_name,
            email: self.email,
            email_verified: self.email_verified,
            two_factor_enabled: self.two_factor_enabled,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct RoleGrantNameRow {
    role_id: Uuid,
    name: String,
}

impl RoleGrantNameRow {
    pub(super) fn into_role_grant_name(self) -> AppResult<RoleGrantName> {
        Ok(RoleGrantName {
            role_id: RoleId::from_uuid(self.role_id),
            permission_name: parse_permission_name(&self.name)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct GrantRow {
    permission_id: Uuid,
    concurrency_token: Uuid,
    created_at: DateTime<Utc>,
    created_by: String,
    modified_at: DateTime<Utc>,
    modified_by: String,
    name: String,
    description: Option<String>,
}

impl GrantRow {
    pub(super) fn into_granted_permission(self, target: GrantTarget) -> AppResult<GrantedPermission> {
        let permission_id = PermissionId::from_uuid(self.permission_id);

        Ok(GrantedPermission {
            grant: Grant {
                target,
                permission_id,
                concurrency_token: ConcurrencyToken::from_uuid(self.concurrency_token),
                audit: AuditStamp {
                    created_at: self.created_at,
                    created_by: self.created_by,
                    modified_at: self.modified_at,
                    modified_by: self.modified_by,
                },
            },
            permission: Permission {
                id: permission_id,
                name: parse_permission_name(&self.name)?,
                description: self.description,
            },
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct GrantTokenRow {
    pub(super) permission_id: Uuid,
    pub(super) concurrency_token: Uuid,
}
