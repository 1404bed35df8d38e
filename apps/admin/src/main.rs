//! Warden administration composition root.

#![forbid(unsafe_code)]

mod admin_command;
mod admin_config;

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warden_application::{
    AuthorizationService, CatalogSeedService, ClaimIssuer, EngineConfig, GrantMutationService,
    PermissionAggregator, RoleAssignmentService, SystemClock,
};
use warden_core::{AppError, AppResult};
use warden_domain::{Decision, Principal, ResourceContext};
use warden_infrastructure::{PostgresAuditRepository, PostgresGrantStore};

use crate::admin_command::{AdminCli, AdminCommand};
use crate::admin_config::{AdminConfig, init_tracing};

#[derive(Debug, Serialize)]
struct AuthorizeOutput<'a> {
    subject: String,
    policy: &'a str,
    decision: Decision,
}

struct AdminServices {
    config: AdminConfig,
    grants: GrantMutationService,
    roles: RoleAssignmentService,
    seeder: CatalogSeedService,
    aggregator: PermissionAggregator,
    claims: ClaimIssuer,
    authorization: AuthorizationService,
}

impl AdminServices {
    fn build(config: AdminConfig, engine: EngineConfig, pool: PgPool) -> Self {
        let store = Arc::new(PostgresGrantStore::new(pool.clone()));
        let audit = Arc::new(PostgresAuditRepository::new(pool));
        let clock = Arc::new(SystemClock);

        let grants = GrantMutationService::new(store.clone(), audit.clone(), clock.clone());
        let roles =
            RoleAssignmentService::new(store.clone(), store.clone(), audit.clone(), clock.clone());
        let seeder = CatalogSeedService::new(store.clone(), grants.clone(), audit, clock);
        let aggregator = PermissionAggregator::new(store.clone(), engine.implications.clone());
        let claims = ClaimIssuer::new(store, engine.implications.clone());
        let authorization = AuthorizationService::new(engine.policies);

        Self {
            config,
            grants,
            roles,
            seeder,
            aggregator,
            claims,
            authorization,
        }
    }

    async fn run(&self, command: AdminCommand, cancel: &CancellationToken) -> AppResult<String> {
        let actor = &self.config.seed_actor;

        match command {
            AdminCommand::Migrate => Ok(String::new()),
            AdminCommand::Seed => to_json(&self.seeder.seed(actor, cancel).await?),
            AdminCommand::CreateUser {
                display_name,
                email,
            } => to_json(
                &self
                    .roles
                    .register_user(display_name.as_str(), email, cancel)
                    .await?,
            ),
            AdminCommand::AssignRole { user_id, role_name } => {
                let role = self.roles.find_role_by_name(role_name.as_str(), cancel).await?;
                to_json(
                    &self
                        .roles
                        .assign_role(actor, user_id, role.id, cancel)
                        .await?,
                )
            }
            AdminCommand::UnassignRole { user_id, role_name } => {
                let role = self.roles.find_role_by_name(role_name.as_str(), cancel).await?;
                self.roles
                    .unassign_role(actor, user_id, role.id, cancel)
                    .await?;
                to_json(&role)
            }
            AdminCommand::GrantRole {
                role_name,
                permissions,
            } => {
                let role = self.roles.find_role_by_name(role_name.as_str(), cancel).await?;
                to_json(
                    &self
                        .grants
                        .add_permissions_to_role(actor, role.id, permissions.as_slice(), cancel)
                        .await?,
                )
            }
            AdminCommand::RevokeRole {
                role_name,
                permissions,
                expected_token,
            } => {
                let role = self.roles.find_role_by_name(role_name.as_str(), cancel).await?;
                to_json(
                    &self
                        .grants
                        .remove_permissions_from_role(
                            actor,
                            role.id,
                            permissions.as_slice(),
                            expected_token,
                            cancel,
                        )
                        .await?,
                )
            }
            AdminCommand::GrantUser {
                user_id,
                permissions,
            } => to_json(
                &self
                    .grants
                    .add_permissions_to_user(actor, user_id, permissions.as_slice(), cancel)
                    .await?,
            ),
            AdminCommand::RevokeUser {
                user_id,
                permissions,
                expected_token,
            } => to_json(
                &self
                    .grants
                    .remove_permissions_from_user(
                        actor,
                        user_id,
                        permissions.as_slice(),
                        expected_token,
                        cancel,
                    )
                    .await?,
            ),
            AdminCommand::Effective { user_id } => to_json(
                &self
                    .aggregator
                    .get_effective_permissions(user_id, cancel)
                    .await?,
            ),
            AdminCommand::Claims { user_id } => to_json(
                &self
                    .claims
                    .issue_principal_claims(user_id, cancel)
                    .await?
                    .to_claims(),
            ),
            AdminCommand::Authorize {
                user_id,
                policy,
                owner_id,
            } => {
                let claims = self.claims.issue_principal_claims(user_id, cancel).await?;
                let principal = Principal::Authenticated(claims);
                let resource = owner_id.map(ResourceContext::owned_by);
                let decision =
                    self.authorization
                        .authorize(&principal, policy.as_str(), resource.as_ref())?;

                to_json(&AuthorizeOutput {
                    subject: user_id.to_string(),
                    policy: policy.as_str(),
                    decision,
                })
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = AdminCli::parse().command;
    let config = AdminConfig::load()?;
    let engine = config.engine_config()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if matches!(command, AdminCommand::Migrate) {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight command");
            interrupt.cancel();
        }
    });

    let services = AdminServices::build(config, engine, pool);
    let output = services.run(command, &cancel).await?;
    println!("{output}");

    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|error| AppError::Internal(format!("failed to serialize output: {error}")))
}
