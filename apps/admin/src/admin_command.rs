use clap::{Parser, Subcommand};
use warden_domain::{ConcurrencyToken, UserId};

#[derive(Debug, Parser)]
#[command(name = "warden-admin")]
#[command(about = "Administration tasks for the Warden authorization engine", long_about = None)]
pub struct AdminCli {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum AdminCommand {
    /// Apply database migrations and exit.
    Migrate,
    /// Create missing built-in permissions, system roles and their defaults.
    Seed,
    /// Register a user account.
    CreateUser {
        display_name: String,
        email: Option<String>,
    },
    /// Assign a role to a user.
    AssignRole {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
        role_name: String,
    },
    /// Remove a role from a user.
    UnassignRole {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
        role_name: String,
    },
    /// Grant permissions to a role.
    GrantRole {
        role_name: String,
        #[arg(num_args = 1.., required = true)]
        permissions: Vec<String>,
    },
    /// Revoke permissions from a role.
    RevokeRole {
        role_name: String,
        #[arg(num_args = 1.., required = true)]
        permissions: Vec<String>,
        /// Token of the grant set the caller last read.
        #[arg(long, value_parser = parse_concurrency_token)]
        expected_token: Option<ConcurrencyToken>,
    },
    /// Grant permissions directly to a user.
    GrantUser {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
        #[arg(num_args = 1.., required = true)]
        permissions: Vec<String>,
    },
    /// Revoke direct permissions from a user.
    RevokeUser {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
        #[arg(num_args = 1.., required = true)]
        permissions: Vec<String>,
        /// Token of the grant set the caller last read.
        #[arg(long, value_parser = parse_concurrency_token)]
        expected_token: Option<ConcurrencyToken>,
    },
    /// Print the direct, per-role and effective permissions of a user.
    Effective {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
    },
    /// Print the claims a credential for the user would carry.
    Claims {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
    },
    /// Evaluate a named policy against the user's freshly issued claims.
    Authorize {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
        policy: String,
        owner_id: Option<String>,
    },
}

fn parse_user_id(value: &str) -> Result<UserId, String> {
    uuid::Uuid::parse_str(value.trim())
        .map(UserId::from_uuid)
        .map_err(|error| format!("invalid user id '{value}': {error}"))
}

fn parse_concurrency_token(value: &str) -> Result<ConcurrencyToken, String> {
    uuid::Uuid::parse_str(value.trim())
        .map(ConcurrencyToken::from_uuid)
        .map_err(|error| format!("invalid concurrency token '{value}': {error}"))
}
