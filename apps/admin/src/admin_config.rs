use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use warden_application::EngineConfig;
use warden_core::{ActorIdentity, AppError, AppResult};
use warden_domain::ImplicationConfig;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub implications_file: Option<PathBuf>,
    pub seed_actor: ActorIdentity,
}

impl AdminConfig {
    pub fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let max_connections = match env::var("WARDEN_DATABASE_MAX_CONNECTIONS") {
            Ok(value) => parse_max_connections(value.as_str())?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };
        let implications_file = env::var("WARDEN_IMPLICATIONS_FILE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let seed_actor = match env::var("WARDEN_SEED_ACTOR") {
            Ok(subject) if !subject.trim().is_empty() => {
                ActorIdentity::new(subject.trim(), subject.trim())?
            }
            _ => ActorIdentity::system(),
        };

        Ok(Self {
            database_url,
            max_connections,
            implications_file,
            seed_actor,
        })
    }

    /// Builds the engine configuration, applying implication overrides from
    /// `WARDEN_IMPLICATIONS_FILE` when set.
    pub fn engine_config(&self) -> AppResult<EngineConfig> {
        let Some(path) = &self.implications_file else {
            return EngineConfig::builtin();
        };

        let raw = std::fs::read_to_string(path).map_err(|error| {
            AppError::Validation(format!(
                "failed to read implication rules from '{}': {error}",
                path.display()
            ))
        })?;

        EngineConfig::with_implication_overrides(&ImplicationConfig::from_json_str(raw.as_str())?)
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_max_connections(value: &str) -> AppResult<u32> {
    let parsed = value.trim().parse::<u32>().map_err(|error| {
        AppError::Validation(format!("invalid WARDEN_DATABASE_MAX_CONNECTIONS: {error}"))
    })?;
    if parsed == 0 {
        return Err(AppError::Validation(
            "WARDEN_DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
        ));
    }

    Ok(parsed)
}

fn required_env(name: &str) -> AppResult<String> {
    let value = env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}
