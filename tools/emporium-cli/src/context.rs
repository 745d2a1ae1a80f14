//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use emporium_commerce::prelude::*;
use emporium_db::Db;

use crate::config::{AppConfig, CONFIG_NAMES};
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Loaded configuration, environment overrides applied.
    pub config: AppConfig,
    /// Where the configuration came from, if a file was found.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
    /// `--user`, when given.
    pub user: Option<UserId>,
    /// `--role`.
    pub role: Role,
}

impl Context {
    /// Load context from config file and the global flags.
    pub fn load(
        config_path: Option<&str>,
        user: Option<&str>,
        role: &str,
        output: Output,
    ) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (mut config, config_path) = match config_path {
            Some(path) => {
                let path = resolve(&cwd, path);
                (AppConfig::load(&path)?, Some(path))
            }
            // Try to find config in current directory or parent directories
            None => match find_config(&cwd) {
                Some(path) => (AppConfig::load(&path)?, Some(path)),
                None => (AppConfig::default(), None),
            },
        };
        config.apply_env();

        let user = user
            .map(|u| u.parse::<UserId>())
            .transpose()
            .context("--user must be a UUID")?;
        let role = role.parse::<Role>()?;

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
            user,
            role,
        })
    }

    /// The acting user for staff operations.
    ///
    /// Operators without `--user` act as the nil user.
    pub fn operator(&self) -> Actor {
        Actor::new(self.user.unwrap_or_else(|| UserId::from_uuid(uuid::Uuid::nil())), self.role)
    }

    /// The acting user for shopper operations. Requires `--user`.
    pub fn shopper(&self) -> Result<Actor> {
        match self.user {
            Some(user_id) => Ok(Actor::new(user_id, self.role)),
            None => bail!("This command acts on a user's cart; pass --user <uuid>"),
        }
    }

    /// Connect to Postgres.
    pub async fn connect(&self) -> Result<Db> {
        let spinner = self.output.spinner("Connecting to database...");
        let result = Db::connect(&self.config.database).await;
        spinner.finish_and_clear();
        result.with_context(|| {
            format!(
                "Failed to connect to {}",
                self.config.database.redacted_url()
            )
        })
    }

    /// Connect and build the services over the Postgres store.
    pub async fn commerce(&self) -> Result<Commerce> {
        let db = self.connect().await?;
        let store = Arc::new(PgStore::new(db.pool().clone()));
        Ok(Commerce::new(
            store,
            Arc::new(SystemClock),
            self.config.commerce.clone(),
        ))
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        resolve(&self.cwd, path)
    }
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        cwd.join(path)
    }
}

/// Find config file in directory tree.
fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}
