use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;

pub const DEFAULT_API_BASE_URL: &str = "https://forkify-api.herokuapp.com/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Use `db_path` when given, otherwise the per-user data directory.
    pub fn resolve(db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => default_db_path()?,
        };
        Ok(Self::new(db_path))
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from("com", "RecipeBox", "recipe_box")
        .context("Cannot determine project dirs")?;
    Ok(proj.data_dir().join("recipe_box.db"))
}
