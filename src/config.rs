use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{ErrorKind, Result, ResultExt};

pub const DEFAULT_POSTS_ON_PAGES: i64 = 10;
pub const DEFAULT_INDEX_CACHE_TTL: u64 = 20;
pub const DEFAULT_MEDIA_ROOT: &str = "media";
pub const DEFAULT_DB_POOL_SIZE: u32 = 8;

/// Runtime settings, read once at startup and kept in Rocket's managed state.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Number of posts on one feed page.
    pub posts_on_pages: i64,
    /// How long a rendered home page stays cached.
    pub index_cache_ttl: Duration,
    pub media_root: PathBuf,
    pub db_pool_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL").chain_err(|| "DATABASE_URL must be set")?;

        let posts_on_pages = setting("POSTS_ON_PAGES", DEFAULT_POSTS_ON_PAGES)?;
        if posts_on_pages < 1 {
            return Err(ErrorKind::InvalidSetting("POSTS_ON_PAGES", "must be positive".into()).into());
        }

        let db_pool_size = setting("DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE)?;
        if db_pool_size == 0 {
            return Err(ErrorKind::InvalidSetting("DB_POOL_SIZE", "must be positive".into()).into());
        }

        Ok(Config {
            database_url,
            posts_on_pages,
            index_cache_ttl: Duration::from_secs(setting("INDEX_CACHE_TTL", DEFAULT_INDEX_CACHE_TTL)?),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MEDIA_ROOT)),
            db_pool_size,
        })
    }
}

fn setting<T>(name: &'static str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: ToString,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ErrorKind::InvalidSetting(name, e.to_string()).into()),
        Err(_) => Ok(default),
    }
}
