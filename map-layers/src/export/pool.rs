//! Pool de connexions PostgreSQL

use std::fmt;
use std::time::Duration;

use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, Timeouts};
use tokio_postgres::NoTls;
use tracing::debug;

use crate::error::PipelineError;

/// Configuration de la base de données
///
/// Construite une seule fois au démarrage puis passée par référence.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub pool_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "wildfire_grid".into(),
            user: String::new(),
            password: String::new(),
            pool_size: 4,
        }
    }
}

// Le mot de passe ne doit jamais apparaître dans les logs
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

/// Surcharges issues de la ligne de commande
#[derive(Debug, Default, Clone)]
pub struct DatabaseOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl DatabaseConfig {
    /// Charge la configuration depuis les variables d'environnement
    /// (`DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `DB_POOL_SIZE`)
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Charge la configuration via une fonction de lecture des variables
    ///
    /// Une variable vide est traitée comme absente.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("DB_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| PipelineError::Config(format!("Invalid DB_PORT: {raw:?}")))?,
            None => defaults.port,
        };

        let pool_size = match get("DB_POOL_SIZE") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| PipelineError::Config(format!("Invalid DB_POOL_SIZE: {raw:?}")))?,
            None => defaults.pool_size,
        };

        Ok(Self {
            host: get("DB_HOST").unwrap_or(defaults.host),
            port,
            dbname: get("DB_NAME").unwrap_or(defaults.dbname),
            user: get("DB_USER").unwrap_or_default(),
            password: get("DB_PASSWORD").unwrap_or_default(),
            pool_size,
        })
    }

    /// Applique les surcharges de la ligne de commande
    pub fn apply_overrides(&mut self, overrides: DatabaseOverrides) {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(dbname) = overrides.dbname {
            self.dbname = dbname;
        }
        if let Some(user) = overrides.user {
            self.user = user;
        }
        if let Some(password) = overrides.password {
            self.password = password;
        }
    }

    /// Vérifie que les identifiants sont présents
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.user.is_empty() || self.password.is_empty() {
            return Err(PipelineError::Config(
                "Missing DB_USER or DB_PASSWORD in environment (.env)".into(),
            ));
        }
        if self.pool_size == 0 {
            return Err(PipelineError::Config("DB_POOL_SIZE must be at least 1".into()));
        }
        Ok(())
    }
}

impl fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.dbname)
    }
}

/// Crée un pool de connexions
///
/// La configuration est validée avant toute tentative réseau; le pool
/// lui-même n'ouvre aucune connexion à sa création.
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool, PipelineError> {
    config.validate()?;

    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.dbname = Some(config.dbname.clone());
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());

    cfg.pool = Some(PoolConfig {
        max_size: config.pool_size,
        timeouts: Timeouts {
            wait: Some(Duration::from_secs(30)),
            create: Some(Duration::from_secs(10)),
            recycle: Some(Duration::from_secs(30)),
        },
        ..Default::default()
    });

    debug!(database = %config, pool_size = config.pool_size, "Creating database pool");
    Ok(cfg.create_pool(Some(Runtime::Tokio1), NoTls)?)
}

/// Teste la connexion à la base
pub async fn test_connection(pool: &Pool) -> Result<(), PipelineError> {
    let client = pool.get().await?;
    client.execute("SELECT 1", &[]).await?;
    Ok(())
}
