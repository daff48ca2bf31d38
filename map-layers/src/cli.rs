//! Définition et implémentation des commandes CLI
//!
//! - (défaut): lot SQL puis export des couches
//! - `check-sql`: découpage du script, sans base de données

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use map_layers::config::{resolve_root, RunSettings};
use map_layers::{create_pool, run_pipeline, DatabaseConfig, DatabaseOverrides};

#[derive(Subcommand)]
pub enum Commands {
    /// Split the SQL script and list its statements (no database required)
    CheckSql {
        /// Path to the SQL script (default: <root>/sql/queries/05_create_map_layers.sql)
        #[arg(long)]
        sql: Option<PathBuf>,

        /// Repository root (default: current directory, or its parent from scripts/)
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

/// Arguments de la commande par défaut
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Repository root (default: current directory, or its parent from scripts/)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// SQL script creating the map layers
    #[arg(long)]
    pub sql: Option<PathBuf>,

    /// Output directory for GeoJSON files
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Seconds between progress messages while the SQL batch runs
    #[arg(long, default_value_t = 20)]
    pub heartbeat_secs: u64,

    /// Geometry column of the exported tables
    #[arg(long, default_value = "geom")]
    pub geom_col: String,

    /// Save the run report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// PostgreSQL host (défaut : env DB_HOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL port (défaut : env DB_PORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// PostgreSQL database name (défaut : env DB_NAME / wildfire_grid)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env DB_USER)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env DB_PASSWORD)
    #[arg(long)]
    pub password: Option<String>,
}

impl RunArgs {
    /// Construit les paramètres d'exécution
    pub fn settings(&self, cwd: &Path) -> Result<RunSettings> {
        if self.heartbeat_secs == 0 {
            anyhow::bail!("--heartbeat-secs must be at least 1");
        }

        let root = self.root.clone().unwrap_or_else(|| resolve_root(cwd));
        let mut settings = RunSettings::for_root(root);
        if let Some(sql) = &self.sql {
            settings.sql_path = sql.clone();
        }
        if let Some(export_dir) = &self.export_dir {
            settings.export_dir = export_dir.clone();
        }
        settings.heartbeat_interval = Duration::from_secs(self.heartbeat_secs);
        settings.geom_col = self.geom_col.clone();
        Ok(settings)
    }

    fn overrides(&self) -> DatabaseOverrides {
        DatabaseOverrides {
            host: self.host.clone(),
            port: self.port,
            dbname: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

/// Exécute le pipeline complet
pub async fn cmd_run(args: RunArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let settings = args.settings(&cwd)?;

    let mut db_config = DatabaseConfig::from_env()?;
    db_config.apply_overrides(args.overrides());

    println!("=== Map layers ===");
    println!("Repo root: {}", settings.root.display());
    println!("SQL: {}", settings.sql_path.display());
    println!("Export dir: {}", settings.export_dir.display());
    println!("Database: {}", db_config);

    let pool = create_pool(&db_config)?;
    let report = run_pipeline(&pool, &settings)
        .await
        .with_context(|| format!("Map layer export failed ({})", settings.sql_path.display()))?;

    report.display();
    if let Some(path) = &args.report {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to save report to {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }

    info!(summary = %report.summary(), "Map layers exported");
    Ok(())
}

/// Découpe le script et affiche les instructions
pub fn cmd_check_sql(sql: Option<PathBuf>, root: Option<PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let root = root.unwrap_or_else(|| resolve_root(&cwd));
    let sql_path = sql.unwrap_or_else(|| RunSettings::for_root(&root).sql_path);

    let script = sqlscript::load(&sql_path)?;
    let statements = script.statements()?;

    println!("SQL statements in {}: {}", sql_path.display(), statements.len());
    for statement in &statements {
        println!(
            "[{}/{}] {}",
            statement.ordinal,
            statements.len(),
            statement.preview()
        );
    }

    Ok(())
}
