//! Point d'entrée CLI pour map-layers

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::{Commands, RunArgs};

/// Construire les couches cartographiques PostGIS et les exporter en GeoJSON
#[derive(Parser)]
#[command(name = "map-layers")]
#[command(author, version)]
#[command(about = "Exécuter le script SQL des couches puis exporter les tables en GeoJSON WGS84")]
#[command(long_about = "Exécute sql/queries/05_create_map_layers.sql en une seule transaction puis exporte les couches cartographiques vers map/export/.\n\nUtilisez 'check-sql' pour vérifier le découpage du script sans base de données.")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Sous-commande (défaut: lot SQL puis export)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Arguments de la commande par défaut
    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Some(Commands::CheckSql { sql, root }) => {
            cli::cmd_check_sql(sql, root)?;
        }
        None => {
            info!(heartbeat_secs = cli.run.heartbeat_secs, "Map layers export");
            cli::cmd_run(cli.run).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
