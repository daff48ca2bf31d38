//! Paramètres d'exécution du pipeline

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::export::heartbeat::DEFAULT_INTERVAL;
use crate::export::postgres::DEFAULT_GEOM_COL;

/// Script SQL des couches, relatif à la racine du dépôt
pub const SQL_SCRIPT: &str = "sql/queries/05_create_map_layers.sql";

/// Répertoire d'export, relatif à la racine du dépôt
pub const EXPORT_DIR: &str = "map/export";

/// Paramètres d'une exécution
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Racine du dépôt
    pub root: PathBuf,
    /// Script SQL exécuté en un seul lot
    pub sql_path: PathBuf,
    /// Répertoire des fichiers GeoJSON
    pub export_dir: PathBuf,
    /// Intervalle du heartbeat pendant le lot
    pub heartbeat_interval: Duration,
    /// Colonne géométrique des tables exportées
    pub geom_col: String,
}

impl RunSettings {
    /// Paramètres par défaut pour une racine de dépôt
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            sql_path: root.join(SQL_SCRIPT),
            export_dir: root.join(EXPORT_DIR),
            heartbeat_interval: DEFAULT_INTERVAL,
            geom_col: DEFAULT_GEOM_COL.to_string(),
            root,
        }
    }
}

/// Racine du dépôt depuis le répertoire courant
///
/// Lancé depuis `scripts/`, la racine est le répertoire parent.
pub fn resolve_root(cwd: &Path) -> PathBuf {
    match (cwd.file_name(), cwd.parent()) {
        (Some(name), Some(parent)) if name == "scripts" => parent.to_path_buf(),
        _ => cwd.to_path_buf(),
    }
}
