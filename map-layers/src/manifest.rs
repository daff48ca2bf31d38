//! Orchestration: lot SQL puis export des couches du manifeste
//!
//! Le lot est exécuté une seule fois, puis chaque couche est exportée dans
//! l'ordre du manifeste. La première erreur arrête tout.

use std::path::{Path, PathBuf};
use std::time::Instant;

use deadpool_postgres::Pool;
use tracing::info;

use crate::config::RunSettings;
use crate::error::PipelineError;
use crate::export::layer::{export_table, ExportedLayer};
use crate::export::pool::test_connection;
use crate::export::postgres::LayerSource;
use crate::export::transaction::run_sql_file;
use crate::report::RunReport;

/// Couches standard: (table, fichier)
const STANDARD_LAYERS: [(&str, &str); 5] = [
    ("map_tx_lines_all", "tx_lines_all.geojson"),
    ("map_tx_segments_vh", "tx_segments_vh.geojson"),
    ("map_tx_segments_joint", "tx_segments_joint.geojson"),
    // fonds polygonaux
    ("map_polygons_vh", "polygons_vh.geojson"),
    ("map_polygons_fire_union", "polygons_fire_union.geojson"),
];

/// Une entrée du manifeste
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub table: String,
    pub path: PathBuf,
}

/// Liste ordonnée des couches à exporter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerManifest {
    entries: Vec<ManifestEntry>,
}

impl LayerManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manifeste des couches cartographiques standard
    pub fn standard(export_dir: &Path) -> Self {
        STANDARD_LAYERS
            .iter()
            .fold(Self::new(), |manifest, (table, file)| {
                manifest.with_layer(*table, export_dir.join(file))
            })
    }

    /// Ajoute une couche en fin de manifeste
    pub fn with_layer(mut self, table: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.entries.push(ManifestEntry {
            table: table.into(),
            path: path.into(),
        });
        self
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exporte chaque couche dans l'ordre; s'arrête à la première erreur
pub async fn export_manifest<S: LayerSource + ?Sized>(
    source: &S,
    manifest: &LayerManifest,
    geom_col: &str,
) -> Result<Vec<ExportedLayer>, PipelineError> {
    info!(layers = manifest.len(), "Exporting GeoJSON layers...");

    let mut exported = Vec::with_capacity(manifest.len());
    for entry in manifest.entries() {
        let file = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(table = %entry.table, file = %file, "Export: {} -> {}", entry.table, file);

        exported.push(export_table(source, &entry.table, &entry.path, geom_col).await?);
    }

    Ok(exported)
}

/// Exécute le pipeline complet
///
/// 1. vérifie la présence du script SQL (avant tout accès base)
/// 2. prépare le répertoire d'export et teste la connexion
/// 3. exécute le script en une transaction
/// 4. exporte les couches du manifeste standard
pub async fn run_pipeline(pool: &Pool, settings: &RunSettings) -> Result<RunReport, PipelineError> {
    let started = Instant::now();

    if !settings.sql_path.exists() {
        return Err(PipelineError::ScriptNotFound(settings.sql_path.clone()));
    }

    std::fs::create_dir_all(&settings.export_dir)?;
    test_connection(pool).await?;

    info!(sql = %settings.sql_path.display(), "Running SQL to create map layers...");
    let batch = run_sql_file(pool, &settings.sql_path, settings.heartbeat_interval).await?;

    let manifest = LayerManifest::standard(&settings.export_dir);
    let layers = export_manifest(pool, &manifest, &settings.geom_col).await?;

    info!("Done.");
    Ok(RunReport::new(&settings.sql_path, &batch, layers, started.elapsed()))
}
