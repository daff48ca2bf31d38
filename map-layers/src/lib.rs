//! # map-layers
//!
//! Construction des couches cartographiques dans PostGIS puis export GeoJSON.
//!
//! ## Features
//!
//! - Exécution d'un script SQL en une seule transaction (tout ou rien)
//! - Heartbeat de progression pendant le lot
//! - Export des tables en GeoJSON WGS84 (assignation ou reprojection PROJ)
//! - Rapport d'exécution JSON
//!
//! ## Usage CLI
//!
//! ```bash
//! # Depuis la racine du dépôt (ou depuis scripts/)
//! map-layers
//!
//! # Vérifier le découpage du script sans base de données
//! map-layers check-sql --sql sql/queries/05_create_map_layers.sql
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod manifest;
pub mod report;

pub use config::RunSettings;
pub use error::{ErrorKind, PipelineError};
pub use export::pool::{create_pool, DatabaseConfig, DatabaseOverrides};
pub use manifest::{export_manifest, run_pipeline, LayerManifest, ManifestEntry};
pub use report::RunReport;
