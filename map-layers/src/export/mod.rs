//! Modules d'export (lot SQL, lecture PostGIS, GeoJSON)

pub mod geojson;
pub mod heartbeat;
pub mod layer;
pub mod pool;
pub mod postgres;
pub mod reproject;
pub mod transaction;

pub use heartbeat::Heartbeat;
pub use layer::{export_layer, export_table, CrsNormalization, ExportedLayer, LayerData, LayerRow};
pub use postgres::{LayerSource, DEFAULT_GEOM_COL};
pub use reproject::Reprojector;
pub use transaction::{execute_batch, run_sql_file, run_statements, BatchReport, BatchSession};
