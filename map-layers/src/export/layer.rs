//! Export d'une table de couche vers un fichier GeoJSON en WGS84

use std::path::{Path, PathBuf};

use geo::Geometry;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::geojson::write_layer;
use super::postgres::LayerSource;
use super::reproject::{Reprojector, WGS84};
use crate::error::PipelineError;

/// Une ligne de table: géométrie (éventuellement nulle) et propriétés
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRow {
    pub geometry: Option<Geometry>,
    /// Valeurs alignées sur [`LayerData::columns`]
    pub properties: Vec<Value>,
}

/// Contenu complet d'une table de couche, chargé en mémoire
#[derive(Debug, Clone, PartialEq)]
pub struct LayerData {
    pub table: String,
    /// Colonnes non géométriques, dans l'ordre de la table
    pub columns: Vec<String>,
    pub rows: Vec<LayerRow>,
    /// SRID déclaré (None: aucun système de référence)
    pub srid: Option<i32>,
}

impl LayerData {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            srid: None,
        }
    }

    /// Enregistre le SRID d'une géométrie lue
    ///
    /// Le premier SRID rencontré devient le SRID déclaré; un SRID différent
    /// ensuite est une erreur. Les géométries sans SRID sont acceptées.
    pub fn observe_srid(&mut self, srid: Option<i32>) -> Result<(), PipelineError> {
        match (self.srid, srid) {
            (_, None) => Ok(()),
            (None, Some(found)) => {
                self.srid = Some(found);
                Ok(())
            }
            (Some(declared), Some(found)) if declared == found => Ok(()),
            (Some(declared), Some(found)) => Err(PipelineError::MixedSrid {
                table: self.table.clone(),
                declared,
                found,
            }),
        }
    }
}

/// Normalisation du système de référence appliquée à l'export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrsNormalization {
    /// Aucun SRID déclaré: étiqueté WGS84, coordonnées inchangées
    Assigned,
    /// Déjà en WGS84
    Unchanged,
    /// Reprojeté depuis un autre EPSG
    Reprojected { from: u32 },
}

/// Couche écrite sur disque
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedLayer {
    pub table: String,
    pub path: PathBuf,
    pub rows: usize,
    pub epsg: u32,
    pub normalization: CrsNormalization,
}

/// Normalise une couche en WGS84 et l'écrit en GeoJSON
///
/// # Errors
///
/// - [`PipelineError::EmptyExport`] si la couche n'a aucune ligne (aucun fichier écrit)
/// - erreurs de reprojection ou d'écriture
pub fn export_layer(mut data: LayerData, out_path: &Path) -> Result<ExportedLayer, PipelineError> {
    if data.rows.is_empty() {
        return Err(PipelineError::EmptyExport { table: data.table });
    }

    let normalization = normalize_to_wgs84(&mut data)?;

    write_layer(out_path, WGS84, &data.columns, &data.rows)?;

    let exported = ExportedLayer {
        table: data.table,
        path: out_path.to_path_buf(),
        rows: data.rows.len(),
        epsg: WGS84,
        normalization,
    };

    info!(
        table = %exported.table,
        path = %exported.path.display(),
        rows = exported.rows,
        normalization = ?exported.normalization,
        "Wrote {}  (rows={})",
        exported.path.display(),
        exported.rows
    );

    Ok(exported)
}

/// Assigne ou reprojette les géométries en WGS84
fn normalize_to_wgs84(data: &mut LayerData) -> Result<CrsNormalization, PipelineError> {
    let source = match data.srid {
        None => return Ok(CrsNormalization::Assigned),
        Some(srid) => u32::try_from(srid).map_err(|_| {
            PipelineError::Reprojection(format!("Invalid SRID {} in {}", srid, data.table))
        })?,
    };

    if source == WGS84 {
        return Ok(CrsNormalization::Unchanged);
    }

    let reprojector = Reprojector::to_wgs84(source)?;
    for row in &mut data.rows {
        if let Some(geometry) = &row.geometry {
            row.geometry = Some(reprojector.transform_geometry(geometry)?);
        }
    }
    data.srid = Some(WGS84 as i32);

    Ok(CrsNormalization::Reprojected { from: source })
}

/// Lit une table et l'exporte en GeoJSON WGS84
pub async fn export_table<S: LayerSource + ?Sized>(
    source: &S,
    table: &str,
    out_path: &Path,
    geom_col: &str,
) -> Result<ExportedLayer, PipelineError> {
    let data = source.fetch_layer(table, geom_col).await?;
    export_layer(data, out_path)
}
