//! Rapport d'exécution du pipeline
//!
//! Affiché en fin d'exécution et sauvegardable en JSON.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::error::PipelineError;
use crate::export::layer::ExportedLayer;
use crate::export::transaction::BatchReport;

/// Rapport complet d'une exécution réussie
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Script SQL exécuté
    pub sql_path: String,
    /// Nombre d'instructions exécutées dans le lot
    pub statements_executed: usize,
    /// Durée du lot SQL
    pub batch_duration_secs: f64,
    /// Couches exportées, dans l'ordre du manifeste
    pub layers: Vec<ExportedLayer>,
    /// Durée totale
    pub duration_secs: f64,
}

impl RunReport {
    pub fn new(
        sql_path: &Path,
        batch: &BatchReport,
        layers: Vec<ExportedLayer>,
        duration: Duration,
    ) -> Self {
        Self {
            sql_path: sql_path.display().to_string(),
            statements_executed: batch.statements_executed,
            batch_duration_secs: batch.duration.as_secs_f64(),
            layers,
            duration_secs: duration.as_secs_f64(),
        }
    }

    /// Nombre total de lignes exportées
    pub fn total_rows(&self) -> usize {
        self.layers.iter().map(|l| l.rows).sum()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("MAP LAYERS REPORT");
        println!("{}", "=".repeat(60));

        println!("\nSQL: {}", self.sql_path);
        println!(
            "Statements: {} executed in {:.2}s",
            self.statements_executed, self.batch_duration_secs
        );

        println!("\n--- LAYERS ---");
        for layer in &self.layers {
            println!(
                "  {} -> {} (rows={}, EPSG:{}, {:?})",
                layer.table,
                layer.path.display(),
                layer.rows,
                layer.epsg,
                layer.normalization
            );
        }

        println!("\nTotal rows: {}", self.total_rows());
        println!("Duration: {:.2}s", self.duration_secs);
        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} statements, {} layers, {} rows",
            self.statements_executed,
            self.layers.len(),
            self.total_rows()
        )
    }
}
