//! Erreurs du pipeline de couches cartographiques
//!
//! Chaque erreur appartient à une catégorie ([`ErrorKind`]) pour que
//! l'appelant puisse brancher sans inspecter les messages.

use std::path::PathBuf;

use thiserror::Error;

use sqlscript::ScriptError;

/// Catégorie d'une erreur du pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Identifiants manquants, port invalide, nom de table invalide
    Configuration,
    /// Script SQL introuvable
    ResourceNotFound,
    /// Aucune instruction à exécuter
    EmptyInput,
    /// Une instruction du lot a échoué (lot annulé)
    Execution,
    /// Une table exportée est vide
    EmptyResult,
    /// Réseau, pool, fichiers, géométries, reprojection
    Io,
}

/// Erreur du pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing SQL file: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error(transparent)]
    Script(ScriptError),

    #[error("No SQL statements to execute")]
    EmptyBatch,

    /// Erreur remontée telle quelle par l'instruction fautive
    #[error(transparent)]
    Execution(tokio_postgres::Error),

    #[error("Export table {table} returned 0 rows.")]
    EmptyExport { table: String },

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("Geometry column {column:?} not found in {table}")]
    MissingGeometryColumn { table: String, column: String },

    #[error("Mixed SRIDs in {table}: EPSG:{declared} and EPSG:{found}")]
    MixedSrid {
        table: String,
        declared: i32,
        found: i32,
    },

    #[error("Reprojection error: {0}")]
    Reprojection(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Failed to create database pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] geozero::error::GeozeroError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Catégorie de l'erreur
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::InvalidTableName(_) | Self::MissingGeometryColumn { .. } => {
                ErrorKind::Configuration
            }
            Self::ScriptNotFound(_) => ErrorKind::ResourceNotFound,
            Self::Script(e) if e.is_empty_script() => ErrorKind::EmptyInput,
            Self::EmptyBatch => ErrorKind::EmptyInput,
            Self::Execution(_) => ErrorKind::Execution,
            Self::EmptyExport { .. } => ErrorKind::EmptyResult,
            Self::Script(_)
            | Self::MixedSrid { .. }
            | Self::Reprojection(_)
            | Self::Database(_)
            | Self::Pool(_)
            | Self::CreatePool(_)
            | Self::Geometry(_)
            | Self::Serialization(_)
            | Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<ScriptError> for PipelineError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::NotFound(path) => Self::ScriptNotFound(path),
            other => Self::Script(other),
        }
    }
}
