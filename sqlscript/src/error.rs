//! Types d'erreurs pour le crate sqlscript

use std::path::PathBuf;

use thiserror::Error;

/// Erreurs pouvant survenir lors du chargement ou du découpage d'un script SQL
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Fichier SQL introuvable
    #[error("Missing SQL file: {}", .0.display())]
    NotFound(PathBuf),

    /// Erreur d'I/O lors de la lecture du script
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Le script n'est pas de l'UTF-8 valide
    #[error("SQL file is not valid UTF-8: {}", .0.display())]
    InvalidEncoding(PathBuf),

    /// Aucune instruction exécutable après découpage
    #[error("No executable SQL statements found in {0}")]
    Empty(String),
}

impl ScriptError {
    /// Vrai si l'erreur signale un script sans instruction
    pub fn is_empty_script(&self) -> bool {
        matches!(self, Self::Empty(_))
    }
}
