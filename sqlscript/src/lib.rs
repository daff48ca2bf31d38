//! # sqlscript
//!
//! Chargement et découpage de scripts SQL exécutés en un seul lot.
//!
//! ## Features
//!
//! - Découpage sur `;` avec recherche SIMD (`memchr`)
//! - Validation UTF-8 SIMD (`simdutf8`)
//! - Suppression des blocs composés uniquement de commentaires `--`
//! - Instructions numérotées à partir de 1, dans l'ordre du fichier
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! let script = sqlscript::load(Path::new("sql/queries/05_create_map_layers.sql"))?;
//! for statement in script.statements()? {
//!     println!("[{}] {}", statement.ordinal, statement.preview());
//! }
//! ```

pub mod error;
pub mod splitter;

pub use error::ScriptError;
pub use splitter::{preview, split_statements, Statement, PREVIEW_LEN};

use std::path::{Path, PathBuf};

/// Marque d'ordre d'octets UTF-8, ignorée en tête de fichier
const UTF8_BOM: &str = "\u{feff}";

/// Script SQL brut, tel que lu sur disque
#[derive(Debug, Clone)]
pub struct Script {
    origin: String,
    text: String,
}

impl Script {
    /// Construit un script depuis du texte (l'origine sert aux messages d'erreur)
    pub fn from_text(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            text: text.into(),
        }
    }

    /// Origine du script (chemin du fichier en général)
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Texte brut
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Découpe le script en instructions exécutables
    ///
    /// # Errors
    ///
    /// Retourne [`ScriptError::Empty`] si le script ne contient aucune instruction.
    pub fn statements(&self) -> Result<Vec<Statement>, ScriptError> {
        splitter::split_with_origin(&self.text, &self.origin)
    }
}

/// Lit un script SQL UTF-8 depuis le disque
///
/// # Errors
///
/// - [`ScriptError::NotFound`] si le fichier n'existe pas
/// - [`ScriptError::InvalidEncoding`] si le contenu n'est pas de l'UTF-8
/// - [`ScriptError::Io`] pour les autres erreurs de lecture
pub fn load(path: &Path) -> Result<Script, ScriptError> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ScriptError::NotFound(path.to_path_buf()),
        _ => ScriptError::Io {
            path: PathBuf::from(path),
            source,
        },
    })?;

    let text = simdutf8::basic::from_utf8(&bytes)
        .map_err(|_| ScriptError::InvalidEncoding(path.to_path_buf()))?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Loaded SQL script");

    Ok(Script::from_text(path.display().to_string(), text))
}
