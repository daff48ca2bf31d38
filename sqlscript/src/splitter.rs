//! Découpage d'un script SQL en instructions exécutables
//!
//! Le découpage est volontairement naïf: on coupe sur chaque `;`.
//! Un `;` dans une chaîne littérale ou dans un bloc procédural
//! (`DO $$ ... $$`) n'est pas reconnu et produit un découpage faux.
//! Les scripts acceptés ne contiennent pas ces constructions.

use std::fmt;

use memchr::memchr_iter;

use crate::ScriptError;

/// Terminateur d'instruction
pub const TERMINATOR: u8 = b';';

/// Marqueur de commentaire de ligne
pub const LINE_COMMENT: &str = "--";

/// Longueur maximale d'un aperçu d'instruction (en caractères)
pub const PREVIEW_LEN: usize = 120;

/// Une instruction SQL exécutable, numérotée à partir de 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Position dans le script (1-based)
    pub ordinal: usize,
    /// Texte de l'instruction, sans le terminateur
    pub sql: String,
}

impl Statement {
    /// Aperçu sur une ligne, tronqué à [`PREVIEW_LEN`] caractères
    pub fn preview(&self) -> String {
        preview(&self.sql, PREVIEW_LEN)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Découpe un script en instructions
///
/// # Errors
///
/// Retourne [`ScriptError::Empty`] si aucune instruction exécutable n'est trouvée.
pub fn split_statements(sql: &str) -> Result<Vec<Statement>, ScriptError> {
    split_with_origin(sql, "inline script")
}

pub(crate) fn split_with_origin(sql: &str, origin: &str) -> Result<Vec<Statement>, ScriptError> {
    let statements: Vec<Statement> = fragments(sql)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty() && !is_comment_only(fragment))
        .enumerate()
        .map(|(i, fragment)| Statement {
            ordinal: i + 1,
            sql: fragment.to_string(),
        })
        .collect();

    if statements.is_empty() {
        return Err(ScriptError::Empty(origin.to_string()));
    }

    tracing::debug!(origin, count = statements.len(), "Split SQL script");
    Ok(statements)
}

/// Itère sur les fragments entre deux terminateurs (recherche SIMD)
fn fragments(sql: &str) -> impl Iterator<Item = &str> {
    let mut start = 0;
    let mut cuts = memchr_iter(TERMINATOR, sql.as_bytes());
    let mut done = false;

    std::iter::from_fn(move || {
        if done {
            return None;
        }
        match cuts.next() {
            Some(pos) => {
                // ';' est ASCII: pos tombe toujours sur une frontière de caractère
                let fragment = &sql[start..pos];
                start = pos + 1;
                Some(fragment)
            }
            None => {
                done = true;
                Some(&sql[start..])
            }
        }
    })
}

/// Vrai si chaque ligne du fragment est vide ou un commentaire `--`
pub fn is_comment_only(fragment: &str) -> bool {
    fragment.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with(LINE_COMMENT)
    })
}

/// Aperçu d'une instruction: espaces fusionnés, coupé à `max_chars` caractères
pub fn preview(sql: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(max_chars.min(sql.len()));
    let mut count = 0;

    for (i, word) in sql.split_whitespace().enumerate() {
        if i > 0 {
            if count == max_chars {
                break;
            }
            out.push(' ');
            count += 1;
        }
        for c in word.chars() {
            if count == max_chars {
                return out;
            }
            out.push(c);
            count += 1;
        }
    }

    out
}
