//! Exécution atomique d'un lot d'instructions SQL
//!
//! Toutes les instructions d'un script passent dans une seule transaction:
//! la première erreur annule l'ensemble du lot.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deadpool_postgres::{Pool, Transaction};
use tracing::{error, info};

use sqlscript::Statement;

use super::heartbeat::Heartbeat;
use crate::error::PipelineError;

/// Transaction ouverte sur laquelle s'exécute un lot
#[async_trait]
pub trait BatchSession: Send {
    /// Exécute une instruction dans la transaction
    async fn execute(&mut self, sql: &str) -> Result<(), PipelineError>;

    /// Valide la transaction
    async fn commit(self) -> Result<(), PipelineError>;

    /// Annule la transaction
    async fn rollback(self) -> Result<(), PipelineError>;
}

/// Session PostgreSQL adossée à une transaction du pool
pub struct PgBatchSession<'a> {
    transaction: Transaction<'a>,
}

impl<'a> PgBatchSession<'a> {
    pub fn new(transaction: Transaction<'a>) -> Self {
        Self { transaction }
    }
}

#[async_trait]
impl<'a> BatchSession for PgBatchSession<'a> {
    async fn execute(&mut self, sql: &str) -> Result<(), PipelineError> {
        // Protocole simple: une instruction DDL/DML brute, sans paramètres
        self.transaction
            .batch_execute(sql)
            .await
            .map_err(PipelineError::Execution)
    }

    async fn commit(self) -> Result<(), PipelineError> {
        Ok(self.transaction.commit().await?)
    }

    async fn rollback(self) -> Result<(), PipelineError> {
        Ok(self.transaction.rollback().await?)
    }
}

/// Rapport d'exécution d'un lot
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Nombre d'instructions exécutées (et commitées)
    pub statements_executed: usize,
    /// Durée totale, commit compris
    pub duration: Duration,
    /// Nombre de messages heartbeat émis
    pub heartbeats: u64,
}

/// Exécute un lot dans la session fournie
///
/// Les instructions sont exécutées dans l'ordre, sous surveillance d'un
/// heartbeat. Succès: commit. Première erreur: rollback, puis l'erreur de
/// l'instruction est retournée telle quelle.
///
/// # Errors
///
/// - [`PipelineError::EmptyBatch`] si `statements` est vide
/// - l'erreur de la première instruction en échec
/// - l'erreur du commit
pub async fn execute_batch<S: BatchSession>(
    mut session: S,
    statements: &[Statement],
    heartbeat_interval: Duration,
) -> Result<BatchReport, PipelineError> {
    if statements.is_empty() {
        return Err(PipelineError::EmptyBatch);
    }

    let heartbeat = Heartbeat::start("sql batch", heartbeat_interval);
    execute_monitored(session, statements, heartbeat).await
}

/// Exécute le lot puis arrête le heartbeat, quel que soit le résultat
async fn execute_monitored<S: BatchSession>(
    mut session: S,
    statements: &[Statement],
    heartbeat: Heartbeat,
) -> Result<BatchReport, PipelineError> {
    let started = Instant::now();
    info!(count = statements.len(), "SQL statements to execute: {}", statements.len());

    let outcome = execute_in_order(&mut session, statements).await;
    let heartbeats = heartbeat.stop().await;

    match outcome {
        Ok(executed) => {
            session.commit().await?;
            info!(
                statements = executed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "SQL execution complete."
            );
            Ok(BatchReport {
                statements_executed: executed,
                duration: started.elapsed(),
                heartbeats,
            })
        }
        Err((ordinal, e)) => {
            error!(
                ordinal,
                total = statements.len(),
                error = %e,
                "SQL statement failed, rolling back batch"
            );
            if let Err(rb) = session.rollback().await {
                // La transaction est aussi annulée au drop de la connexion
                error!(error = %rb, "Explicit rollback failed");
            }
            Err(e)
        }
    }
}

/// Exécute les instructions une par une; s'arrête à la première erreur
async fn execute_in_order<S: BatchSession>(
    session: &mut S,
    statements: &[Statement],
) -> Result<usize, (usize, PipelineError)> {
    let total = statements.len();

    for (i, statement) in statements.iter().enumerate() {
        let position = i + 1;
        info!(
            ordinal = statement.ordinal,
            total,
            "[{}/{}] Executing: {} ...",
            position,
            total,
            statement.preview()
        );
        session
            .execute(&statement.sql)
            .await
            .map_err(|e| (statement.ordinal, e))?;
    }

    Ok(total)
}

/// Exécute un lot sur une connexion du pool, dans une transaction unique
///
/// Un lot vide est rejeté avant toute connexion.
pub async fn run_statements(
    pool: &Pool,
    statements: &[Statement],
    heartbeat_interval: Duration,
) -> Result<BatchReport, PipelineError> {
    if statements.is_empty() {
        return Err(PipelineError::EmptyBatch);
    }

    let mut client = pool.get().await?;
    let transaction = client.transaction().await?;

    execute_batch(PgBatchSession::new(transaction), statements, heartbeat_interval).await
}

/// Charge, découpe et exécute un fichier SQL
pub async fn run_sql_file(
    pool: &Pool,
    sql_path: &Path,
    heartbeat_interval: Duration,
) -> Result<BatchReport, PipelineError> {
    if !sql_path.exists() {
        return Err(PipelineError::ScriptNotFound(sql_path.to_path_buf()));
    }

    let script = sqlscript::load(sql_path)?;
    let statements = script.statements()?;

    run_statements(pool, &statements, heartbeat_interval).await
}
