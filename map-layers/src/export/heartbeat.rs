//! Heartbeat de progression pour les opérations longues
//!
//! Une tâche Tokio indépendante émet `...still running (Ns elapsed)` à
//! intervalle fixe tant que l'opération surveillée n'est pas terminée.
//! Le heartbeat n'a aucun effet sur l'opération elle-même.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

/// Intervalle par défaut entre deux messages
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(20);

/// Attente maximale de la fin de la tâche à l'arrêt
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Heartbeat en cours d'exécution
///
/// Doit être arrêté avec [`Heartbeat::stop`]. S'il est droppé sans arrêt
/// (retour anticipé, panic), l'annulation est signalée et la tâche avortée.
pub struct Heartbeat {
    label: &'static str,
    cancel: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
    beats: Arc<AtomicU64>,
}

impl Heartbeat {
    /// Démarre le heartbeat sur une tâche dédiée
    pub fn start(label: &'static str, interval: Duration) -> Self {
        let (cancel, cancelled) = watch::channel(false);
        let beats = Arc::new(AtomicU64::new(0));
        let handle = tokio::spawn(run(label, interval, cancelled, Arc::clone(&beats)));

        Self {
            label,
            cancel: Some(cancel),
            handle: Some(handle),
            beats,
        }
    }

    /// Nombre de messages émis jusqu'ici
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    /// Compteur partagé des messages, toujours lisible après l'arrêt
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.beats)
    }

    /// Signale l'arrêt et attend la fin de la tâche (attente bornée)
    ///
    /// Retourne le nombre de messages émis.
    pub async fn stop(mut self) -> u64 {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(true);
        }

        if let Some(mut handle) = self.handle.take() {
            match tokio::time::timeout(JOIN_TIMEOUT, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(label = self.label, error = %e, "Heartbeat task failed"),
                Err(_) => {
                    warn!(label = self.label, "Heartbeat did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        self.beats()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(true);
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run(
    label: &'static str,
    interval: Duration,
    mut cancelled: watch::Receiver<bool>,
    beats: Arc<AtomicU64>,
) {
    let started = Instant::now();

    loop {
        if *cancelled.borrow() {
            break;
        }

        let elapsed = started.elapsed().as_secs();
        info!(label, elapsed_secs = elapsed, "...still running ({}s elapsed)", elapsed);
        beats.fetch_add(1, Ordering::Relaxed);

        tokio::select! {
            changed = cancelled.changed() => {
                // Sender droppé: l'opération est terminée
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
