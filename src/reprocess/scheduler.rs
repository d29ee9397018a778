//! Periodic driver for the reprocessing sweep.
//!
//! A single scheduler owns the recurring `reprocess_all_users` call.
//! Sweeps never overlap: an atomic flag guards the running sweep, and a
//! tick (or manual trigger) that arrives while one is still in flight
//! is skipped, not queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval_at};
use tracing::{error, info, warn};

use super::service::ReprocessService;

/// Commands that can be sent to the scheduler.
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Trigger a sweep immediately (skipped if one is running)
    RunNow,
    /// Stop the scheduler loop
    Stop,
}

/// Interval-driven runner for the reprocessing sweep.
pub struct ReprocessScheduler {
    service: Arc<ReprocessService>,
    period: Duration,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: Option<mpsc::Receiver<SchedulerCommand>>,
    sweeping: Arc<AtomicBool>,
}

impl ReprocessScheduler {
    /// Create a scheduler sweeping every `period` (first sweep one full
    /// period after start, not immediately).
    pub fn new(service: Arc<ReprocessService>, period: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::channel(8);
        Self {
            service,
            period,
            command_tx,
            command_rx: Some(command_rx),
            sweeping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a sender for commands.
    pub fn command_sender(&self) -> mpsc::Sender<SchedulerCommand> {
        self.command_tx.clone()
    }

    /// Start the scheduler loop in a spawned task.
    pub fn start(mut self) -> tokio::task::JoinHandle<()> {
        let mut command_rx = self.command_rx.take().expect("Scheduler already started");

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.period;
            let mut ticker = interval_at(start, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(period_secs = self.period.as_secs(), "Reprocess scheduler started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.trigger(),
                    command = command_rx.recv() => match command {
                        Some(SchedulerCommand::RunNow) => self.trigger(),
                        Some(SchedulerCommand::Stop) | None => break,
                    },
                }
            }
            info!("Reprocess scheduler stopped");
        })
    }

    /// Kick off a sweep on its own task unless one is already running.
    fn trigger(&self) {
        if self.sweeping.swap(true, Ordering::SeqCst) {
            warn!("Previous reprocess sweep still running, skipping this trigger");
            return;
        }

        let service = Arc::clone(&self.service);
        let sweeping = Arc::clone(&self.sweeping);
        tokio::spawn(async move {
            if let Err(e) = service.reprocess_all_users().await {
                error!("Reprocess sweep failed: {e}");
            }
            sweeping.store(false, Ordering::SeqCst);
        });
    }
}
