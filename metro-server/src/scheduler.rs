//! Per-train timers driving the movement engine.
//!
//! Each train gets its own task that sleeps for a random interval, advances
//! the train, and publishes the result. Shutdown is cooperative: tasks stop
//! at their next sleep, so an advance that has started always completes.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::broadcast::Broadcaster;
use crate::config::SimulationConfig;
use crate::domain::TrainId;
use crate::movement::MovementEngine;
use crate::store::TopologyStore;

/// Bounds for the random pause between two advances of one train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRange {
    pub min: Duration,
    pub max: Duration,
}

impl TickRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.tick_min(), config.tick_max())
    }

    /// Draw a pause uniformly from the range, at millisecond resolution.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if min >= max {
            return self.min;
        }
        Duration::from_millis(rng.gen_range(min..=max))
    }
}

/// Running per-train tasks.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(TrainId, JoinHandle<()>)>,
}

impl SchedulerHandle {
    /// Trains whose task is still running.
    pub fn active_trains(&self) -> Vec<TrainId> {
        self.tasks
            .iter()
            .filter(|(_, task)| !task.is_finished())
            .map(|(id, _)| *id)
            .collect()
    }

    /// A receiver that flips to `true` when shutdown starts.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Stop issuing advances and wait for every task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for (train_id, task) in self.tasks {
            if let Err(e) = task.await {
                error!(train_id = %train_id, error = %e, "Train task panicked");
            }
        }
        info!("Scheduler stopped");
    }
}

/// Start one timer task per train.
pub fn start<S>(
    engine: Arc<MovementEngine<S>>,
    broadcaster: Broadcaster,
    trains: impl IntoIterator<Item = TrainId>,
    ticks: TickRange,
) -> SchedulerHandle
where
    S: TopologyStore + 'static,
{
    let (shutdown, _) = watch::channel(false);
    let tasks: Vec<(TrainId, JoinHandle<()>)> = trains
        .into_iter()
        .map(|train_id| {
            let task = tokio::spawn(run_train(
                Arc::clone(&engine),
                broadcaster.clone(),
                train_id,
                ticks,
                shutdown.subscribe(),
            ));
            (train_id, task)
        })
        .collect();

    info!(trains = tasks.len(), ?ticks, "Scheduler started");
    SchedulerHandle { shutdown, tasks }
}

async fn run_train<S: TopologyStore>(
    engine: Arc<MovementEngine<S>>,
    broadcaster: Broadcaster,
    train_id: TrainId,
    ticks: TickRange,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let pause = ticks.draw(&mut rand::thread_rng());
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = tokio::time::sleep(pause) => {}
        }

        match engine.advance(train_id).await {
            Ok(result) => {
                let delivered = broadcaster.publish(&result);
                debug!(
                    train_id = %train_id,
                    station = %result.station_name,
                    delivered,
                    "Tick"
                );
            }
            Err(e) if e.is_transient() => {
                warn!(train_id = %train_id, error = %e, "Advance failed, retrying next tick");
            }
            Err(e) => {
                error!(train_id = %train_id, kind = ?e.kind(), error = %e, "Train stopped");
                break;
            }
        }
    }
    debug!(train_id = %train_id, "Train task exiting");
}
