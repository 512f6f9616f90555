//! The movement engine: owns every train's state and advances trains one
//! stop at a time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::MovementError;
use super::state::TrainState;
use super::topology::Topology;
use super::travel::apply_jitter;
use crate::config::SimulationConfig;
use crate::domain::{Coordinates, Direction, LineId, StationId, TrainId};
use crate::lines::LineError;
use crate::store::{StoreError, TopologyStore};

/// What one advance produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementResult {
    pub train_id: TrainId,
    pub station_id: StationId,
    pub station_name: String,
    pub coordinates: Coordinates,
    pub line_id: LineId,
    pub direction: Direction,

    /// Scheduled time for the hop just made, after jitter.
    pub travel_time: Duration,

    pub timestamp: DateTime<Utc>,
}

type TrainSlot = Arc<Mutex<TrainState>>;

/// Advances trains along their line sequences.
///
/// Each train's state sits behind its own lock, so different trains
/// advance in parallel while one train's advances are serialized. The
/// engine has no timer of its own; see [`crate::scheduler`].
pub struct MovementEngine<S> {
    store: S,
    topology: Arc<Topology>,
    config: SimulationConfig,
    trains: RwLock<HashMap<TrainId, TrainSlot>>,
}

impl<S: TopologyStore> MovementEngine<S> {
    pub fn new(store: S, topology: Arc<Topology>, config: SimulationConfig) -> Self {
        Self {
            store,
            topology,
            config,
            trains: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Seed (or reseed) a train's state from its current station.
    ///
    /// The station must be on `line_id`. An existing state for the train is
    /// replaced, including its reversal count.
    pub fn initialize(
        &self,
        train_id: TrainId,
        current_station_id: StationId,
        line_id: &LineId,
        direction: Option<Direction>,
    ) -> Result<TrainState, MovementError> {
        let state = self.seed_state(train_id, current_station_id, line_id, direction)?;
        self.trains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(train_id, Arc::new(Mutex::new(state.clone())));
        Ok(state)
    }

    /// Resolve a train's starting position without installing it.
    fn seed_state(
        &self,
        train_id: TrainId,
        current_station_id: StationId,
        line_id: &LineId,
        direction: Option<Direction>,
    ) -> Result<TrainState, MovementError> {
        let station = self
            .topology
            .station(current_station_id)
            .ok_or(MovementError::UnknownStation(current_station_id))?;
        let index = self.topology.lines().index_on(line_id, &station.name)?;

        let state = TrainState::new(
            train_id,
            line_id.clone(),
            index,
            direction.unwrap_or_default(),
            Utc::now(),
        );

        debug!(
            train_id = %train_id,
            line = %line_id,
            station = %station.name,
            index,
            direction = %state.direction,
            "Train initialized"
        );
        Ok(state)
    }

    /// Initialize every train the store knows about.
    ///
    /// Trains whose rows don't match the topology are logged and skipped.
    /// Returns the ids that were initialized.
    pub async fn initialize_all(&self) -> Result<Vec<TrainId>, MovementError> {
        let records = self.bounded(self.store.list_trains()).await?;
        let mut ready = Vec::with_capacity(records.len());

        for record in records {
            match self.initialize(
                record.train_id,
                record.current_station_id,
                &record.line,
                Some(record.direction),
            ) {
                Ok(_) => ready.push(record.train_id),
                Err(e) => warn!(
                    train_id = %record.train_id,
                    line = %record.line,
                    error = %e,
                    "Skipping train that does not fit the topology"
                ),
            }
        }

        info!(trains = ready.len(), "Fleet initialized");
        Ok(ready)
    }

    /// Move a train one stop.
    ///
    /// Unknown trains are initialized from their stored row first. A failed
    /// write-back is logged and does not undo the step.
    pub async fn advance(&self, train_id: TrainId) -> Result<MovementResult, MovementError> {
        let slot = match self.slot(train_id) {
            Some(slot) => slot,
            None => self.lazy_initialize(train_id).await?,
        };
        let mut state = slot.lock().await;

        let sequence = self.topology.lines().sequence_for(&state.line_id)?;
        let step = state.next_step(sequence.len());
        let not_on_line = |index: usize| LineError::StationNotOnLine {
            station: sequence.get(index).unwrap_or("<out of range>").to_string(),
            line: state.line_id.clone(),
        };

        let from_name = sequence
            .get(step.from_index)
            .ok_or_else(|| not_on_line(step.from_index))?;
        let to_name = sequence
            .get(step.to_index)
            .ok_or_else(|| not_on_line(step.to_index))?;
        let station = self
            .topology
            .station_named(to_name)
            .ok_or_else(|| not_on_line(step.to_index))?;

        let scheduled = self
            .topology
            .travel_times()
            .scheduled(from_name, to_name)
            .unwrap_or_else(|| self.config.fallback_travel());

        // ThreadRng is not Send; keep it out of any await
        let (travel_time, load_delta) = {
            let mut rng = rand::thread_rng();
            let travel = apply_jitter(scheduled, self.config.jitter_fraction, &mut rng);
            let delta = if self.config.load_delta_min < self.config.load_delta_max {
                rng.gen_range(self.config.load_delta_min..=self.config.load_delta_max)
            } else {
                self.config.load_delta_min
            };
            (travel, delta)
        };

        let now = Utc::now();
        state.apply(&step, now);

        if step.reversed {
            info!(
                train_id = %train_id,
                station = %to_name,
                direction = %step.direction,
                "Train reversed at terminus"
            );
            if let Err(e) = self
                .bounded(self.store.persist_train_direction(train_id, step.direction))
                .await
            {
                warn!(train_id = %train_id, error = %e, "Failed to persist direction");
            }
        }

        let coordinates = station.coordinates();
        if let Err(e) = self
            .bounded(self.store.persist_train_position(
                train_id,
                station.id,
                coordinates,
                load_delta,
            ))
            .await
        {
            warn!(train_id = %train_id, error = %e, "Failed to persist position");
        }

        debug!(
            train_id = %train_id,
            from = %from_name,
            to = %to_name,
            travel_secs = travel_time.as_secs_f64(),
            "Train advanced"
        );

        Ok(MovementResult {
            train_id,
            station_id: station.id,
            station_name: station.name.clone(),
            coordinates,
            line_id: state.line_id.clone(),
            direction: state.direction,
            travel_time,
            timestamp: now,
        })
    }

    /// Snapshot of a train's state, if it has been initialized.
    pub async fn state(&self, train_id: TrainId) -> Option<TrainState> {
        let slot = self.slot(train_id)?;
        let state = slot.lock().await;
        Some(state.clone())
    }

    /// Ids of all initialized trains, ascending.
    pub fn train_ids(&self) -> Vec<TrainId> {
        let mut ids: Vec<TrainId> = self
            .trains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Forget a train and delete its stored row.
    ///
    /// Returns whether the store had the train.
    pub async fn retire(&self, train_id: TrainId) -> Result<bool, MovementError> {
        self.trains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&train_id);
        let existed = self.bounded(self.store.retire_train(train_id)).await?;
        info!(train_id = %train_id, existed, "Train retired");
        Ok(existed)
    }

    fn slot(&self, train_id: TrainId) -> Option<TrainSlot> {
        self.trains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&train_id)
            .cloned()
    }

    /// Seed a train from its stored row unless another caller got there
    /// first, in which case that caller's slot is returned.
    async fn lazy_initialize(&self, train_id: TrainId) -> Result<TrainSlot, MovementError> {
        let record = self
            .bounded(self.store.get_train(train_id))
            .await?
            .ok_or(MovementError::TrainNotFound(train_id))?;

        let state = self.seed_state(
            train_id,
            record.current_station_id,
            &record.line,
            Some(record.direction),
        )?;
        let slot = self
            .trains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(train_id)
            .or_insert_with(|| Arc::new(Mutex::new(state)))
            .clone();
        Ok(slot)
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let limit = self.config.store_timeout();
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| StoreError::TimedOut(limit))?
    }
}
