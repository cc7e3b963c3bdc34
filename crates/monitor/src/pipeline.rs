//! Per-tick drowsiness monitoring pipeline

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::sink::SinkHub;
use crate::telemetry;
use alerting::{AlertEngine, AlertInput, AlertOutput, AlertPulse, AlertState, AlertTransition};
use chrono::{DateTime, Utc};
use dms::{DecidedBy, DmsAnalysis, DmsModule, DriverState, FaceFrame, FrameObservation, FrameStatus, MetricsSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Immutable result of one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickRecord {
    pub session_id: Uuid,
    /// Increments by one per tick within a session
    pub sequence: u64,
    /// Wall-clock time the record was produced
    pub recorded_at: DateTime<Utc>,
    pub snapshot: MetricsSnapshot,
    /// Drowsiness score (0-100)
    pub score: f64,
    pub state: DriverState,
    pub decided_by: DecidedBy,
    pub alert: AlertState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<AlertTransition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<AlertPulse>,
}

/// Cloneable handle for requesting a manual alert reset from another thread
///
/// The request is applied at the start of the next tick.
#[derive(Debug, Clone, Default)]
pub struct ResetHandle {
    requested: Arc<AtomicBool>,
}

impl ResetHandle {
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }
}

/// Drives frames through the DMS trackers and the alert engine
#[derive(Debug)]
pub struct DrowsinessMonitor {
    session_id: Uuid,
    sequence: u64,
    dms: DmsModule,
    alerts: AlertEngine,
    reset: ResetHandle,
    sinks: SinkHub,
    last_state: Option<DriverState>,
    /// Reset transition made outside a tick, published with the next record
    pending_transition: Option<AlertTransition>,
}

impl DrowsinessMonitor {
    /// Build a monitor, refusing an invalid configuration
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        let session_id = Uuid::new_v4();
        let monitor = Self {
            session_id,
            sequence: 0,
            sinks: SinkHub::new(&config.sink),
            alerts: AlertEngine::new(config.alert)?,
            dms: DmsModule::new(config.dms)?,
            reset: ResetHandle::default(),
            last_state: None,
            pending_transition: None,
        };
        info!(%session_id, "Drowsiness monitor started");
        Ok(monitor)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn reset_handle(&self) -> ResetHandle {
        self.reset.clone()
    }

    pub fn sinks(&mut self) -> &mut SinkHub {
        &mut self.sinks
    }

    pub fn alert_state(&self) -> AlertState {
        self.alerts.state()
    }

    pub fn dms(&self) -> &DmsModule {
        &self.dms
    }

    /// Process one landmark frame
    pub fn tick(&mut self, frame: &FaceFrame) -> TickRecord {
        self.apply_reset_request();
        let analysis = self.dms.process(frame);
        self.finish(analysis)
    }

    /// Process one pre-extracted observation
    pub fn tick_observation(&mut self, observation: FrameObservation) -> TickRecord {
        self.apply_reset_request();
        let analysis = self.dms.process_observation(observation);
        self.finish(analysis)
    }

    /// Clear the alert immediately, outside the tick loop
    ///
    /// The transition is also carried by the next tick record so sinks see it.
    pub fn manual_reset(&mut self, timestamp: f64) -> Option<AlertTransition> {
        let transition = self.alerts.manual_reset(timestamp);
        if transition.is_some() {
            self.pending_transition = transition;
        }
        transition
    }

    /// Forget all driver history and start a new session (driver change)
    ///
    /// A cleared alert is reported on the first record of the new session.
    pub fn new_session(&mut self, timestamp: f64) {
        self.dms.reset_state();
        self.manual_reset(timestamp);
        self.session_id = Uuid::new_v4();
        self.sequence = 0;
        self.last_state = None;
        info!(session_id = %self.session_id, "New monitoring session");
    }

    fn apply_reset_request(&mut self) {
        if self.reset.take() {
            debug!("Manual reset requested");
            self.alerts.request_reset();
        }
    }

    fn finish(&mut self, analysis: DmsAnalysis) -> TickRecord {
        // Skipped frames carry a stale timestamp the engine would reject
        let alert = if analysis.snapshot.frame_status == FrameStatus::OutOfOrder {
            AlertOutput {
                level: self.alerts.level(),
                transition: None,
                pulse: None,
                activated: false,
            }
        } else {
            self.alerts.update(AlertInput::from(&analysis))
        };

        self.sequence += 1;
        let state_changed = self.last_state.is_some_and(|last| last != analysis.state);
        self.last_state = Some(analysis.state);

        let record = TickRecord {
            session_id: self.session_id,
            sequence: self.sequence,
            recorded_at: Utc::now(),
            score: analysis.score,
            state: analysis.state,
            decided_by: analysis.decided_by,
            snapshot: analysis.snapshot,
            alert: self.alerts.state(),
            transition: alert.transition.or_else(|| self.pending_transition.take()),
            pulse: alert.pulse,
        };

        self.sinks.publish(&record, state_changed);
        telemetry::record_tick(&record);
        record
    }
}
