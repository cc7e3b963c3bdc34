//! Fan-out of tick records and alert pulses to downstream consumers
//!
//! All sends are non-blocking. A full or closed channel drops the message
//! and logs it; the tick loop never waits on a consumer.

use crate::config::SinkConfig;
use crate::pipeline::TickRecord;
use alerting::AlertPulse;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Delivery counters for one sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// Channels feeding presentation, audio and cloud consumers
#[derive(Debug)]
pub struct SinkHub {
    records: broadcast::Sender<TickRecord>,
    pulse_tx: mpsc::Sender<AlertPulse>,
    pulse_rx: Option<mpsc::Receiver<AlertPulse>>,
    snapshot_tx: mpsc::Sender<TickRecord>,
    snapshot_rx: Option<mpsc::Receiver<TickRecord>>,
    snapshot_interval: f64,
    last_snapshot: Option<f64>,
    pulse_stats: SinkStats,
    snapshot_stats: SinkStats,
}

impl SinkHub {
    pub fn new(config: &SinkConfig) -> Self {
        let (records, _) = broadcast::channel(config.record_capacity.max(1));
        let (pulse_tx, pulse_rx) = mpsc::channel(config.pulse_capacity.max(1));
        let (snapshot_tx, snapshot_rx) = mpsc::channel(config.snapshot_capacity.max(1));
        Self {
            records,
            pulse_tx,
            pulse_rx: Some(pulse_rx),
            snapshot_tx,
            snapshot_rx: Some(snapshot_rx),
            snapshot_interval: config.snapshot_interval_seconds,
            last_snapshot: None,
            pulse_stats: SinkStats::default(),
            snapshot_stats: SinkStats::default(),
        }
    }

    /// Every tick record; slow subscribers lose the oldest records
    pub fn subscribe_records(&self) -> broadcast::Receiver<TickRecord> {
        self.records.subscribe()
    }

    /// Alert pulses for the audio consumer (once)
    pub fn take_pulse_receiver(&mut self) -> Option<mpsc::Receiver<AlertPulse>> {
        self.pulse_rx.take()
    }

    /// Throttled records for the cloud consumer (once)
    pub fn take_snapshot_receiver(&mut self) -> Option<mpsc::Receiver<TickRecord>> {
        self.snapshot_rx.take()
    }

    pub fn pulse_stats(&self) -> SinkStats {
        self.pulse_stats
    }

    pub fn snapshot_stats(&self) -> SinkStats {
        self.snapshot_stats
    }

    /// Publish one tick
    ///
    /// Pulses and snapshots are only sent once their receiver has been taken.
    pub fn publish(&mut self, record: &TickRecord, state_changed: bool) {
        if self.records.receiver_count() > 0 && self.records.send(record.clone()).is_err() {
            debug!(sequence = record.sequence, "No record subscribers");
        }

        if let (Some(pulse), None) = (record.pulse, &self.pulse_rx) {
            match self.pulse_tx.try_send(pulse) {
                Ok(()) => self.pulse_stats.delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.pulse_stats.dropped += 1;
                    warn!(sequence = pulse.sequence, "Pulse sink full, dropping pulse");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.pulse_stats.dropped += 1;
                    debug!(sequence = pulse.sequence, "Pulse sink closed");
                }
            }
        }

        let ts = record.snapshot.timestamp;
        let due = record.transition.is_some()
            || state_changed
            || self
                .last_snapshot
                .map_or(true, |last| ts - last >= self.snapshot_interval);
        if !due || self.snapshot_rx.is_some() {
            return;
        }
        self.last_snapshot = Some(ts);
        match self.snapshot_tx.try_send(record.clone()) {
            Ok(()) => self.snapshot_stats.delivered += 1,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.snapshot_stats.dropped += 1;
                warn!(sequence = record.sequence, "Snapshot sink full, dropping snapshot");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.snapshot_stats.dropped += 1;
                debug!(sequence = record.sequence, "Snapshot sink closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::record_at;
    use alerting::{AlertLevel, AlertTransition, TriggerReason};

    fn hub(capacity: usize) -> SinkHub {
        SinkHub::new(&SinkConfig {
            record_capacity: capacity,
            pulse_capacity: capacity,
            snapshot_capacity: capacity,
            snapshot_interval_seconds: 5.0,
        })
    }

    #[tokio::test]
    async fn test_records_broadcast_to_all_subscribers() {
        let mut hub = hub(8);
        let mut a = hub.subscribe_records();
        let mut b = hub.subscribe_records();
        hub.publish(&record_at(1, 0.0), false);

        assert_eq!(a.recv().await.unwrap().sequence, 1);
        assert_eq!(b.recv().await.unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn test_snapshots_throttled() {
        let mut hub = hub(64);
        let mut rx = hub.take_snapshot_receiver().unwrap();

        // 30 Hz for 12 s
        for i in 0..360u64 {
            hub.publish(&record_at(i, i as f64 / 30.0), false);
        }
        drop(hub);

        let mut times = Vec::new();
        while let Some(record) = rx.recv().await {
            times.push(record.snapshot.timestamp);
        }
        assert_eq!(times.len(), 3);
        assert_eq!(times[0], 0.0);
        assert!(times.windows(2).all(|w| w[1] - w[0] >= 5.0));
    }

    #[tokio::test]
    async fn test_transition_bypasses_throttle() {
        let mut hub = hub(8);
        let mut rx = hub.take_snapshot_receiver().unwrap();
        hub.publish(&record_at(0, 0.0), false);

        let mut record = record_at(1, 0.1);
        record.transition = Some(AlertTransition {
            from: AlertLevel::None,
            to: AlertLevel::Level1,
            reason: TriggerReason::DrowsinessSymptoms,
            score: 60.0,
            perclos: 25.0,
            timestamp: 0.1,
        });
        hub.publish(&record, false);
        hub.publish(&record_at(2, 0.2), true);
        hub.publish(&record_at(3, 0.3), false);

        let mut seen = Vec::new();
        while let Ok(record) = rx.try_recv() {
            seen.push(record.sequence);
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_full_pulse_sink_drops() {
        let mut hub = hub(2);
        let mut rx = hub.take_pulse_receiver().unwrap();
        for i in 0..5u64 {
            let mut record = record_at(i, i as f64);
            record.pulse = Some(AlertPulse {
                level: AlertLevel::Level1,
                timestamp: i as f64,
                sequence: i + 1,
            });
            hub.publish(&record, false);
        }
        assert_eq!(hub.pulse_stats(), SinkStats { delivered: 2, dropped: 3 });
        assert_eq!(rx.recv().await.unwrap().sequence, 1);
        assert!(hub.take_pulse_receiver().is_none());
    }

    #[test]
    fn test_untaken_receivers_not_filled() {
        let mut hub = hub(1);
        for i in 0..10u64 {
            hub.publish(&record_at(i, i as f64 * 10.0), true);
        }
        assert_eq!(hub.snapshot_stats(), SinkStats::default());
    }
}
