//! Stock `Reporter` implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use drive_traits::{BoxError, ControlSample, Reporter};

/// Discards every sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _sample: &ControlSample) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Emits each sample as an `info` event on the `drive::report` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, s: &ControlSample) -> Result<(), BoxError> {
        tracing::info!(
            target: "drive::report",
            time_ms = s.time_ms,
            v_meas_l = s.speed_left,
            v_meas_r = s.speed_right,
            voltage_l = s.output_left,
            voltage_r = s.output_right,
            "{s}"
        );
        Ok(())
    }
}

/// Forwards samples to another thread over a bounded channel.
///
/// A full channel drops the sample (counted) instead of blocking the loop;
/// a disconnected receiver is an error.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: Sender<ControlSample>,
    dropped: Arc<AtomicU64>,
}

impl ChannelReporter {
    /// Reporter plus the receiving end, with room for `capacity` samples.
    pub fn bounded(capacity: usize) -> (Self, Receiver<ControlSample>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Samples dropped because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared handle to the drop counter, readable after the reporter is moved.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

impl Reporter for ChannelReporter {
    fn report(&mut self, sample: &ControlSample) -> Result<(), BoxError> {
        match self.tx.try_send(*sample) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(dropped = n, "report channel full; sample dropped");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err("report channel disconnected".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: i64) -> ControlSample {
        ControlSample {
            time_ms: t,
            speed_left: 1,
            speed_right: 2,
            output_left: 3,
            output_right: 4,
        }
    }

    #[test]
    fn channel_reporter_forwards() {
        let (mut r, rx) = ChannelReporter::bounded(4);
        r.report(&sample(20)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), sample(20));
    }

    #[test]
    fn full_channel_drops_without_error() {
        let (mut r, rx) = ChannelReporter::bounded(1);
        r.report(&sample(20)).unwrap();
        r.report(&sample(280)).unwrap();
        assert_eq!(r.dropped(), 1);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn disconnected_channel_is_an_error() {
        let (mut r, rx) = ChannelReporter::bounded(1);
        drop(rx);
        assert!(r.report(&sample(20)).is_err());
    }
}
