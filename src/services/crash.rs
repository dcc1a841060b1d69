// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Crash detection from accelerometer samples and the SOS countdown.

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;

/// Impact threshold suggesting a hard hit or stop.
pub const DEFAULT_THRESHOLD_G: f64 = 3.5;
/// Time the rider has to cancel before SOS goes out.
pub const DEFAULT_SOS_COUNTDOWN: Duration = Duration::from_secs(10);

/// One accelerometer reading in g.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelerometerSample {
    /// Magnitude of the acceleration vector.
    pub fn g_force(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A sample that crossed the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashEvent {
    pub g_force: f64,
}

/// How a countdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SosOutcome {
    Sent,
    Cancelled,
}

/// Flags the first sample above the threshold, then stays quiet until rearmed.
#[derive(Debug, Clone)]
pub struct CrashDetector {
    threshold_g: f64,
    countdown: Duration,
    triggered: bool,
}

impl Default for CrashDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_G, DEFAULT_SOS_COUNTDOWN)
    }
}

impl CrashDetector {
    pub fn new(threshold_g: f64, countdown: Duration) -> Self {
        Self {
            threshold_g,
            countdown,
            triggered: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.crash_threshold_g, config.sos_countdown)
    }

    pub fn countdown(&self) -> Duration {
        self.countdown
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Feed one sample. Returns an event only on the first crossing.
    pub fn observe(&mut self, sample: AccelerometerSample) -> Option<CrashEvent> {
        let g_force = sample.g_force();
        if self.triggered || g_force <= self.threshold_g {
            return None;
        }
        self.triggered = true;
        tracing::warn!(g_force, threshold = self.threshold_g, "Crash detected");
        Some(CrashEvent { g_force })
    }

    /// Resume watching after the rider dismissed the alert.
    pub fn rearm(&mut self) {
        self.triggered = false;
    }
}

/// Wait out the countdown unless `cancel` fires first.
///
/// Dropping the sender without sending does not cancel.
pub async fn sos_countdown(countdown: Duration, cancel: oneshot::Receiver<()>) -> SosOutcome {
    let cancelled = async {
        if cancel.await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = tokio::time::sleep(countdown) => {
            tracing::warn!("SOS countdown elapsed, sending SOS");
            SosOutcome::Sent
        }
        _ = cancelled => {
            tracing::info!("SOS cancelled by rider");
            SosOutcome::Cancelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, y: f64, z: f64) -> AccelerometerSample {
        AccelerometerSample { x, y, z }
    }

    #[test]
    fn test_resting_device_is_one_g() {
        assert_eq!(sample(0.0, 0.0, 1.0).g_force(), 1.0);
        assert_eq!(sample(3.0, 4.0, 0.0).g_force(), 5.0);
    }

    #[test]
    fn test_triggers_once_until_rearmed() {
        let mut detector = CrashDetector::default();

        assert_eq!(detector.observe(sample(0.0, 0.0, 1.0)), None);
        assert_eq!(detector.observe(sample(0.0, 0.0, 3.5)), None);

        let event = detector.observe(sample(3.0, 4.0, 0.0)).unwrap();
        assert_eq!(event.g_force, 5.0);
        assert!(detector.is_triggered());

        assert_eq!(detector.observe(sample(3.0, 4.0, 0.0)), None);

        detector.rearm();
        assert!(detector.observe(sample(0.0, 0.0, 6.0)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_sends_when_not_cancelled() {
        let (_tx, rx) = oneshot::channel();
        let outcome = sos_countdown(DEFAULT_SOS_COUNTDOWN, rx).await;
        assert_eq!(outcome, SosOutcome::Sent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_cancelled() {
        let (tx, rx) = oneshot::channel();
        let countdown = tokio::spawn(sos_countdown(DEFAULT_SOS_COUNTDOWN, rx));

        tokio::time::sleep(Duration::from_secs(3)).await;
        tx.send(()).unwrap();

        assert_eq!(countdown.await.unwrap(), SosOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_does_not_cancel() {
        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);
        assert_eq!(sos_countdown(DEFAULT_SOS_COUNTDOWN, rx).await, SosOutcome::Sent);
    }
}
