//! Periodic latency poll feeding the controller's latency label.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{latency_text, PlaybackFacade};
use crate::telemetry;

/// Background task reading the output latency once per period.
///
/// The first reading is delivered immediately. Each reading is formatted
/// with [`latency_text`] and sent to the single consumer. Dropping the
/// updater cancels the task.
pub struct LatencyUpdater {
    task: JoinHandle<()>,
}

impl LatencyUpdater {
    /// Spawn the poll on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn spawn(
        facade: Arc<dyn PlaybackFacade>,
        period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let period = period.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let latency_ms = facade.get_current_output_latency_millis();
                telemetry::hub().record_latency(latency_ms);

                if tx.send(latency_text(latency_ms)).is_err() {
                    log::debug!("[LatencyUpdater] Consumer gone, stopping");
                    break;
                }
            }
        });

        (Self { task }, rx)
    }

    /// Stop polling. Readings already sent stay in the channel.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for LatencyUpdater {
    fn drop(&mut self) {
        self.task.abort();
    }
}
