use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::HeartbeatConfig;
use crate::message;
use crate::notify::AlertSink;

/// Tracks which daily heartbeat slots have fired.
#[derive(Debug, Clone)]
pub struct HeartbeatSlots {
    hours: Vec<u32>,
    last_sent: HashMap<u32, NaiveDate>,
}

impl HeartbeatSlots {
    pub fn new(hours: &[u32]) -> Self {
        let mut hours: Vec<u32> = hours.iter().copied().filter(|h| *h < 24).collect();
        hours.sort_unstable();
        hours.dedup();
        Self {
            hours,
            last_sent: HashMap::new(),
        }
    }

    /// The slot due at `now`, if it has not fired yet today. Marks it sent.
    pub fn poll(&mut self, now: NaiveDateTime) -> Option<u32> {
        let hour = now.hour();
        if !self.hours.contains(&hour) {
            return None;
        }
        let today = now.date();
        if self.last_sent.get(&hour) == Some(&today) {
            return None;
        }
        self.last_sent.insert(hour, today);
        Some(hour)
    }
}

/// Periodic "still alive" push at the configured local hours.
pub struct Heartbeat<S> {
    sink: Arc<S>,
    slots: HeartbeatSlots,
    interval: Duration,
}

impl<S: AlertSink> Heartbeat<S> {
    pub fn new(config: &HeartbeatConfig, sink: Arc<S>) -> Self {
        Self {
            sink,
            slots: HeartbeatSlots::new(&config.hours),
            interval: Duration::from_secs(config.check_interval_secs),
        }
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(hours = ?self.slots.hours, "Heartbeat started");

        loop {
            let now = Local::now();
            if let Some(hour) = self.slots.poll(now.naive_local()) {
                if self.sink.heartbeat(&message::heartbeat(hour, &now)).await {
                    tracing::info!(hour, "Heartbeat sent");
                } else if self.sink.is_enabled() {
                    tracing::warn!(hour, "Heartbeat was not delivered");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown received, stopping heartbeat");
                    break;
                }
            }
        }
    }
}
