use crate::data::engine::SampleEngine;
use crate::data::snapshot::Snapshot;
use crate::data::source::MetricSource;
use log::debug;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

pub mod collector;
pub mod engine;
pub mod snapshot;
pub mod source;
pub mod temperature;

/// Drives a [`SampleEngine`] on a fixed cadence and hands every snapshot to
/// whoever renders it.
pub struct DataManager<S> {
    engine: SampleEngine<S>,
    update_interval: Duration,
}

impl<S: MetricSource> DataManager<S> {
    pub fn new(engine: SampleEngine<S>, update_interval_ms: u64) -> Self {
        Self {
            engine,
            update_interval: Duration::from_millis(update_interval_ms),
        }
    }

    /// Sysinfo refreshes, address resolution and battery helpers all block,
    /// so on a multi-threaded runtime the worker hands its other tasks off
    /// for the duration of the tick.
    fn tick(&mut self) -> Snapshot {
        match Handle::current().runtime_flavor() {
            RuntimeFlavor::MultiThread => tokio::task::block_in_place(|| self.engine.tick()),
            _ => self.engine.tick(),
        }
    }

    /// Ticks until the receiver goes away or `max_ticks` snapshots were sent.
    pub async fn start_polling(
        &mut self,
        sender: mpsc::UnboundedSender<Snapshot>,
        max_ticks: Option<u64>,
    ) {
        let mut interval = interval(self.update_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; skip it so the
        // first sample covers a full interval after the engine's baseline.
        interval.tick().await;

        let mut sent = 0u64;
        loop {
            interval.tick().await;
            let snapshot = self.tick();

            if sender.send(snapshot).is_err() {
                debug!("snapshot receiver dropped, stopping sampler");
                break;
            }

            sent += 1;
            if max_ticks.is_some_and(|max| sent >= max) {
                break;
            }

            // Yield control back to the executor to allow other tasks to run
            tokio::task::yield_now().await;
        }
    }
}
