//! Periodic sensor polling.

use std::time::Duration;

use tracing::{debug, info};

use crate::bridge::{BridgeClient, BridgeError, Sensor};
use crate::collector::SharedCollector;
use crate::translate::translate;

/// Fixed delay between poll cycles.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Polls the bridge on a fixed cadence and feeds the collector.
pub struct SensorPoller<C> {
    client: C,
    collector: SharedCollector,
}

impl<C: BridgeClient> SensorPoller<C> {
    pub fn new(client: C, collector: SharedCollector) -> Self {
        Self { client, collector }
    }

    /// Run the polling loop.
    ///
    /// The first fetch happens immediately; every later cycle waits
    /// [`POLL_INTERVAL`] first. Never returns on success. A fetch error
    /// ends the loop: polling failures are fatal to the service, the
    /// caller is expected to terminate the process.
    pub async fn run(self) -> Result<(), BridgeError> {
        info!(interval_secs = POLL_INTERVAL.as_secs(), "starting sensor poller");

        let mut first_run = true;
        loop {
            if !first_run {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            first_run = false;

            let sensors = self.client.get_sensors().await?;
            let recorded = self.record_all(&sensors);

            debug!(
                sensors = sensors.len(),
                observations = recorded,
                "poll cycle complete"
            );
        }
    }

    /// Translate and record one batch of sensors. Returns the number of
    /// observations written.
    fn record_all(&self, sensors: &[Sensor]) -> usize {
        let mut recorded = 0;

        for sensor in sensors {
            for observation in translate(sensor) {
                self.collector.record(&observation);
                recorded += 1;
            }
        }

        recorded
    }
}
