//! Periodic location sampler for an active sharing session.

use std::sync::Arc;
use std::time::Duration;

use domain::errors::LocationError;
use domain::models::Position;
use domain::services::LocationSource;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::middleware::metrics::record_sample_failed;

/// A fix taken by the sampler, tagged with the session generation that spawned it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub generation: u64,
    pub position: Position,
}

/// Background task that fetches a fix every `interval` and forwards it.
pub struct LocationSampler {
    source: Arc<dyn LocationSource>,
    interval: Duration,
    generation: u64,
}

/// Handle to a running sampler.
pub struct SamplerHandle {
    generation: u64,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl LocationSampler {
    pub fn new(source: Arc<dyn LocationSource>, interval: Duration, generation: u64) -> Self {
        Self {
            source,
            interval,
            generation,
        }
    }

    /// Start sampling. The first fix is taken one interval after spawn.
    pub fn spawn(self, samples: mpsc::Sender<Sample>) -> SamplerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let generation = self.generation;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Skip the first immediate tick
            interval.tick().await;

            info!(
                generation,
                interval_ms = self.interval.as_millis() as u64,
                "Location sampler started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let position = match self.source.fetch_current_position().await {
                            Ok(position) => position,
                            Err(e) => {
                                warn!(generation, error = %e, "Location sample failed");
                                record_sample_failed(failure_reason(&e));
                                continue;
                            }
                        };

                        debug!(
                            generation,
                            latitude = position.latitude,
                            longitude = position.longitude,
                            "Location sampled"
                        );

                        tokio::select! {
                            sent = samples.send(Sample { generation, position }) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                            _ = shutdown_rx.changed() => break,
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!(generation, "Location sampler stopped");
        });

        SamplerHandle {
            generation,
            shutdown_tx,
            handle,
        }
    }
}

impl SamplerHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Signal the sampler to stop and wait up to `grace` for it to exit.
    ///
    /// A sampler still running after `grace` is aborted.
    pub async fn shutdown(self, grace: Duration) {
        let _ = self.shutdown_tx.send(true);
        let mut handle = self.handle;

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(generation = self.generation, "Sampler task panicked: {}", e),
            Err(_) => {
                warn!(
                    generation = self.generation,
                    grace_ms = grace.as_millis() as u64,
                    "Sampler did not stop in time, aborting"
                );
                handle.abort();
            }
        }
    }
}

fn failure_reason(err: &LocationError) -> &'static str {
    match err {
        LocationError::PermissionDenied => "permission_denied",
        LocationError::Unavailable(_) => "unavailable",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::ScriptedLocationSource;

    #[tokio::test]
    async fn test_sampler_forwards_fixes_with_generation() {
        let source = Arc::new(ScriptedLocationSource::new([
            Position::new(1.0, 1.0),
            Position::new(2.0, 2.0),
        ]));
        let (tx, mut rx) = mpsc::channel(8);

        let handle = LocationSampler::new(source, Duration::from_millis(10), 7).spawn(tx);

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.generation, 7);
        assert_eq!(first.position, Position::new(1.0, 1.0));
        assert_eq!(second.position, Position::new(2.0, 2.0));
        assert_eq!(handle.generation(), 7);

        handle.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_sampler_skips_failed_fixes() {
        // An empty script reports no fix until something is pushed.
        let source = Arc::new(ScriptedLocationSource::default());
        let (tx, mut rx) = mpsc::channel(8);

        let handle = LocationSampler::new(source.clone(), Duration::from_millis(10), 1).spawn(tx);

        tokio::time::timeout(Duration::from_secs(2), async {
            while source.calls() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(rx.try_recv().is_err());

        source.push([Position::new(3.0, 4.0)]);
        let sample = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sample.position, Position::new(3.0, 4.0));

        handle.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_sampling() {
        let source = Arc::new(ScriptedLocationSource::fixed(Position::new(1.0, 1.0)));
        let (tx, mut rx) = mpsc::channel(64);

        let handle = LocationSampler::new(source, Duration::from_millis(10), 1).spawn(tx);
        handle.shutdown(Duration::from_secs(1)).await;

        // Drain whatever arrived before shutdown; the channel then closes.
        let drained = tokio::time::timeout(Duration::from_secs(2), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok());
    }

    #[tokio::test]
    async fn test_no_fix_before_first_interval() {
        let source = Arc::new(ScriptedLocationSource::fixed(Position::new(1.0, 1.0)));
        let (tx, _rx) = mpsc::channel(8);

        let handle = LocationSampler::new(source.clone(), Duration::from_secs(60), 1).spawn(tx);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(source.calls(), 0);
        handle.shutdown(Duration::from_secs(1)).await;
    }
}
