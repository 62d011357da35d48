//! Background maintenance tasks and their shutdown signal.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

/// Fan-out stop signal for the pipeline's sweeper tasks.
///
/// One broadcast channel; every spawned sweeper holds a receiver and
/// exits its loop when `trigger` fires. `receiver_count` reports how
/// many tasks are still running.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Stop every subscribed sweeper.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of sweepers still subscribed.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a named task that runs `tick` every `interval` until the
/// shutdown signal fires.
///
/// The first run happens one interval after spawning, not immediately:
/// the pipeline is freshly built and has nothing to sweep yet.
pub fn spawn_sweeper<F>(
    name: &'static str,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut tick: F,
) where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        // interval's first tick completes immediately; swallow it.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => tick(),
                _ = shutdown.recv() => {
                    tracing::debug!(task = name, "sweeper stopped");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn sweeper_ticks_until_shutdown() {
        let shutdown = Shutdown::new();
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        spawn_sweeper(
            "test-sweep",
            Duration::from_millis(10),
            shutdown.subscribe(),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        time::sleep(Duration::from_millis(55)).await;
        let before = ticks.load(Ordering::SeqCst);
        assert!(before >= 3, "expected several ticks, got {before}");

        shutdown.trigger();
        time::sleep(Duration::from_millis(50)).await;
        let after = ticks.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after);
        assert_eq!(shutdown.receiver_count(), 0);
    }
}
