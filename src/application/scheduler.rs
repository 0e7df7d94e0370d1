use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

struct PeriodicTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Owns the periodic background jobs and their shutdown signal.
///
/// Every job fires once immediately and then once per period. Ticks missed
/// while a run is still in flight are dropped, so runs of the same job never
/// overlap.
pub struct Scheduler {
    tasks: Vec<PeriodicTask>,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, period: Duration, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        tracing::debug!(task = %name, "Periodic task tick");
                        job().await;
                    }
                }
            }
            tracing::debug!(task = %name, "Periodic task stopped");
        });
        tracing::info!(task = %name, period_secs = period.as_secs_f64(), "Registered periodic task");
        self.tasks.push(PeriodicTask { name, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signals every job to stop and waits for in-flight runs to finish.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} periodic tasks...", self.tasks.len());
        self.shutdown.cancel();
        for task in self.tasks {
            match task.handle.await {
                Ok(()) => tracing::debug!(task = %task.name, "Task completed"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = %task.name, "Task cancelled"),
                Err(e) => tracing::error!(task = %task.name, error = ?e, "Task panicked"),
            }
        }
        tracing::info!("All periodic tasks stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
