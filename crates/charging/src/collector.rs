use std::{any::Any, fmt::Debug, panic::AssertUnwindSafe, time::Duration};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::{
    task::JoinHandle,
    time::{self, sleep, MissedTickBehavior},
};

use crate::{client::Client, database::Database};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionStrategy {
    Restart,
    Resume,
    Stop,
}

#[async_trait]
pub trait Collector {
    type Error: Debug;

    /// Identifies the collector in log output.
    fn unique_id() -> &'static str;

    /// This method is regularly called and supposed to gather data and push
    /// it to the database.
    async fn run<D: Database>(&mut self, client: &Client<D>) -> Result<Continuation, Self::Error>;

    /// Specifies how long to wait between calls to the `run` method.
    fn tick(&self) -> Option<Duration> {
        Some(Duration::from_secs(10))
    }

    /// Defines a backoff function, used to progressively increase the waiting
    /// time when consecutive failures happen.
    fn backoff(&self, last_backoff: Duration) -> Duration {
        last_backoff + self.tick().unwrap_or(Duration::from_secs(10))
    }

    /// Specifies the behavior if the collector returns an error.
    fn on_error(&self, _error: Self::Error) -> SupervisionStrategy {
        SupervisionStrategy::Resume
    }

    /// Specifies the behavior if the collector panics.
    fn on_panic(&self, _error: Box<dyn Any + Send>) -> SupervisionStrategy {
        SupervisionStrategy::Restart
    }
}

pub struct CollectorRef {
    handle: JoinHandle<()>,
}

impl CollectorRef {
    /// Waits until the collector exits or is stopped by its supervision
    /// strategy.
    pub async fn join(self) {
        if let Err(why) = self.handle.await {
            log::error!("collector task failed: {why}");
        }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Spawns the collector. Runs never overlap: the next tick is only awaited
/// after the previous run has returned.
pub fn run<D, C, F>(factory: F, client: Client<D>) -> CollectorRef
where
    D: Database,
    C: Collector + Send + 'static,
    <C as Collector>::Error: Send,
    F: 'static + Send + Fn() -> C,
{
    let mut collector = factory();

    let handle = tokio::spawn(async move {
        let mut interval = collector.tick().map(|tick| {
            let mut interval = time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut backoff = collector.tick().unwrap_or(Duration::from_secs(10));
        loop {
            if let Some(tick) = &mut interval {
                tick.tick().await;
            }
            // run
            let result = AssertUnwindSafe(collector.run(&client))
                .catch_unwind()
                .await;
            // check for errors
            let strategy = match result {
                Ok(Ok(Continuation::Continue)) => {
                    backoff = collector.tick().unwrap_or(Duration::from_secs(10));
                    continue;
                }
                Ok(Ok(Continuation::Exit)) => break,
                Ok(Err(why)) => {
                    log::error!("collector {} failed: {:?}", C::unique_id(), why);
                    collector.on_error(why)
                }
                Err(why) => {
                    log::error!("collector {} panicked: {:?}", C::unique_id(), why);
                    collector.on_panic(why)
                }
            };
            match strategy {
                SupervisionStrategy::Restart => {
                    collector = factory();
                }
                SupervisionStrategy::Resume => {}
                SupervisionStrategy::Stop => {
                    log::warn!("collector {} stopped", C::unique_id());
                    break;
                }
            }
            backoff = collector.backoff(backoff);
            sleep(backoff).await;
        }
    });

    CollectorRef { handle }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::memory::MemoryDatabase;

    /// Fails on its first run, panics on its second, then exits.
    struct FlakyCollector {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Collector for FlakyCollector {
        type Error = String;

        fn unique_id() -> &'static str {
            "flaky"
        }

        async fn run<D: Database>(
            &mut self,
            _client: &Client<D>,
        ) -> Result<Continuation, Self::Error> {
            match self.runs.fetch_add(1, Ordering::SeqCst) {
                0 => Err("source unavailable".to_owned()),
                1 => panic!("unexpected payload"),
                2 => Ok(Continuation::Continue),
                _ => Ok(Continuation::Exit),
            }
        }

        fn tick(&self) -> Option<Duration> {
            Some(Duration::from_secs(60))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_from_errors_and_panics() {
        let runs = Arc::new(AtomicUsize::new(0));
        let restarts = Arc::new(AtomicUsize::new(0));
        let factory = {
            let runs = runs.clone();
            let restarts = restarts.clone();
            move || {
                restarts.fetch_add(1, Ordering::SeqCst);
                FlakyCollector { runs: runs.clone() }
            }
        };

        run(factory, Client::new("test", MemoryDatabase::new()))
            .join()
            .await;

        assert_eq!(runs.load(Ordering::SeqCst), 4);
        // the initial construction plus one restart after the panic
        assert_eq!(restarts.load(Ordering::SeqCst), 2);
    }

    struct StoppingCollector;

    #[async_trait]
    impl Collector for StoppingCollector {
        type Error = String;

        fn unique_id() -> &'static str {
            "stopping"
        }

        async fn run<D: Database>(
            &mut self,
            _client: &Client<D>,
        ) -> Result<Continuation, Self::Error> {
            Err("fatal".to_owned())
        }

        fn on_error(&self, _error: Self::Error) -> SupervisionStrategy {
            SupervisionStrategy::Stop
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_strategy_ends_the_loop() {
        run(|| StoppingCollector, Client::new("test", MemoryDatabase::new()))
            .join()
            .await;
    }
}
