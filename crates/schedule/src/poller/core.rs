use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::info;

use pawcare_core::{PollerConfig, Registry, SharedRegistry};
use pawcare_notify::{Dispatcher, ReminderRenderer};

use super::ledger::{LedgerReader, NotificationRecord};

/// Background reminder poller.
///
/// A `Poller` is the stopped state; [`Poller::start`] moves it onto a tokio
/// task and returns the running [`PollerHandle`].
pub struct Poller {
    pub(super) config: PollerConfig,
    /// Pet data, shared with the foreground.
    pub(super) registry: SharedRegistry,
    pub(super) dispatcher: Arc<Dispatcher>,
    pub(super) renderer: ReminderRenderer,
    /// Written only by the poller task.
    pub(super) ledger: NotificationRecord,
    pub(super) shutdown: Arc<AtomicBool>,
    pub(super) wake: Arc<Notify>,
}

impl Poller {
    pub fn new(config: PollerConfig, registry: SharedRegistry, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            registry,
            dispatcher,
            renderer: ReminderRenderer::default(),
            ledger: NotificationRecord::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn with_renderer(mut self, renderer: ReminderRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Read-only view of the notification ledger.
    pub fn ledger(&self) -> LedgerReader {
        self.ledger.reader()
    }

    /// Clone the registry under a short read lock.
    pub(super) fn snapshot(&self) -> Registry {
        match self.registry.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Spawn the poll loop on the current tokio runtime.
    pub fn start(self) -> PollerHandle {
        let shutdown = Arc::clone(&self.shutdown);
        let wake = Arc::clone(&self.wake);
        let ledger = self.ledger.reader();
        info!(
            tick_secs = self.config.tick_interval().as_secs(),
            channels = ?self.dispatcher.channel_names(),
            "Reminder poller starting"
        );
        let join = tokio::spawn(self.run());
        PollerHandle {
            shutdown,
            wake,
            ledger,
            join,
        }
    }

    async fn run(mut self) {
        let interval = self.config.tick_interval();
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            let report = self.tick_at(pawcare_core::time::now()).await;
            report.log();

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.wake.notified() => {}
            }
        }
        info!("Reminder poller stopped");
    }
}

/// Handle to a running [`Poller`].
pub struct PollerHandle {
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
    ledger: LedgerReader,
    join: JoinHandle<()>,
}

impl PollerHandle {
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    pub fn ledger(&self) -> LedgerReader {
        self.ledger.clone()
    }

    /// Signal the loop and wait for it to exit.
    ///
    /// A tick in progress finishes its current delivery first; the sleep
    /// between ticks is cut short.
    pub async fn stop(self) {
        info!("Reminder poller shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
        self.wake.notify_one();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Reminder poller task failed");
        }
    }
}
