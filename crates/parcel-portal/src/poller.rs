//! Background polling of the deliveries page.
//!
//! Two tasks share one [`SharedSession`]: the refresh task logs in again on a
//! fixed cadence and swaps the session, the fetch task reads whichever
//! session is current and publishes each successful snapshot through a
//! single-slot channel.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auth::{Credentials, authenticate};
use crate::error::{AuthError, ConfigError};
use crate::parcel::Parcel;
use crate::portal::Portal;
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Pause after a snapshot has been handed over.
    pub poll_interval: Duration,
    /// How often to log in again.
    pub refresh_interval: Duration,
    /// Pause before every fetch attempt except the first.
    pub retry_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60 * 60),
            refresh_interval: Duration::from_secs(8 * 60 * 60),
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl PollerConfig {
    /// Reject zero periods. `interval_at` panics on a zero refresh period.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("poll_interval"));
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("refresh_interval"));
        }
        Ok(())
    }
}

/// The live session, replaced whole on every refresh.
#[derive(Debug)]
pub struct SharedSession {
    current: RwLock<Arc<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            current: RwLock::new(Arc::new(session)),
        }
    }

    pub fn load(&self) -> Arc<Session> {
        self.current.read().clone()
    }

    /// Swap in `session`, returning the one it replaced.
    pub fn replace(&self, session: Session) -> Arc<Session> {
        std::mem::replace(&mut *self.current.write(), Arc::new(session))
    }
}

/// An authenticated poller that has not started its tasks yet.
pub struct Poller {
    portal: Portal,
    credentials: Credentials,
    config: PollerConfig,
    session: Arc<SharedSession>,
}

impl Poller {
    /// Check `config` and log in once. Failing here is a startup failure;
    /// nothing is retried.
    pub async fn connect(
        portal: Portal,
        credentials: Credentials,
        config: PollerConfig,
    ) -> Result<Self, AuthError> {
        config.validate()?;
        let session = authenticate(&portal, &credentials).await?;
        info!(subdomain = %session.subdomain, "Authenticated with parcel portal");

        Ok(Self {
            portal,
            credentials,
            config,
            session: Arc::new(SharedSession::new(session)),
        })
    }

    pub fn session(&self) -> Arc<Session> {
        self.session.load()
    }

    /// Start the refresh and fetch tasks.
    pub fn spawn(self, cancel: CancellationToken) -> PollerHandle {
        let (tx, rx) = mpsc::channel(1);

        let refresh_task = tokio::spawn(refresh_loop(
            self.portal.clone(),
            self.credentials,
            Arc::clone(&self.session),
            self.config.refresh_interval,
            cancel.clone(),
        ));
        let fetch_task = tokio::spawn(fetch_loop(
            self.portal,
            Arc::clone(&self.session),
            tx,
            self.config,
            cancel.clone(),
        ));

        PollerHandle {
            parcels: rx,
            session: self.session,
            cancel,
            tasks: vec![refresh_task, fetch_task],
        }
    }
}

/// Receiving side of a running poller.
pub struct PollerHandle {
    parcels: mpsc::Receiver<Vec<Parcel>>,
    session: Arc<SharedSession>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    /// Next full snapshot. `None` once the poller has stopped.
    pub async fn recv(&mut self) -> Option<Vec<Parcel>> {
        self.parcels.recv().await
    }

    pub fn session(&self) -> Arc<Session> {
        self.session.load()
    }

    /// Stop both tasks and wait for them to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        drop(self.parcels);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Poller task ended abnormally");
            }
        }
    }
}

/// Returns true when cancelled before `duration` elapsed.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

async fn refresh_loop(
    portal: Portal,
    credentials: Credentials,
    session: Arc<SharedSession>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match authenticate(&portal, &credentials).await {
            Ok(fresh) => {
                session.replace(fresh);
                info!("Portal session refreshed");
            }
            Err(e) => {
                error!(error = %e, "Failed to refresh portal session, keeping the previous one");
            }
        }
    }

    debug!("Session refresh task stopped");
}

async fn fetch_loop(
    portal: Portal,
    session: Arc<SharedSession>,
    tx: mpsc::Sender<Vec<Parcel>>,
    config: PollerConfig,
    cancel: CancellationToken,
) {
    let mut first = true;

    loop {
        if !first && sleep_or_cancel(config.retry_delay, &cancel).await {
            break;
        }
        first = false;

        let current = session.load();
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = portal.poll(&current) => result,
        };

        let parcels = match result {
            Ok(parcels) => parcels,
            Err(e) => {
                warn!(
                    stage = e.stage(),
                    url = %portal.deliveries_url(),
                    error = %e,
                    "Failed to poll deliveries page"
                );
                continue;
            }
        };

        debug!(count = parcels.len(), "Publishing parcel snapshot");
        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = tx.send(parcels) => {
                if sent.is_err() {
                    debug!("Snapshot receiver dropped");
                    break;
                }
            }
        }

        if sleep_or_cancel(config.poll_interval, &cancel).await {
            break;
        }
    }

    debug!("Deliveries fetch task stopped");
}
