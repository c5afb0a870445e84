//! Startup sequence: channel, portal, initial login, then the watch loop.

use parcel_portal::{Poller, Portal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Result;
use crate::config::AppConfig;
use crate::notification::select_channel;
use crate::watcher::ParcelWatcher;

/// Run until `shutdown` fires. Only startup can fail; once the poller is
/// running every error is logged and retried.
pub async fn run(config: AppConfig, shutdown: CancellationToken) -> Result<()> {
    if config.destination.is_none() {
        warn!("TO_NUMBER is not set, new parcels will only be logged");
    }
    let channel = select_channel(&config)?;

    let portal = Portal::new(config.portal)?;
    info!(url = %portal.deliveries_url(), "Starting parcel watcher");

    let poller = Poller::connect(portal, config.credentials, config.poller).await?;

    let mut handle = poller.spawn(shutdown.child_token());
    let mut watcher = ParcelWatcher::new(channel, config.destination);
    watcher.run(&mut handle, shutdown).await;
    handle.shutdown().await;
    Ok(())
}
