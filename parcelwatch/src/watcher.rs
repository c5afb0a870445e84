//! Consumer side: turns poller snapshots into reports and notifications.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use parcel_portal::{Delta, DeltaDetector, Parcel, PollerHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::notification::NotificationChannel;

/// RFC 850 layout, e.g. `Wednesday, 03-Jan-24 00:00:00 UTC`.
const REPORT_DATE_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S UTC";

pub fn notification_message(count: usize) -> String {
    format!("{count} new parcels delivered")
}

/// Report form of an optional portal date; `-` when unset.
pub fn format_report_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date
            .and_time(NaiveTime::MIN)
            .format(REPORT_DATE_FORMAT)
            .to_string(),
        None => "-".to_string(),
    }
}

fn report_parcel(parcel: &Parcel) {
    info!(
        code = %parcel.code,
        collected = parcel.collected,
        collected_by = %parcel.collected_by,
        collected_date = %format_report_date(parcel.collected_date),
        delivered_date = %format_report_date(parcel.delivered_date),
        "New parcel"
    );
}

pub struct ParcelWatcher {
    detector: DeltaDetector,
    channel: Arc<dyn NotificationChannel>,
    destination: Option<String>,
}

impl ParcelWatcher {
    pub fn new(channel: Arc<dyn NotificationChannel>, destination: Option<String>) -> Self {
        Self {
            detector: DeltaDetector::new(),
            channel,
            destination,
        }
    }

    /// Compare `snapshot` against the previous one, report any new parcels
    /// and notify when the detector asks for it.
    pub async fn handle_snapshot(&mut self, snapshot: Vec<Parcel>) -> Option<Delta> {
        debug!(count = snapshot.len(), "Received parcel snapshot");
        let delta = self.detector.observe(snapshot)?;

        info!("{} new parcels detected", delta.count());
        for parcel in &delta.new_parcels {
            report_parcel(parcel);
        }

        if delta.notify {
            self.notify(delta.count()).await;
        }
        Some(delta)
    }

    async fn notify(&self, count: usize) {
        let Some(destination) = self.destination.as_deref() else {
            warn!(count, "No notification destination configured, skipping notification");
            return;
        };

        let message = notification_message(count);
        match self.channel.send(destination, &message).await {
            Ok(()) => info!(count, "Notification sent"),
            Err(e) => error!(
                channel = self.channel.channel_type(),
                error = %e,
                "Failed to send notification"
            ),
        }
    }

    /// Consume snapshots until the poller stops or `shutdown` fires.
    pub async fn run(&mut self, poller: &mut PollerHandle, shutdown: CancellationToken) {
        loop {
            let snapshot = tokio::select! {
                _ = shutdown.cancelled() => break,
                snapshot = poller.recv() => match snapshot {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };
            self.handle_snapshot(snapshot).await;
        }
        debug!("Parcel watcher stopped");
    }
}
