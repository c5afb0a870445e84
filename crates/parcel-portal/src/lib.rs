//! Scraper for the resi-sense parcel delivery portal.
//!
//! The portal has no public API, so this crate logs in with a username and
//! password, keeps the resulting cookie pair alive, scrapes the deliveries
//! table and turns each row into a typed [`Parcel`].
//!
//! ```ignore
//! use parcel_portal::{Credentials, Poller, PollerConfig, Portal, PortalConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let portal = Portal::new(PortalConfig::new("wilburn"))?;
//! let poller = Poller::connect(portal, Credentials::new("user", "pass"), PollerConfig::default()).await?;
//! let mut handle = poller.spawn(CancellationToken::new());
//! while let Some(snapshot) = handle.recv().await {
//!     println!("{} parcels on the portal", snapshot.len());
//! }
//! ```

pub mod auth;
pub mod delta;
pub mod error;
pub mod fetch;
pub mod parcel;
pub mod parser;
pub mod poller;
pub mod portal;
pub mod session;
pub mod table;

pub use auth::{Credentials, authenticate};
pub use delta::{Delta, DeltaDetector};
pub use error::{AuthError, ConfigError, ExtractError, FetchError, ParseError, PollError};
pub use parcel::Parcel;
pub use parser::{ParsedRow, parse_row};
pub use poller::{Poller, PollerConfig, PollerHandle, SharedSession};
pub use portal::{Portal, PortalConfig, install_rustls_provider};
pub use session::{Session, SessionJar};
pub use table::{RawRow, extract_rows, find_table, scrape_parcels};
