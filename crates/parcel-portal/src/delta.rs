//! New-parcel detection between consecutive snapshots.
//!
//! The portal lists newest parcels first, so growth of the list is read as
//! that many new parcels at the front. Reordering or removals on the portal
//! side are not detected.

use crate::parcel::Parcel;

/// Parcels that appeared since the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub new_parcels: Vec<Parcel>,
    /// False for the first non-empty snapshot after startup.
    pub notify: bool,
}

impl Delta {
    pub fn count(&self) -> usize {
        self.new_parcels.len()
    }
}

/// Remembers the last snapshot and compares the next one against it.
#[derive(Debug, Default)]
pub struct DeltaDetector {
    known: Vec<Parcel>,
}

impl DeltaDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn known(&self) -> &[Parcel] {
        &self.known
    }

    /// Compare `snapshot` with the previous one and keep it as the new
    /// baseline. Returns `None` when the list did not grow.
    pub fn observe(&mut self, snapshot: Vec<Parcel>) -> Option<Delta> {
        let grown = snapshot.len().saturating_sub(self.known.len());
        let delta = (grown > 0).then(|| Delta {
            new_parcels: snapshot[..grown].to_vec(),
            notify: !self.known.is_empty(),
        });
        self.known = snapshot;
        delta
    }
}
