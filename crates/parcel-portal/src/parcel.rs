use chrono::NaiveDate;

/// One shipment row from the portal's parcel table.
///
/// `code` is only unique within a single snapshot. Exactly one of
/// `collected_date` / `delivered_date` is filled, chosen by `collected`;
/// both stay `None` when the status date could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parcel {
    pub code: String,
    pub collected: bool,
    pub collected_by: String,
    pub collected_date: Option<NaiveDate>,
    pub delivered_date: Option<NaiveDate>,
}

impl Parcel {
    /// The date relevant to the parcel's state.
    pub fn date(&self) -> Option<NaiveDate> {
        if self.collected {
            self.collected_date
        } else {
            self.delivered_date
        }
    }
}
