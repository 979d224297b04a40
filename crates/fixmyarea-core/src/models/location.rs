//! Reference catalog of administrative locations.

use serde::{Deserialize, Serialize};

/// One (state, district, village) triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationEntry {
    pub state: String,
    pub district: String,
    pub village: String,
}

impl LocationEntry {
    pub fn new(
        state: impl Into<String>,
        district: impl Into<String>,
        village: impl Into<String>,
    ) -> Self {
        Self {
            state: state.into(),
            district: district.into(),
            village: village.into(),
        }
    }
}
