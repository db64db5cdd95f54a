//! Donation state graph.
//!
//! ```text
//! pending -> accepted -> in_transit -> delivered
//!    \          \            \
//!     +----------+------------+--> cancelled
//! ```

use crate::models::DonationStatus;

impl DonationStatus {
    /// `delivered` and `cancelled` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The forward step along the delivery path, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Accepted),
            Self::Accepted => Some(Self::InTransit),
            Self::InTransit => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Cancelled || self.next() == Some(to)
    }
}
