//! Who may do what. Handlers build one [`Caller`] per request and ask it;
//! no role strings are compared anywhere else.

use sahyog_db::Database;
use sahyog_types::models::{Donation, DonationStatus, Message, Role};
use sahyog_types::token::Claims;

use crate::error::ApiError;

/// The authenticated identity plus the NGO it operates, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
    pub ngo_id: Option<i64>,
}

/// Which donations a caller's list contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationScope {
    OwnedBy(i64),
    AssignedTo(i64),
    /// An NGO user without an NGO profile sees nothing.
    Nothing,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Not an edge of the lifecycle graph.
    InvalidTransition,
    Forbidden(&'static str),
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::InvalidTransition => ApiError::BadRequest("Invalid status transition"),
            Denial::Forbidden(reason) => ApiError::Forbidden(reason),
        }
    }
}

impl Caller {
    /// Resolves the caller's NGO when the role has one.
    pub fn load(db: &Database, claims: &Claims) -> anyhow::Result<Self> {
        let ngo_id = match claims.role {
            Role::Ngo => db.get_ngo_by_user(claims.sub)?.map(|ngo| ngo.id),
            Role::Donor | Role::Admin => None,
        };
        Ok(Self {
            id: claims.sub,
            role: claims.role,
            ngo_id,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn owns(&self, donation: &Donation) -> bool {
        self.role == Role::Donor && donation.donor_id == self.id
    }

    fn is_assigned(&self, donation: &Donation) -> bool {
        self.ngo_id.is_some() && donation.ngo_id == self.ngo_id
    }

    pub fn donation_scope(&self) -> DonationScope {
        match (self.role, self.ngo_id) {
            (Role::Donor, _) => DonationScope::OwnedBy(self.id),
            (Role::Ngo, Some(ngo_id)) => DonationScope::AssignedTo(ngo_id),
            (Role::Ngo, None) => DonationScope::Nothing,
            (Role::Admin, _) => DonationScope::Pending,
        }
    }

    pub fn can_create_donation(&self) -> bool {
        self.role == Role::Donor
    }

    pub fn can_view(&self, donation: &Donation) -> bool {
        self.is_admin()
            || self.owns(donation)
            || self.is_assigned(donation)
            || donation.status == DonationStatus::Pending
    }

    pub fn can_accept(&self, donation: &Donation) -> bool {
        self.role == Role::Ngo && self.ngo_id.is_some() && donation.status == DonationStatus::Pending
    }

    /// `accepted -> in_transit` and `in_transit -> delivered`.
    pub fn can_advance(&self, donation: &Donation) -> bool {
        self.is_admin() || self.is_assigned(donation)
    }

    pub fn can_cancel(&self, donation: &Donation) -> bool {
        self.is_admin() || self.owns(donation) || self.is_assigned(donation)
    }

    pub fn can_create_ngo(&self) -> bool {
        self.role == Role::Ngo
    }

    pub fn can_verify_ngos(&self) -> bool {
        self.is_admin()
    }

    pub fn can_mark_read(&self, message: &Message) -> bool {
        message.receiver_id == self.id
    }

    /// Graph check first, then the capability for the target state.
    pub fn check_transition(&self, donation: &Donation, to: DonationStatus) -> Result<(), Denial> {
        if !donation.status.can_transition_to(to) {
            return Err(Denial::InvalidTransition);
        }

        let allowed = match to {
            DonationStatus::Accepted => self.can_accept(donation),
            DonationStatus::InTransit | DonationStatus::Delivered => self.can_advance(donation),
            DonationStatus::Cancelled => self.can_cancel(donation),
            DonationStatus::Pending => return Err(Denial::InvalidTransition),
        };

        if allowed {
            Ok(())
        } else {
            Err(Denial::Forbidden(match to {
                DonationStatus::Accepted => "Only an NGO with a profile can accept donations",
                DonationStatus::Cancelled => "Not allowed to cancel this donation",
                _ => "Only the assigned NGO or an admin can update this donation",
            }))
        }
    }
}
