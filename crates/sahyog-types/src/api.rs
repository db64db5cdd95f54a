use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DonationStatus, DonationType, MessageType, Role, Urgency, User};

/// A request body that passed deserialization but breaks a field rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

fn check(ok: bool, field: &'static str, reason: &'static str) -> Result<(), ValidationError> {
    if ok {
        Ok(())
    } else {
        Err(ValidationError { field, reason })
    }
}

fn min_chars(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check(min_chars(&self.name, 2), "name", "must be at least 2 characters")?;
        check(looks_like_email(&self.email), "email", "invalid email address")?;
        check(self.password.chars().count() >= 6, "password", "must be at least 6 characters")
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

// -- NGOs --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNgoRequest {
    pub organization_name: String,
    pub description: Option<String>,
    pub mission: Option<String>,
    pub location: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    pub registration_number: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
}

impl CreateNgoRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check(min_chars(&self.organization_name, 2), "organizationName", "must be at least 2 characters")?;
        check(min_chars(&self.location, 2), "location", "is required")?;
        check(
            self.focus_areas.iter().all(|area| !area.trim().is_empty()),
            "focusAreas",
            "entries must not be empty",
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyNgoRequest {
    pub verified: bool,
}

// -- Donations --

/// Fields a donor may set. Any `donorId` in the body is ignored; the donor is
/// always the authenticated caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonationRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub donation_type: DonationType,
    pub quantity: String,
    pub amount: Option<f64>,
    #[serde(default)]
    pub urgency: Urgency,
    pub pickup_address: String,
    pub pickup_time: Option<String>,
    pub estimated_impact: Option<i64>,
}

impl CreateDonationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check(min_chars(&self.title, 3), "title", "must be at least 3 characters")?;
        if let Some(description) = &self.description {
            check(min_chars(description, 10), "description", "must be at least 10 characters")?;
        }
        check(min_chars(&self.quantity, 1), "quantity", "is required")?;
        check(min_chars(&self.pickup_address, 10), "pickupAddress", "must be at least 10 characters")?;
        if let Some(pickup_time) = &self.pickup_time {
            check(min_chars(pickup_time, 1), "pickupTime", "must not be empty")?;
        }
        if let Some(amount) = self.amount {
            check(amount.is_finite() && amount >= 0.0, "amount", "must be a non-negative number")?;
        }
        check(
            self.estimated_impact.is_none_or(|impact| impact >= 0),
            "estimatedImpact",
            "must not be negative",
        )
    }
}

/// Body of `PATCH /api/donations/{id}`: a move along the lifecycle graph.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDonationRequest {
    pub status: DonationStatus,
    pub message: Option<String>,
    pub actual_impact: Option<i64>,
}

impl UpdateDonationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(impact) = self.actual_impact {
            check(self.status == DonationStatus::Delivered, "actualImpact", "only allowed on delivery")?;
            check(impact >= 0, "actualImpact", "must not be negative")?;
        }
        Ok(())
    }
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: i64,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub donation_id: Option<i64>,
}

impl SendMessageRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check(!self.content.trim().is_empty(), "content", "must not be empty")
    }
}

// -- Analytics --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_donations: usize,
    pub verified_ngos: usize,
    pub total_value: f64,
    pub lives_impacted: i64,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
