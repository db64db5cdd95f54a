use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Enums stored as TEXT columns and sent as snake_case JSON strings.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Donor,
    Ngo,
    Admin,
}

text_enum!(Role, "role", {
    Donor => "donor",
    Ngo => "ngo",
    Admin => "admin",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationType {
    Food,
    Clothes,
    Money,
}

text_enum!(DonationType, "donation type", {
    Food => "food",
    Clothes => "clothes",
    Money => "money",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Pending,
    Accepted,
    InTransit,
    Delivered,
    Cancelled,
}

text_enum!(DonationStatus, "donation status", {
    Pending => "pending",
    Accepted => "accepted",
    InTransit => "in_transit",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

text_enum!(Urgency, "urgency", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
}

text_enum!(MessageType, "message type", {
    Text => "text",
    Image => "image",
    File => "file",
});

/// Public view of an account. The password hash never leaves the db crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ngo {
    pub id: i64,
    pub user_id: i64,
    pub organization_name: String,
    pub description: Option<String>,
    pub mission: Option<String>,
    pub location: String,
    pub verified: bool,
    pub impact_score: f64,
    pub focus_areas: Vec<String>,
    pub registration_number: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: i64,
    pub donor_id: i64,
    pub ngo_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub donation_type: DonationType,
    pub quantity: String,
    pub amount: Option<f64>,
    pub status: DonationStatus,
    pub urgency: Urgency,
    pub pickup_address: String,
    pub pickup_time: Option<String>,
    pub estimated_impact: Option<i64>,
    pub actual_impact: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub donation_id: Option<i64>,
    pub content: String,
    pub message_type: MessageType,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The other party of the conversation, seen from `user_id`.
    pub fn correspondent_of(&self, user_id: i64) -> i64 {
        if self.sender_id == user_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

/// One row of a donation's append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationUpdate {
    pub id: i64,
    pub donation_id: i64,
    pub status: DonationStatus,
    pub message: Option<String>,
    pub updated_by: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_matches_wire_format() {
        assert_eq!(DonationStatus::InTransit.as_str(), "in_transit");
        assert_eq!(
            serde_json::to_string(&DonationStatus::InTransit).unwrap(),
            "\"in_transit\""
        );
        assert_eq!("in_transit".parse::<DonationStatus>(), Ok(DonationStatus::InTransit));
    }

    #[test]
    fn unknown_text_is_rejected() {
        let err = "furniture".parse::<DonationType>().unwrap_err();
        assert_eq!(err.kind, "donation type");
        assert_eq!(err.to_string(), "unknown donation type 'furniture'");
    }

    #[test]
    fn donation_serializes_camel_case_with_type_key() {
        let now = Utc::now();
        let donation = Donation {
            id: 1,
            donor_id: 2,
            ngo_id: None,
            title: "Rice bags".into(),
            description: None,
            donation_type: DonationType::Food,
            quantity: "20 bags".into(),
            amount: None,
            status: DonationStatus::Pending,
            urgency: Urgency::High,
            pickup_address: "12 MG Road".into(),
            pickup_time: None,
            estimated_impact: None,
            actual_impact: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&donation).unwrap();
        assert_eq!(json["type"], "food");
        assert_eq!(json["donorId"], 2);
        assert!(json["ngoId"].is_null());
        assert_eq!(json["pickupAddress"], "12 MG Road");
    }

    #[test]
    fn correspondent_is_the_other_side() {
        let message = Message {
            id: 1,
            sender_id: 7,
            receiver_id: 9,
            donation_id: None,
            content: "hello".into(),
            message_type: MessageType::Text,
            read: false,
            created_at: Utc::now(),
        };
        assert_eq!(message.correspondent_of(7), 9);
        assert_eq!(message.correspondent_of(9), 7);
    }
}
