//! Immutable records produced by a call.

use serde::{Deserialize, Serialize};

use crate::core::realtime::TranscriptDirection;

/// How the call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    #[default]
    Completed,
    Abandoned,
    Failed,
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallStatus::Completed => write!(f, "completed"),
            CallStatus::Abandoned => write!(f, "abandoned"),
            CallStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Whether the call produced a confirmed order or request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    None,
    Pending,
    Confirmed,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::None => write!(f, "none"),
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// One transcript fragment, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub text: String,
    #[serde(rename = "type")]
    pub direction: TranscriptDirection,
}

/// Final record of one call attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub id: String,
    /// Unix milliseconds at call start
    pub timestamp: i64,
    /// Rounded seconds
    pub duration_secs: u64,
    pub status: CallStatus,
    pub booking_status: BookingStatus,
    pub customer_name: String,
    pub customer_phone: String,
    pub transcript: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Confirmed,
    Pending,
    Cancelled,
}

/// Order or request created by a transactional report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: String,
    /// Product SKU, or the report type when no product was named
    pub product_id: String,
    pub product_name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
    pub status: OrderStatus,
    pub notes: String,
    pub language: String,
    /// Unix milliseconds
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&CallStatus::Abandoned).unwrap(), "\"abandoned\"");
        assert_eq!(serde_json::to_string(&BookingStatus::None).unwrap(), "\"none\"");
        assert_eq!(BookingStatus::Confirmed.to_string(), "confirmed");
        assert_eq!(CallStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_transcript_entry_uses_type_key() {
        let entry = TranscriptEntry {
            text: "hello".into(),
            direction: TranscriptDirection::Input,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "input");
    }
}
