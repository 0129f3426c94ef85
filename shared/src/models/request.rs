//! Stock request (withdrawal) models
//!
//! A request is raised by a technician, approved by a foreman and fulfilled
//! by the warehouse, optionally against a confirmed sales order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A request to withdraw stock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_id: String,
    pub request_date: DateTime<Utc>,
    pub status: RequestStatus,
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub staff_id: Option<String>,
    pub description: Option<String>,
    pub approved_by: Option<String>,
    pub approved_date: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<RequestItem>>,
}

/// A product line of a request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    pub request_item_id: String,
    pub request_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub fulfilled_qty: i32,
    pub remaining_qty: i32,
}

/// A requested product and quantity, before it is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLine {
    pub product_id: String,
    pub quantity: i32,
}

/// Request lifecycle
///
/// `Awaiting Approval` -> `Approved` | `Rejected`;
/// `Approved` -> `Pending` once stock starts flowing; `Pending` -> `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "request_status"))]
pub enum RequestStatus {
    #[serde(rename = "Awaiting Approval")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Awaiting Approval"))]
    AwaitingApproval,
    Approved,
    Rejected,
    Pending,
    Closed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::AwaitingApproval => "Awaiting Approval",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Pending => "Pending",
            RequestStatus::Closed => "Closed",
        }
    }

    /// Whether the warehouse may draw stock against the request
    pub fn accepts_fulfillment(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Pending)
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (AwaitingApproval, Approved)
                | (AwaitingApproval, Rejected)
                | (Approved, Pending)
                | (Pending, Pending)
                | (Pending, Closed)
        )
    }

    /// Terminal states never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Closed)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Awaiting Approval" => Ok(RequestStatus::AwaitingApproval),
            "Approved" => Ok(RequestStatus::Approved),
            "Rejected" => Ok(RequestStatus::Rejected),
            "Pending" => Ok(RequestStatus::Pending),
            "Closed" => Ok(RequestStatus::Closed),
            other => Err(format!("Unknown request status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_status_transitions() {
        use RequestStatus::*;
        assert!(AwaitingApproval.can_transition_to(Approved));
        assert!(AwaitingApproval.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Closed));

        assert!(!AwaitingApproval.can_transition_to(Closed));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Closed.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Closed));
    }

    #[test]
    fn test_request_status_wire_format() {
        let json = serde_json::to_string(&RequestStatus::AwaitingApproval).unwrap();
        assert_eq!(json, "\"Awaiting Approval\"");
        let parsed: RequestStatus = "Pending".parse().unwrap();
        assert_eq!(parsed, RequestStatus::Pending);
        assert!("pending".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_accepts_fulfillment() {
        assert!(RequestStatus::Approved.accepts_fulfillment());
        assert!(RequestStatus::Pending.accepts_fulfillment());
        assert!(!RequestStatus::AwaitingApproval.accepts_fulfillment());
        assert!(!RequestStatus::Closed.accepts_fulfillment());
    }
}
