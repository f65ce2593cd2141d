//! Status enums for invoices and credit notes.
//!
//! The backend is not consistent about status spelling: besides the English
//! codes it sometimes sends French ones (`PAYEE`, `EN_ATTENTE`) and mixed
//! case. Parsing here is case-insensitive and folds the French synonyms in.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} status: {value}")]
pub struct StatusParseError {
    kind: &'static str,
    value: String,
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_uppercase().replace([' ', '-'], "_")
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    #[default]
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// All statuses in display order.
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::Pending,
        Self::Paid,
        Self::Overdue,
        Self::Cancelled,
    ];

    /// Wire code (`PAID`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Overdue => "OVERDUE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// French label.
    #[must_use]
    pub const fn label_fr(self) -> &'static str {
        match self {
            Self::Draft => "Brouillon",
            Self::Pending => "En attente",
            Self::Paid => "Payée",
            Self::Overdue => "En retard",
            Self::Cancelled => "Annulée",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "DRAFT" | "BROUILLON" => Ok(Self::Draft),
            "PENDING" | "EN_ATTENTE" => Ok(Self::Pending),
            "PAID" | "PAYEE" => Ok(Self::Paid),
            "OVERDUE" | "EN_RETARD" => Ok(Self::Overdue),
            "CANCELLED" | "CANCELED" | "ANNULEE" => Ok(Self::Cancelled),
            _ => Err(StatusParseError {
                kind: "invoice",
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credit note lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditNoteStatus {
    Draft,
    #[default]
    Pending,
    Applied,
    Cancelled,
}

impl CreditNoteStatus {
    /// All statuses in display order.
    pub const ALL: [Self; 4] = [Self::Draft, Self::Pending, Self::Applied, Self::Cancelled];

    /// Wire code (`APPLIED`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Applied => "APPLIED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// French label.
    #[must_use]
    pub const fn label_fr(self) -> &'static str {
        match self {
            Self::Draft => "Brouillon",
            Self::Pending => "En attente",
            Self::Applied => "Appliqué",
            Self::Cancelled => "Annulé",
        }
    }

    /// Status implied by the legacy `is_active` flag when no status is sent.
    #[must_use]
    pub const fn from_active_flag(is_active: bool) -> Self {
        if is_active {
            Self::Pending
        } else {
            Self::Cancelled
        }
    }
}

impl FromStr for CreditNoteStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "DRAFT" | "BROUILLON" => Ok(Self::Draft),
            "PENDING" | "EN_ATTENTE" => Ok(Self::Pending),
            "APPLIED" | "APPLIQUE" => Ok(Self::Applied),
            "CANCELLED" | "CANCELED" | "ANNULE" => Ok(Self::Cancelled),
            _ => Err(StatusParseError {
                kind: "credit note",
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for CreditNoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse status grouping used by dashboard filtering.
///
/// `Overdue` also takes cancelled invoices: the dashboard shows both under
/// the same red badge. This is a filtering bucket, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBucket {
    Paid,
    Pending,
    Overdue,
}

impl StatusBucket {
    /// Classify a raw backend status string. Unrecognized values have no
    /// bucket.
    #[must_use]
    pub fn classify(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PAID" | "PAYEE" => Some(Self::Paid),
            "PENDING" | "EN_ATTENTE" => Some(Self::Pending),
            "OVERDUE" | "EN_RETARD" | "CANCELLED" | "ANNULEE" => Some(Self::Overdue),
            _ => None,
        }
    }

    /// The raw status codes this bucket accepts.
    #[must_use]
    pub const fn members(self) -> &'static [&'static str] {
        match self {
            Self::Paid => &["PAID", "PAYEE"],
            Self::Pending => &["PENDING", "EN_ATTENTE"],
            Self::Overdue => &["OVERDUE", "EN_RETARD", "CANCELLED", "ANNULEE"],
        }
    }
}

impl FromStr for StatusBucket {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(Self::Paid),
            "pending" => Ok(Self::Pending),
            "overdue" => Ok(Self::Overdue),
            _ => Err(StatusParseError {
                kind: "filter",
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for StatusBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Overdue => "overdue",
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_status_parse_synonyms() {
        assert_eq!("paid".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
        assert_eq!("PAYEE".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
        assert_eq!("en attente".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Pending);
        assert!("LOST".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(InvoiceStatus::Cancelled.label_fr(), "Annulée");
        assert_eq!(CreditNoteStatus::Applied.label_fr(), "Appliqué");
    }

    #[test]
    fn test_credit_note_active_flag() {
        assert_eq!(CreditNoteStatus::from_active_flag(true), CreditNoteStatus::Pending);
        assert_eq!(CreditNoteStatus::from_active_flag(false), CreditNoteStatus::Cancelled);
    }

    #[test]
    fn test_bucket_classification() {
        assert_eq!(StatusBucket::classify("payee"), Some(StatusBucket::Paid));
        assert_eq!(StatusBucket::classify("EN_ATTENTE"), Some(StatusBucket::Pending));
        assert_eq!(StatusBucket::classify("CANCELLED"), Some(StatusBucket::Overdue));
        assert_eq!(StatusBucket::classify("DRAFT"), None);
        assert_eq!(StatusBucket::classify(""), None);
    }

    #[test]
    fn test_buckets_are_disjoint_and_cover_members() {
        let buckets = [StatusBucket::Paid, StatusBucket::Pending, StatusBucket::Overdue];
        for bucket in buckets {
            for raw in bucket.members() {
                assert_eq!(StatusBucket::classify(raw), Some(bucket));
            }
        }
        let total: usize = buckets.iter().map(|b| b.members().len()).sum();
        assert_eq!(total, 8);
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&InvoiceStatus::Overdue).unwrap();
        assert_eq!(json, "\"OVERDUE\"");
        let back: CreditNoteStatus = serde_json::from_str("\"APPLIED\"").unwrap();
        assert_eq!(back, CreditNoteStatus::Applied);
    }
}
