use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::PaycertError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Setup,
    Active,
    Inactive,
    FinalAccountIssued,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Setup => "SETUP",
            ProjectStatus::Active => "ACTIVE",
            ProjectStatus::Inactive => "INACTIVE",
            ProjectStatus::FinalAccountIssued => "FINAL_ACCOUNT_ISSUED",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = PaycertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SETUP" => Ok(ProjectStatus::Setup),
            "ACTIVE" => Ok(ProjectStatus::Active),
            "INACTIVE" => Ok(ProjectStatus::Inactive),
            "FINAL_ACCOUNT_ISSUED" => Ok(ProjectStatus::FinalAccountIssued),
            other => Err(PaycertError::Other(format!("Unknown project status: {other}"))),
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval state of a payment certificate. Only `Approved` certificates
/// count towards later certificates' progressive totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Draft => "DRAFT",
            CertificateStatus::Submitted => "SUBMITTED",
            CertificateStatus::Approved => "APPROVED",
            CertificateStatus::Rejected => "REJECTED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CertificateStatus::Draft => "Draft",
            CertificateStatus::Submitted => "Submitted",
            CertificateStatus::Approved => "Approved",
            CertificateStatus::Rejected => "Rejected",
        }
    }

    /// Approved is terminal. A rejected certificate may be reworked as a draft.
    pub fn can_transition_to(&self, next: CertificateStatus) -> bool {
        use CertificateStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Draft, Approved)
                | (Draft, Rejected)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Rejected, Draft)
        )
    }
}

impl FromStr for CertificateStatus {
    type Err = PaycertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(CertificateStatus::Draft),
            "SUBMITTED" => Ok(CertificateStatus::Submitted),
            "APPROVED" => Ok(CertificateStatus::Approved),
            "REJECTED" => Ok(CertificateStatus::Rejected),
            other => Err(PaycertError::Other(format!(
                "Unknown certificate status: {other}"
            ))),
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub status: ProjectStatus,
    pub final_payment_certificate_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Structure {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct LineItem {
    pub id: i64,
    pub project_id: i64,
    pub structure_id: i64,
    pub structure_name: String,
    pub row_index: i64,
    pub item_number: String,
    pub payment_reference: String,
    pub description: String,
    pub unit_measurement: String,
    pub unit_price: Decimal,
    pub budgeted_quantity: Decimal,
    pub total_price: Decimal,
    pub addendum: bool,
    pub special_item: bool,
}

#[derive(Debug, Clone)]
pub struct PaymentCertificate {
    pub id: i64,
    pub project_id: i64,
    pub certificate_number: i64,
    pub status: CertificateStatus,
    pub is_final: bool,
    pub notes: String,
    pub approved_on: Option<String>,
    pub approved_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct Payment {
    pub id: i64,
    pub project_id: i64,
    pub date: String,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_through_storage_strings() {
        for status in [
            CertificateStatus::Draft,
            CertificateStatus::Submitted,
            CertificateStatus::Approved,
            CertificateStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<CertificateStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<CertificateStatus>().is_err());
    }

    #[test]
    fn test_approved_is_terminal() {
        for next in [
            CertificateStatus::Draft,
            CertificateStatus::Submitted,
            CertificateStatus::Rejected,
        ] {
            assert!(!CertificateStatus::Approved.can_transition_to(next));
        }
    }

    #[test]
    fn test_rejected_can_be_reworked() {
        assert!(CertificateStatus::Rejected.can_transition_to(CertificateStatus::Draft));
        assert!(!CertificateStatus::Rejected.can_transition_to(CertificateStatus::Approved));
    }
}
