//! Progressive payment-certificate totals.
//!
//! Everything here is a pure function of a [`ProjectLedger`] snapshot: the
//! certificates of one project and the claim lines captured against them.
//! Nothing is cached and nothing is rounded; callers round at presentation.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::error::{PaycertError, Result};
use crate::fmt::{checked_add, checked_sum, round_money};
use crate::models::CertificateStatus;

/// Which part of the contract a claim line was captured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Contract,
    Addendum,
    Special,
}

impl LineKind {
    /// Special items take precedence over the addendum flag.
    pub fn from_flags(addendum: bool, special_item: bool) -> Self {
        if special_item {
            LineKind::Special
        } else if addendum {
            LineKind::Addendum
        } else {
            LineKind::Contract
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRef {
    pub id: i64,
    pub project_id: Option<i64>,
    pub certificate_number: i64,
    pub status: CertificateStatus,
}

#[derive(Debug, Clone)]
pub struct ClaimLine {
    pub certificate_id: i64,
    pub amount: Decimal,
    pub kind: LineKind,
    pub approved: bool,
    pub claimed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressiveTotals {
    pub previous: Decimal,
    pub current: Decimal,
    pub to_date: Decimal,
}

impl ProgressiveTotals {
    fn new(previous: Decimal, current: Decimal) -> Result<Self> {
        Ok(Self {
            previous,
            current,
            to_date: checked_add(previous, current)?,
        })
    }

    fn plus(self, other: ProgressiveTotals) -> Result<Self> {
        Self::new(
            checked_add(self.previous, other.previous)?,
            checked_add(self.current, other.current)?,
        )
    }
}

#[derive(Debug, Clone)]
pub struct ProjectLedger {
    project_id: i64,
    certificates: Vec<CertificateRef>,
    lines: Vec<ClaimLine>,
}

impl ProjectLedger {
    pub fn new(project_id: i64, mut certificates: Vec<CertificateRef>, lines: Vec<ClaimLine>) -> Self {
        certificates.sort_by_key(|c| c.certificate_number);
        Self {
            project_id,
            certificates,
            lines,
        }
    }

    /// Certificates in certificate-number order.
    #[cfg(test)]
    pub fn certificates(&self) -> &[CertificateRef] {
        &self.certificates
    }

    pub fn certificate(&self, number: i64) -> Option<&CertificateRef> {
        self.certificates
            .iter()
            .find(|c| c.certificate_number == number && c.project_id == Some(self.project_id))
    }

    /// `Ok(false)` for a certificate with no project: it has no totals.
    fn in_scope(&self, cert: &CertificateRef) -> Result<bool> {
        match cert.project_id {
            None => Ok(false),
            Some(p) if p == self.project_id => Ok(true),
            Some(p) => Err(PaycertError::ScopeViolation {
                certificate_number: cert.certificate_number,
                expected: self.project_id,
                actual: p,
            }),
        }
    }

    fn previous_ids(&self, cert: &CertificateRef) -> HashSet<i64> {
        self.certificates
            .iter()
            .filter(|c| {
                c.project_id == Some(self.project_id)
                    && c.status == CertificateStatus::Approved
                    && c.certificate_number < cert.certificate_number
            })
            .map(|c| c.id)
            .collect()
    }

    fn sum_lines(&self, pred: impl Fn(&ClaimLine) -> bool) -> Result<Decimal> {
        checked_sum(self.lines.iter().filter(|l| pred(l)).map(|l| l.amount))
    }

    fn previous_where(&self, cert: &CertificateRef, pred: impl Fn(&ClaimLine) -> bool) -> Result<Decimal> {
        if !self.in_scope(cert)? {
            return Ok(Decimal::ZERO);
        }
        let ids = self.previous_ids(cert);
        self.sum_lines(|l| ids.contains(&l.certificate_id) && pred(l))
    }

    fn current_where(&self, cert: &CertificateRef, pred: impl Fn(&ClaimLine) -> bool) -> Result<Decimal> {
        if !self.in_scope(cert)? {
            return Ok(Decimal::ZERO);
        }
        self.sum_lines(|l| l.certificate_id == cert.id && pred(l))
    }

    /// Sum of every claim on approved certificates of this project numbered
    /// below `cert`.
    pub fn progressive_previous(&self, cert: &CertificateRef) -> Result<Decimal> {
        self.previous_where(cert, |_| true)
    }

    /// Sum of every claim on `cert` itself, whatever its status.
    pub fn current_claim_total(&self, cert: &CertificateRef) -> Result<Decimal> {
        self.current_where(cert, |_| true)
    }

    pub fn progressive_to_date(&self, cert: &CertificateRef) -> Result<Decimal> {
        checked_add(self.progressive_previous(cert)?, self.current_claim_total(cert)?)
    }

    pub fn totals(&self, cert: &CertificateRef) -> Result<ProgressiveTotals> {
        ProgressiveTotals::new(self.progressive_previous(cert)?, self.current_claim_total(cert)?)
    }

    pub fn totals_for(&self, cert: &CertificateRef, kind: LineKind) -> Result<ProgressiveTotals> {
        ProgressiveTotals::new(
            self.previous_where(cert, |l| l.kind == kind)?,
            self.current_where(cert, |l| l.kind == kind)?,
        )
    }

    pub fn contract_totals(&self, cert: &CertificateRef) -> Result<ProgressiveTotals> {
        self.totals_for(cert, LineKind::Contract)
    }

    pub fn addendum_totals(&self, cert: &CertificateRef) -> Result<ProgressiveTotals> {
        self.totals_for(cert, LineKind::Addendum)
    }

    pub fn special_totals(&self, cert: &CertificateRef) -> Result<ProgressiveTotals> {
        self.totals_for(cert, LineKind::Special)
    }

    /// Contract plus addendum work; special items are reported separately.
    pub fn work_totals(&self, cert: &CertificateRef) -> Result<ProgressiveTotals> {
        self.contract_totals(cert)?.plus(self.addendum_totals(cert)?)
    }

    pub fn items_submitted(&self, cert: &CertificateRef) -> Result<Decimal> {
        self.current_where(cert, |l| l.approved)
    }

    pub fn items_claimed(&self, cert: &CertificateRef) -> Result<Decimal> {
        self.current_where(cert, |l| l.claimed)
    }

    /// Everything certified on approved certificates of the project.
    pub fn certified_to_date(&self) -> Result<Decimal> {
        let ids: HashSet<i64> = self
            .certificates
            .iter()
            .filter(|c| {
                c.project_id == Some(self.project_id) && c.status == CertificateStatus::Approved
            })
            .map(|c| c.id)
            .collect();
        self.sum_lines(|l| ids.contains(&l.certificate_id))
    }
}

/// Share of the contract value certified so far, as a percentage to 2 places.
pub fn certified_percentage(certified: Decimal, contract_value: Decimal) -> Result<Decimal> {
    if contract_value.is_zero() {
        return Ok(Decimal::ZERO);
    }
    certified
        .checked_div(contract_value)
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
        .map(round_money)
        .ok_or_else(|| {
            PaycertError::InvalidAmount(format!("{certified} of {contract_value} is out of range"))
        })
}
