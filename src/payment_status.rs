//! Payment status classification.
//!
//! Two tiering schemes coexist: ratio tiering (share of installments paid) and
//! count tiering (number of installments paid). They are deliberately not
//! unified; count tiering only discriminates 1 to 4 paid installments and
//! puts every other count, including 5 or more, in the lowest tier.

use crate::models::PaymentRecord;
use serde::Serialize;

/// Discrete payment status category, shared by both tiering schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentTier {
    PaidFull,
    NearFull,
    Majority,
    Partial,
    Minor,
    None,
}

impl PaymentTier {
    /// Color token used by the rendering collaborator.
    pub fn color(self) -> &'static str {
        match self {
            PaymentTier::PaidFull => "#007bff",
            PaymentTier::NearFull => "#6f42c1",
            PaymentTier::Majority => "#9b59b6",
            PaymentTier::Partial => "#ff8c00",
            PaymentTier::Minor => "#ff6600",
            PaymentTier::None => "#ff0000",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioClassification {
    /// Paid installments over total installments, 0 for an empty history.
    pub ratio: f64,
    pub tier: PaymentTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountClassification {
    pub paid_count: usize,
    pub tier: PaymentTier,
}

pub fn paid_count(payments: &[PaymentRecord]) -> usize {
    payments.iter().filter(|p| p.paid).count()
}

pub fn paid_ratio(payments: &[PaymentRecord]) -> f64 {
    if payments.is_empty() {
        return 0.0;
    }
    paid_count(payments) as f64 / payments.len() as f64
}

/// At least one installment is still unpaid.
pub fn has_debt(payments: &[PaymentRecord]) -> bool {
    payments.iter().any(|p| !p.paid)
}

/// Every installment is paid. An empty history is not considered fully paid.
pub fn is_fully_paid(payments: &[PaymentRecord]) -> bool {
    !payments.is_empty() && payments.iter().all(|p| p.paid)
}

pub fn classify_ratio(payments: &[PaymentRecord]) -> RatioClassification {
    let ratio = paid_ratio(payments);
    let tier = if ratio == 1.0 {
        PaymentTier::PaidFull
    } else if ratio >= 0.8 {
        PaymentTier::NearFull
    } else if ratio >= 0.6 {
        PaymentTier::Majority
    } else if ratio >= 0.4 {
        PaymentTier::Partial
    } else if ratio >= 0.2 {
        PaymentTier::Minor
    } else {
        PaymentTier::None
    };
    RatioClassification { ratio, tier }
}

pub fn classify_count(payments: &[PaymentRecord]) -> CountClassification {
    let paid_count = paid_count(payments);
    let tier = match paid_count {
        4 => PaymentTier::NearFull,
        3 => PaymentTier::Majority,
        2 => PaymentTier::Partial,
        1 => PaymentTier::Minor,
        _ => PaymentTier::None,
    };
    CountClassification { paid_count, tier }
}
