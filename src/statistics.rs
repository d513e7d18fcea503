//! Reporting aggregates consumed by the chart collaborator.

use crate::models::PropertyRecord;
use crate::payment_status::{is_fully_paid, paid_count};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Street label for records without a street.
pub const UNKNOWN_STREET: &str = "unknown";

/// Number of histogram buckets: exact paid counts 0 through 5.
pub const HISTOGRAM_BUCKETS: usize = 6;

const BUCKET_COLORS: [&str; HISTOGRAM_BUCKETS] =
    ["#ff0000", "#ff6600", "#ff8c00", "#9b59b6", "#6f42c1", "#007bff"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierHistogram {
    /// `buckets[n]` counts records with exactly `n` paid installments.
    pub buckets: [usize; HISTOGRAM_BUCKETS],
    /// Records with more paid installments than the last bucket.
    pub beyond_range: usize,
    /// Chart color of each bucket.
    pub colors: [&'static str; HISTOGRAM_BUCKETS],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreetTally {
    pub street: String,
    pub paid: usize,
    pub unpaid: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub total: usize,
    pub fully_paid: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub generated_at: DateTime<Utc>,
    pub overview: Overview,
    pub histogram: TierHistogram,
    pub streets: Vec<StreetTally>,
}

pub fn compute_tier_histogram(records: &[PropertyRecord]) -> TierHistogram {
    let mut histogram = TierHistogram {
        buckets: [0; HISTOGRAM_BUCKETS],
        beyond_range: 0,
        colors: BUCKET_COLORS,
    };
    for record in records {
        match histogram.buckets.get_mut(paid_count(record.payments())) {
            Some(bucket) => *bucket += 1,
            None => histogram.beyond_range += 1,
        }
    }
    histogram
}

/// Paid/unpaid counts per street, in order of first appearance.
///
/// A record counts as paid when at least one of its installments is paid.
pub fn compute_street_breakdown(records: &[PropertyRecord]) -> Vec<StreetTally> {
    let mut tallies: Vec<StreetTally> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let street = match record.street().trim() {
            "" => UNKNOWN_STREET.to_string(),
            s => s.to_string(),
        };
        let slot = *index.entry(street.clone()).or_insert_with(|| {
            tallies.push(StreetTally {
                street,
                paid: 0,
                unpaid: 0,
            });
            tallies.len() - 1
        });

        if record.payments().iter().any(|p| p.paid) {
            tallies[slot].paid += 1;
        } else {
            tallies[slot].unpaid += 1;
        }
    }
    tallies
}

pub fn compute_overview(records: &[PropertyRecord]) -> Overview {
    let total = records.len();
    let fully_paid = records
        .iter()
        .filter(|r| is_fully_paid(r.payments()))
        .count();
    Overview {
        total,
        fully_paid,
        pending: total - fully_paid,
    }
}

pub fn compute_report(records: &[PropertyRecord]) -> StatisticsReport {
    StatisticsReport {
        generated_at: Utc::now(),
        overview: compute_overview(records),
        histogram: compute_tier_histogram(records),
        streets: compute_street_breakdown(records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, PaymentRecord, PropertyDetails};

    fn record(id: i64, street: &str, paid: &[bool]) -> PropertyRecord {
        PropertyRecord {
            id,
            name: String::new(),
            details: PropertyDetails {
                owner: String::new(),
                address: Address {
                    street: street.to_string(),
                    ..Address::default()
                },
                latitude: 0.0,
                longitude: 0.0,
                assessed_value: 0.0,
                annual_tax: 0.0,
                payments: paid
                    .iter()
                    .map(|&paid| PaymentRecord {
                        year: 2020,
                        paid,
                        amount: 0.0,
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_street_breakdown_uses_any_paid() {
        let records = vec![record(1, "A", &[true, false]), record(2, "A", &[false])];
        let streets = compute_street_breakdown(&records);
        assert_eq!(
            streets,
            vec![StreetTally {
                street: "A".to_string(),
                paid: 1,
                unpaid: 1
            }]
        );
    }

    #[test]
    fn test_street_breakdown_order_and_unknown() {
        let records = vec![
            record(1, "B", &[false]),
            record(2, "", &[true]),
            record(3, "A", &[]),
            record(4, "B", &[true]),
            record(5, "  ", &[false]),
        ];
        let streets = compute_street_breakdown(&records);
        let names: Vec<&str> = streets.iter().map(|s| s.street.as_str()).collect();
        assert_eq!(names, vec!["B", UNKNOWN_STREET, "A"]);
        assert_eq!((streets[0].paid, streets[0].unpaid), (1, 1));
        assert_eq!((streets[1].paid, streets[1].unpaid), (1, 1));
        assert_eq!((streets[2].paid, streets[2].unpaid), (0, 1));
    }

    #[test]
    fn test_histogram_counts_exact_paid() {
        let records = vec![
            record(1, "A", &[]),
            record(2, "A", &[false, false]),
            record(3, "A", &[true, true, true, true, true, false]),
            record(4, "A", &[true, true, true, true, false, false]),
            record(5, "A", &[true; 6]),
        ];
        let histogram = compute_tier_histogram(&records);
        assert_eq!(histogram.buckets, [2, 0, 0, 0, 1, 1]);
        assert_eq!(histogram.beyond_range, 1);
    }

    #[test]
    fn test_overview_counts_fully_paid() {
        let records = vec![
            record(1, "A", &[true, true]),
            record(2, "A", &[true, false]),
            record(3, "A", &[]),
        ];
        let overview = compute_overview(&records);
        assert_eq!(overview, Overview { total: 3, fully_paid: 1, pending: 2 });
    }

    #[test]
    fn test_bucket_colors_are_reported() {
        let histogram = compute_tier_histogram(&[]);
        assert_eq!(histogram.colors[0], "#ff0000");
        assert_eq!(histogram.colors[5], "#007bff");

        let report = serde_json::to_value(compute_report(&[])).unwrap();
        assert_eq!(report["histogram"]["colors"][3], "#9b59b6");
    }
}
