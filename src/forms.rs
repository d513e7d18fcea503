//! User-submitted form values and their conversion into records.
//!
//! Drafts get one installment per configured year, each due the annual tax.
//! Edits are reconciled positionally against the record being edited.

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{Address, GeoPoint, PaymentRecord, PropertyDetails, PropertyRecord};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Values entered when adding a record, either from a map click or by typing
/// coordinates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftForm {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub owner: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub assessed_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub annual_tax: Option<f64>,
    /// Years whose installment is already paid.
    #[serde(default)]
    pub paid_years: Vec<i32>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Free text `"lat, lon"`, used when no separate values are given.
    #[serde(default)]
    pub coordinates: Option<String>,
}

/// Settings a draft is completed with.
#[derive(Debug, Clone)]
pub struct DraftDefaults {
    pub payment_years: Vec<i32>,
    pub neighborhood: String,
    pub district: String,
}

impl From<&Config> for DraftDefaults {
    fn from(config: &Config) -> Self {
        Self {
            payment_years: config.payment_years.clone(),
            neighborhood: config.default_neighborhood.clone(),
            district: config.default_district.clone(),
        }
    }
}

/// One installment row of the edit form, matched to the record by position.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentEdit {
    #[serde(default)]
    pub paid: Option<bool>,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Values submitted from the edit form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub owner: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub assessed_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub annual_tax: Option<f64>,
    #[serde(default)]
    pub payments: Vec<PaymentEdit>,
}

/// Parses `"lat, lon"` (comma, semicolon or whitespace separated).
pub fn parse_coordinates(text: &str) -> Result<GeoPoint, AppError> {
    let pattern = Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*[,;\s]\s*(-?\d+(?:\.\d+)?)\s*$")
        .map_err(|e| AppError::Internal(format!("Invalid coordinate pattern: {}", e)))?;

    let invalid = || AppError::Validation(format!("Enter valid coordinates, got '{}'", text.trim()));
    let caps = pattern.captures(text).ok_or_else(invalid)?;
    let latitude: f64 = caps[1].parse().map_err(|_| invalid())?;
    let longitude: f64 = caps[2].parse().map_err(|_| invalid())?;
    check_position(latitude, longitude)
}

fn check_position(latitude: f64, longitude: f64) -> Result<GeoPoint, AppError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::Validation(format!("Latitude out of range: {}", latitude)));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Validation(format!("Longitude out of range: {}", longitude)));
    }
    Ok(GeoPoint { latitude, longitude })
}

fn blank_to_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Numbers typed into a form; anything that does not read as a finite number
/// is treated as missing.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn numeric_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Builds the draft sent to the remote store for a new record.
pub fn build_draft(form: &DraftForm, defaults: &DraftDefaults) -> Result<PropertyDetails, AppError> {
    let position = match (form.latitude, form.longitude, form.coordinates.as_deref()) {
        (Some(latitude), Some(longitude), _) => check_position(latitude, longitude)?,
        (_, _, Some(text)) if !text.trim().is_empty() => parse_coordinates(text)?,
        _ => {
            return Err(AppError::Validation(
                "Enter valid coordinates for the new record".to_string(),
            ))
        }
    };

    for year in &form.paid_years {
        if !defaults.payment_years.contains(year) {
            tracing::warn!("Ignoring paid year {} outside the configured years", year);
        }
    }

    let annual_tax = numeric_or_zero(form.annual_tax);
    let payments = defaults
        .payment_years
        .iter()
        .map(|&year| PaymentRecord {
            year,
            paid: form.paid_years.contains(&year),
            amount: annual_tax,
        })
        .collect();

    Ok(PropertyDetails {
        owner: form.owner.trim().to_string(),
        address: Address {
            street: form.street.trim().to_string(),
            number: blank_to_none(form.number.as_deref()),
            neighborhood: defaults.neighborhood.clone(),
            district: defaults.district.clone(),
        },
        latitude: position.latitude,
        longitude: position.longitude,
        assessed_value: numeric_or_zero(form.assessed_value),
        annual_tax,
        payments,
    })
}

/// Rebuilds installments from edit rows.
///
/// With a reference history, rows are matched by index: years always come from
/// the reference and a row that leaves a value out keeps the reference value.
/// Without one, rows are taken in order with year 0.
pub fn reconcile_payments(reference: &[PaymentRecord], edits: &[PaymentEdit]) -> Vec<PaymentRecord> {
    if reference.is_empty() {
        return edits
            .iter()
            .map(|edit| PaymentRecord {
                year: 0,
                paid: edit.paid.unwrap_or(false),
                amount: edit.amount.unwrap_or(0.0),
            })
            .collect();
    }

    reference
        .iter()
        .enumerate()
        .map(|(index, original)| {
            let edit = edits.get(index);
            PaymentRecord {
                year: original.year,
                paid: edit.and_then(|e| e.paid).unwrap_or(original.paid),
                amount: edit.and_then(|e| e.amount).unwrap_or(original.amount),
            }
        })
        .collect()
}

/// Produces the full replacement record for an edit of `reference`.
pub fn apply_edit(reference: &PropertyRecord, form: &EditForm) -> Result<PropertyRecord, AppError> {
    let latitude = form.latitude.unwrap_or(reference.details.latitude);
    let longitude = form.longitude.unwrap_or(reference.details.longitude);
    let position = check_position(latitude, longitude)?;

    // a name left out of the form keeps the current one; anything sent is taken as is
    let name = form.name.clone().unwrap_or_else(|| reference.name.clone());

    Ok(PropertyRecord {
        id: reference.id,
        name,
        details: PropertyDetails {
            owner: form.owner.trim().to_string(),
            address: Address {
                street: form.street.trim().to_string(),
                number: blank_to_none(form.number.as_deref()),
                neighborhood: form.neighborhood.trim().to_string(),
                district: form.district.trim().to_string(),
            },
            latitude: position.latitude,
            longitude: position.longitude,
            assessed_value: numeric_or_zero(form.assessed_value),
            annual_tax: numeric_or_zero(form.annual_tax),
            payments: reconcile_payments(reference.payments(), &form.payments),
        },
    })
}
