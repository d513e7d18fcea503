use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============ Registry Models ============
//
// Field names on the wire follow the remote store contract (`propietario`,
// `direccion`, `pagos`, ...). Optional or `null` fields decode to typed
// defaults so the rest of the crate never sees a half-populated record.

/// One yearly tax installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Fiscal year of the installment.
    #[serde(rename = "anio", default, deserialize_with = "null_as_default")]
    pub year: i32,
    /// Whether the installment has been paid.
    #[serde(rename = "pagado", default, deserialize_with = "null_as_default")]
    pub paid: bool,
    /// Amount due for the installment.
    #[serde(rename = "monto", default, deserialize_with = "null_as_default")]
    pub amount: f64,
}

/// Postal address of a property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Street name.
    #[serde(rename = "calle", default, deserialize_with = "null_as_default")]
    pub street: String,
    /// House number. Blank numbers are stored as `None`.
    #[serde(rename = "numero", default, deserialize_with = "house_number")]
    pub number: Option<String>,
    /// Neighborhood.
    #[serde(rename = "barrio", default, deserialize_with = "null_as_default")]
    pub neighborhood: String,
    /// District.
    #[serde(rename = "distrito", default, deserialize_with = "null_as_default")]
    pub district: String,
}

/// Everything about a property except its remote identity.
///
/// A record that has not been created remotely yet (a draft) is sent to the
/// store in exactly this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDetails {
    /// Name of the owner.
    #[serde(rename = "propietario", default, deserialize_with = "null_as_default")]
    pub owner: String,
    /// Postal address.
    #[serde(rename = "direccion", default, deserialize_with = "address")]
    pub address: Address,
    /// Latitude in degrees.
    #[serde(rename = "latitud")]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(rename = "longitud")]
    pub longitude: f64,
    /// Assessed (cadastral) value.
    #[serde(rename = "valor_catastral", default, deserialize_with = "null_as_default")]
    pub assessed_value: f64,
    /// Annual tax due.
    #[serde(rename = "impuesto_anual", default, deserialize_with = "null_as_default")]
    pub annual_tax: f64,
    /// Installments, one per configured year in ascending order.
    #[serde(rename = "pagos", default, deserialize_with = "null_as_default")]
    pub payments: Vec<PaymentRecord>,
}

/// A property confirmed by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Identifier assigned by the remote store.
    pub id: i64,
    /// Display name, `casa <id>` for records created through this crate.
    #[serde(rename = "nombre", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(flatten)]
    pub details: PropertyDetails,
}

impl PropertyRecord {
    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.details.latitude,
            longitude: self.details.longitude,
        }
    }

    pub fn owner(&self) -> &str {
        &self.details.owner
    }

    pub fn street(&self) -> &str {
        &self.details.address.street
    }

    pub fn payments(&self) -> &[PaymentRecord] {
        &self.details.payments
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Decodes a list of raw records, skipping entries that fail schema validation.
///
/// A record without an `id` or without coordinates cannot be placed in the
/// registry; it is logged and dropped instead of failing the whole batch.
pub fn decode_records(values: Vec<Value>) -> Vec<PropertyRecord> {
    let total = values.len();
    let records: Vec<PropertyRecord> = values
        .into_iter()
        .enumerate()
        .filter_map(
            |(index, value)| match serde_json::from_value::<PropertyRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed record at index {}: {}", index, e);
                    None
                }
            },
        )
        .collect();

    if records.len() != total {
        tracing::warn!("Decoded {} of {} records", records.len(), total);
    }
    records
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn house_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "house number must be a string or a number, got {}",
            other
        ))),
    }
}

/// Older records store the address as a bare street string.
#[derive(Deserialize)]
#[serde(untagged)]
enum AddressPayload {
    Structured(Address),
    Street(String),
}

fn address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<AddressPayload>::deserialize(deserializer)? {
        Some(AddressPayload::Structured(address)) => address,
        Some(AddressPayload::Street(street)) => Address {
            street,
            ..Address::default()
        },
        None => Address::default(),
    })
}
