use crate::errors::AppError;
use crate::models::{GeoPoint, PropertyRecord};
use crate::registry_client::{AttributeQuery, NearbyQuery, RegistryClient};
use serde::{Deserialize, Serialize};

/// Attribute search input as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttributeCriteria {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub coordinates: Option<String>,
}

impl AttributeCriteria {
    /// Builds the remote query, rejecting criteria where every field is blank.
    pub fn to_query(&self) -> Result<AttributeQuery, AppError> {
        let query = AttributeQuery {
            street: non_blank(self.street.as_deref()),
            number: non_blank(self.number.as_deref()),
            coordinates: non_blank(self.coordinates.as_deref()),
        };
        if query == AttributeQuery::default() {
            return Err(AppError::Validation(
                "Enter at least a street, a number or coordinates to search".to_string(),
            ));
        }
        Ok(query)
    }
}

/// Validates proximity search input.
///
/// `reference` is the id of the record the radius is centered on; `radius`
/// must parse as a finite number. The remote store decides what a negative
/// radius means.
pub fn nearby_query(reference: &str, radius: &str) -> Result<NearbyQuery, AppError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(AppError::Validation(
            "Enter the number of the reference record".to_string(),
        ));
    }

    let radius: f64 = radius
        .trim()
        .parse()
        .ok()
        .filter(|r: &f64| r.is_finite())
        .ok_or_else(|| AppError::Validation("Radius must be a valid number".to_string()))?;

    Ok(NearbyQuery {
        reference: reference.to_string(),
        radius,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Smallest latitude/longitude box containing a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingRegion {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingRegion {
    /// `None` for an empty set of points.
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        points.into_iter().fold(None, |region, p| {
            Some(match region {
                None => BoundingRegion {
                    south: p.latitude,
                    west: p.longitude,
                    north: p.latitude,
                    east: p.longitude,
                },
                Some(r) => BoundingRegion {
                    south: r.south.min(p.latitude),
                    west: r.west.min(p.longitude),
                    north: r.north.max(p.latitude),
                    east: r.east.max(p.longitude),
                },
            })
        })
    }

    pub fn of_records(records: &[PropertyRecord]) -> Option<Self> {
        Self::from_points(records.iter().map(PropertyRecord::position))
    }
}

/// Result of a search. An empty result is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found {
        records: Vec<PropertyRecord>,
        bounds: BoundingRegion,
    },
    Empty,
}

impl SearchOutcome {
    fn from_records(records: Vec<PropertyRecord>) -> Self {
        match BoundingRegion::of_records(&records) {
            Some(bounds) => SearchOutcome::Found { records, bounds },
            None => SearchOutcome::Empty,
        }
    }

    pub fn records(&self) -> &[PropertyRecord] {
        match self {
            SearchOutcome::Found { records, .. } => records,
            SearchOutcome::Empty => &[],
        }
    }
}

/// Identifies one search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SearchToken(u64);

/// Hands out increasing search tokens and remembers the latest one.
///
/// Responses carrying an older token than the latest issued are stale: a newer
/// search was started after them and its result must not be overwritten.
#[derive(Debug, Default)]
pub struct SearchSequencer {
    latest: u64,
}

impl SearchSequencer {
    pub fn issue(&mut self) -> SearchToken {
        self.latest += 1;
        SearchToken(self.latest)
    }

    pub fn is_current(&self, token: SearchToken) -> bool {
        token.0 == self.latest
    }
}

/// Attribute and proximity search, both resolved by the remote store.
#[derive(Clone)]
pub struct SearchService {
    client: RegistryClient,
}

impl SearchService {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    /// Rejects blank criteria before any request is sent.
    pub async fn search_by_attributes(&self, criteria: &AttributeCriteria) -> Result<SearchOutcome, AppError> {
        let query = criteria.to_query()?;
        let records = self.client.search(&query).await?;
        tracing::info!("Attribute search returned {} records", records.len());
        Ok(SearchOutcome::from_records(records))
    }

    /// Rejects a blank reference or an invalid radius before any request is sent.
    pub async fn search_nearby(&self, reference: &str, radius: &str) -> Result<SearchOutcome, AppError> {
        let query = nearby_query(reference, radius)?;
        let records = self.client.search_nearby(&query).await?;
        tracing::info!(
            "Proximity search around {} returned {} records",
            query.reference,
            records.len()
        );
        Ok(SearchOutcome::from_records(records))
    }
}
