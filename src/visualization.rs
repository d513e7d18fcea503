//! Marker production for the map.
//!
//! A render is a pure function of the record snapshot and the requested mode.
//! The rendering collaborator clears every marker it shows before applying a
//! new [`MarkerSet`]; sets are never diffed.

use crate::models::{GeoPoint, PropertyRecord};
use crate::payment_status::{classify_count, classify_ratio, has_debt, is_fully_paid, PaymentTier};
use crate::popup::PopupContent;
use crate::search::BoundingRegion;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationMode {
    Normal,
    RatioColor,
    DebtOnly,
    PaidOnly,
    SearchResult,
}

/// The single control that alternates between `Normal` and `RatioColor`.
///
/// Only [`ColorToggle::activate`] moves it; one-shot views (debt, paid,
/// search) leave it where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorToggle {
    next: VisualizationMode,
}

impl Default for ColorToggle {
    fn default() -> Self {
        Self {
            next: VisualizationMode::Normal,
        }
    }
}

impl ColorToggle {
    /// Returns the mode to render now and flips for the next activation.
    pub fn activate(&mut self) -> VisualizationMode {
        let mode = self.next;
        self.next = match mode {
            VisualizationMode::Normal => VisualizationMode::RatioColor,
            _ => VisualizationMode::Normal,
        };
        mode
    }

    /// Mode the next activation will render.
    pub fn peek(&self) -> VisualizationMode {
        self.next
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerIcon {
    /// The map library's stock pin.
    Default,
    /// A filled circle in a tier color.
    Dot { tier: PaymentTier, color: String },
}

impl MarkerIcon {
    fn dot(tier: PaymentTier) -> Self {
        MarkerIcon::Dot {
            tier,
            color: tier.color().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub record_id: i64,
    pub position: GeoPoint,
    pub icon: MarkerIcon,
    pub popup: PopupContent,
    pub popup_html: String,
}

/// Request to fit the map viewport to a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitRequest {
    pub bounds: BoundingRegion,
    pub padding: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSet {
    /// `None` when every marker is hidden.
    pub mode: Option<VisualizationMode>,
    pub markers: Vec<MarkerSpec>,
    pub fit: Option<FitRequest>,
    /// SHA-256 of the set's content, hex encoded.
    pub fingerprint: String,
}

impl MarkerSet {
    fn new(mode: Option<VisualizationMode>, markers: Vec<MarkerSpec>, fit: Option<FitRequest>) -> Self {
        let fingerprint = fingerprint(mode, &markers, fit.as_ref());
        Self {
            mode,
            markers,
            fit,
            fingerprint,
        }
    }

    /// An empty set; applying it clears the map.
    pub fn hidden() -> Self {
        Self::new(None, Vec::new(), None)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn record_ids(&self) -> Vec<i64> {
        self.markers.iter().map(|m| m.record_id).collect()
    }
}

fn fingerprint(mode: Option<VisualizationMode>, markers: &[MarkerSpec], fit: Option<&FitRequest>) -> String {
    let serialized = serde_json::to_vec(&(mode, markers, fit)).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&serialized);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy)]
pub struct VisualizationEngine {
    fit_padding: u32,
}

impl VisualizationEngine {
    pub fn new(fit_padding: u32) -> Self {
        Self { fit_padding }
    }

    /// Produces the marker set for `mode`.
    ///
    /// `search_results` is only read in `SearchResult` mode; with no search on
    /// record that mode renders nothing.
    pub fn produce_markers(
        &self,
        mode: VisualizationMode,
        records: &[PropertyRecord],
        search_results: Option<&[PropertyRecord]>,
    ) -> MarkerSet {
        let markers: Vec<MarkerSpec> = match mode {
            VisualizationMode::Normal => records
                .iter()
                .map(|r| marker(r, MarkerIcon::Default))
                .collect(),
            VisualizationMode::RatioColor => records
                .iter()
                .map(|r| marker(r, MarkerIcon::dot(classify_ratio(r.payments()).tier)))
                .collect(),
            VisualizationMode::DebtOnly => records
                .iter()
                .filter(|r| has_debt(r.payments()))
                .map(|r| marker(r, MarkerIcon::dot(classify_count(r.payments()).tier)))
                .collect(),
            VisualizationMode::PaidOnly => records
                .iter()
                .filter(|r| is_fully_paid(r.payments()))
                .map(|r| marker(r, MarkerIcon::dot(PaymentTier::PaidFull)))
                .collect(),
            VisualizationMode::SearchResult => search_results
                .unwrap_or_default()
                .iter()
                .map(|r| marker(r, MarkerIcon::Default))
                .collect(),
        };

        let fit = match mode {
            VisualizationMode::SearchResult => {
                BoundingRegion::from_points(markers.iter().map(|m| m.position)).map(|bounds| FitRequest {
                    bounds,
                    padding: self.fit_padding,
                })
            }
            _ => None,
        };

        tracing::debug!("Rendered {} markers in {:?} mode", markers.len(), mode);
        MarkerSet::new(Some(mode), markers, fit)
    }
}

fn marker(record: &PropertyRecord, icon: MarkerIcon) -> MarkerSpec {
    let popup = PopupContent::for_record(record);
    let popup_html = popup.to_html();
    MarkerSpec {
        record_id: record.id,
        position: record.position(),
        icon,
        popup,
        popup_html,
    }
}
