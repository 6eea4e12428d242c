//! Computation graph submitted to the earth-observation service.
//!
//! A [`Query`] is assembled locally as plain data and handed to a
//! [`Reos`](crate::reos::Reos) implementation in one call. Nothing is
//! evaluated while the graph is being built.

use chrono::{DateTime, NaiveDate, Utc};
use fieldcheck_core::Geometry;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Image expressions
// ---------------------------------------------------------------------------

/// Per-scene image expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Image {
    /// A single band of a catalog scene.
    Band { scene: String, band: String },
    /// `(a - b) / (a + b)`
    NormalizedDifference { a: Box<Image>, b: Box<Image> },
    /// `1` where all listed bits of `source` are unset, `0` otherwise.
    BitsClear { source: Box<Image>, bits: Vec<u8> },
    /// `image` with every pixel hidden where `mask` is zero.
    UpdateMask { image: Box<Image>, mask: Box<Image> },
}

impl Image {
    pub fn band(scene: impl Into<String>, band: impl Into<String>) -> Self {
        Image::Band {
            scene: scene.into(),
            band: band.into(),
        }
    }

    pub fn normalized_difference(self, other: Image) -> Self {
        Image::NormalizedDifference {
            a: Box::new(self),
            b: Box::new(other),
        }
    }

    pub fn bits_clear(self, bits: &[u8]) -> Self {
        Image::BitsClear {
            source: Box::new(self),
            bits: bits.to_vec(),
        }
    }

    pub fn update_mask(self, mask: Image) -> Self {
        Image::UpdateMask {
            image: Box::new(self),
            mask: Box::new(mask),
        }
    }
}

/// Spatial reducer applied over a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reducer {
    Mean,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// A complete request, evaluated in a single round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Query {
    /// Area of `region` in square meters.
    Area { region: Geometry },
    /// Reduce each image over `region`, sampling every `scale` meters.
    ReduceRegion {
        region: Geometry,
        reducer: Reducer,
        scale: f64,
        images: Vec<Image>,
    },
}

/// Result of evaluating a [`Query`], shaped after the query kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum QueryOutput {
    Area(f64),
    /// One entry per image, in query order; `None` when no pixel was valid.
    ReduceRegion(Vec<Option<f64>>),
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Half-open calendar range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether `instant` falls on or after `start` and before `end` (UTC).
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        let day = instant.date_naive();
        day >= self.start && day < self.end
    }
}

/// Catalog filter: scenes of `collection` intersecting `bounds`, captured in
/// `date_range`, whose `cloud_property` metadata is below `cloud_cover_max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFilter {
    pub collection: String,
    pub bounds: Geometry,
    pub date_range: DateRange,
    pub cloud_property: String,
    pub cloud_cover_max: f64,
}

/// Catalog metadata for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneInfo {
    pub id: String,
    /// Native capture instant
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,
    /// Names of the bands available for this scene
    pub bands: Vec<String>,
}

impl SceneInfo {
    pub fn has_band(&self, name: &str) -> bool {
        self.bands.iter().any(|b| b == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fieldcheck_core::vector::parse_geometry;

    #[test]
    fn test_image_graph_wire_shape() {
        let ndvi = Image::band("S2A_1", "B8").normalized_difference(Image::band("S2A_1", "B4"));
        let masked = ndvi.update_mask(Image::band("S2A_1", "QA60").bits_clear(&[10, 11]));

        let json = serde_json::to_value(&masked).unwrap();
        assert_eq!(json["op"], "updateMask");
        assert_eq!(json["image"]["op"], "normalizedDifference");
        assert_eq!(json["image"]["a"]["band"], "B8");
        assert_eq!(json["mask"]["op"], "bitsClear");
        assert_eq!(json["mask"]["bits"], serde_json::json!([10, 11]));
    }

    #[test]
    fn test_query_wire_shape() {
        let region = parse_geometry("[[[0,0],[10,0],[10,10],[0,0]]]").unwrap();
        let query = Query::ReduceRegion {
            region,
            reducer: Reducer::Mean,
            scale: 10.0,
            images: vec![Image::band("a", "B8")],
        };

        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["kind"], "reduceRegion");
        assert_eq!(json["reducer"], "mean");
        assert_eq!(json["region"]["type"], "Polygon");

        let output: QueryOutput =
            serde_json::from_str(r#"{"kind": "reduceRegion", "value": [0.5, null]}"#).unwrap();
        assert_eq!(output, QueryOutput::ReduceRegion(vec![Some(0.5), None]));
    }

    #[test]
    fn test_date_range_is_half_open() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2099, 5, 1).unwrap(),
        );
        assert!(range.contains(&Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap()));
        assert!(range.contains(&Utc.with_ymd_and_hms(2099, 4, 30, 23, 59, 59).unwrap()));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2099, 5, 1, 0, 0, 0).unwrap()));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2014, 12, 31, 12, 0, 0).unwrap()));
    }

    #[test]
    fn test_scene_info_bands() {
        let info: SceneInfo = serde_json::from_str(
            r#"{"id": "x", "timestamp": "2023-06-01T10:56:19Z", "bands": ["B4", "B8"]}"#,
        )
        .unwrap();
        assert!(info.has_band("B8"));
        assert!(!info.has_band("QA60"));
        assert_eq!(info.cloud_cover, None);
    }
}
