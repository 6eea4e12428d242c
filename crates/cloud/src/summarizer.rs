//! Scene summarizer: per-scene vegetation index means over a polygon.
//!
//! The catalog is queried once for matching scenes, then all per-scene
//! reductions are sent as a single batched query. Whether a scene is
//! cloud-masked is decided here, before the query is built, from the bands
//! the catalog reports.

use chrono::NaiveDate;
use fieldcheck_algorithms::imagery::SceneSummary;
use fieldcheck_core::Geometry;
use tracing::{debug, info, warn};

use crate::error::{CloudError, Result};
use crate::query::{DateRange, Image, Query, QueryOutput, Reducer, SceneFilter, SceneInfo};
use crate::reos::Reos;

/// Bit of the Sentinel-2 `QA60` band flagging opaque clouds.
pub const CLOUD_BIT: u8 = 10;
/// Bit of the Sentinel-2 `QA60` band flagging cirrus.
pub const CIRRUS_BIT: u8 = 11;

/// Catalog filter and index definition used by [`fetch_summaries`].
#[derive(Debug, Clone)]
pub struct SummaryParams {
    pub collection: String,
    pub date_range: DateRange,
    /// Scene metadata property holding the cloudy pixel percentage
    pub cloud_property: String,
    /// Scenes must be strictly below this cloud cover
    pub cloud_cover_max: f64,
    pub nir_band: String,
    pub red_band: String,
    /// Bit-packed quality band used for the clear-sky mask, when present
    pub quality_band: String,
    pub quality_bits: Vec<u8>,
    /// Sampling spacing of the spatial mean, in meters
    pub scale: f64,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            collection: "COPERNICUS/S2".to_string(),
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
                NaiveDate::from_ymd_opt(2099, 5, 1).unwrap_or(NaiveDate::MAX),
            ),
            cloud_property: "CLOUDY_PIXEL_PERCENTAGE".to_string(),
            cloud_cover_max: 15.0,
            nir_band: "B8".to_string(),
            red_band: "B4".to_string(),
            quality_band: "QA60".to_string(),
            quality_bits: vec![CLOUD_BIT, CIRRUS_BIT],
            scale: 10.0,
        }
    }
}

impl SummaryParams {
    /// Catalog filter for scenes over `geom`.
    pub fn filter(&self, geom: &Geometry) -> SceneFilter {
        SceneFilter {
            collection: self.collection.clone(),
            bounds: geom.clone(),
            date_range: self.date_range,
            cloud_property: self.cloud_property.clone(),
            cloud_cover_max: self.cloud_cover_max,
        }
    }
}

/// Masking decision for one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneMask {
    /// Keep pixels whose `band` has none of `bits` set.
    Masked { band: String, bits: Vec<u8> },
    /// The scene has no quality band; its pixels are used as-is.
    Unmasked,
}

impl SceneMask {
    /// Masked when the scene carries the quality band, unmasked otherwise.
    pub fn for_scene(scene: &SceneInfo, params: &SummaryParams) -> Self {
        if scene.has_band(&params.quality_band) {
            SceneMask::Masked {
                band: params.quality_band.clone(),
                bits: params.quality_bits.clone(),
            }
        } else {
            SceneMask::Unmasked
        }
    }

    pub fn is_masked(&self) -> bool {
        matches!(self, SceneMask::Masked { .. })
    }
}

/// Vegetation index expression for one scene, with its mask applied.
pub fn index_image(scene: &SceneInfo, mask: &SceneMask, params: &SummaryParams) -> Image {
    let index = Image::band(&scene.id, &params.nir_band)
        .normalized_difference(Image::band(&scene.id, &params.red_band));

    match mask {
        SceneMask::Masked { band, bits } => {
            index.update_mask(Image::band(&scene.id, band).bits_clear(bits))
        }
        SceneMask::Unmasked => index,
    }
}

/// Build the batched mean query for `scenes`, one image per scene in order.
pub fn summary_query(geom: &Geometry, scenes: &[(SceneInfo, SceneMask)], params: &SummaryParams) -> Query {
    Query::ReduceRegion {
        region: geom.clone(),
        reducer: Reducer::Mean,
        scale: params.scale,
        images: scenes
            .iter()
            .map(|(scene, mask)| index_image(scene, mask, params))
            .collect(),
    }
}

/// Turn one reduced mean into a summary.
///
/// A missing or non-finite mean means the scene had no valid pixel over the
/// polygon and yields [`CloudError::UndefinedAggregate`].
pub fn summarize(scene: &SceneInfo, mask: &SceneMask, mean: Option<f64>) -> Result<SceneSummary> {
    match mean {
        Some(mean_index) if mean_index.is_finite() => Ok(SceneSummary {
            scene_id: scene.id.clone(),
            timestamp: scene.timestamp,
            mean_index,
            has_quality_band: mask.is_masked(),
        }),
        _ => Err(CloudError::UndefinedAggregate {
            scene_id: scene.id.clone(),
        }),
    }
}

/// Fetch the mean vegetation index of every matching scene over `geom`.
///
/// Scenes without a valid pixel are dropped. The result follows catalog
/// order and is not sorted. Any evaluation error aborts the whole batch.
pub async fn fetch_summaries(
    reos: &dyn Reos,
    geom: &Geometry,
    params: &SummaryParams,
) -> Result<Vec<SceneSummary>> {
    let scenes = reos.list_scenes(&params.filter(geom)).await?;
    info!("catalog returned {} scenes", scenes.len());
    if scenes.is_empty() {
        return Ok(Vec::new());
    }

    let scenes: Vec<(SceneInfo, SceneMask)> = scenes
        .into_iter()
        .map(|scene| {
            let mask = SceneMask::for_scene(&scene, params);
            if !mask.is_masked() {
                debug!("scene {} has no {} band, using it unmasked", scene.id, params.quality_band);
            }
            (scene, mask)
        })
        .collect();

    let means = match reos.evaluate(&summary_query(geom, &scenes, params)).await? {
        QueryOutput::ReduceRegion(means) => means,
        other => {
            return Err(CloudError::InvalidResponse(format!(
                "expected per-scene means, got {other:?}"
            )))
        }
    };

    if means.len() != scenes.len() {
        return Err(CloudError::InvalidResponse(format!(
            "expected {} means, got {}",
            scenes.len(),
            means.len()
        )));
    }

    let summaries: Vec<SceneSummary> = scenes
        .iter()
        .zip(means)
        .filter_map(|((scene, mask), mean)| match summarize(scene, mask, mean) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("dropping scene: {e}");
                None
            }
        })
        .collect();

    debug!("{} of {} scenes summarized", summaries.len(), scenes.len());
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn scene(bands: &[&str]) -> SceneInfo {
        SceneInfo {
            id: "S2B_20230601".into(),
            timestamp: Utc.with_ymd_and_hms(2023, 6, 1, 10, 56, 19).unwrap(),
            cloud_cover: Some(4.0),
            bands: bands.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn test_default_params() {
        let p = SummaryParams::default();
        assert_eq!(p.date_range.start, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
        assert_eq!(p.date_range.end, NaiveDate::from_ymd_opt(2099, 5, 1).unwrap());
        assert_eq!(p.quality_bits, vec![10, 11]);
        assert_eq!(p.scale, 10.0);
    }

    #[test]
    fn test_mask_follows_quality_band() {
        let params = SummaryParams::default();
        assert_eq!(
            SceneMask::for_scene(&scene(&["B4", "B8", "QA60"]), &params),
            SceneMask::Masked {
                band: "QA60".into(),
                bits: vec![10, 11]
            }
        );
        assert_eq!(SceneMask::for_scene(&scene(&["B4", "B8"]), &params), SceneMask::Unmasked);
    }

    #[test]
    fn test_index_image_shapes() {
        let params = SummaryParams::default();
        let s = scene(&["B4", "B8", "QA60"]);

        let plain = index_image(&s, &SceneMask::Unmasked, &params);
        assert!(matches!(plain, Image::NormalizedDifference { .. }));

        let masked = index_image(&s, &SceneMask::for_scene(&s, &params), &params);
        let Image::UpdateMask { image, mask } = masked else {
            panic!("expected a masked image");
        };
        assert_eq!(*image, plain);
        assert_eq!(*mask, Image::band(&s.id, "QA60").bits_clear(&[10, 11]));
    }

    #[test]
    fn test_summarize_undefined_aggregate() {
        let s = scene(&["B4", "B8"]);
        for mean in [None, Some(f64::NAN), Some(f64::INFINITY)] {
            assert!(matches!(
                summarize(&s, &SceneMask::Unmasked, mean),
                Err(CloudError::UndefinedAggregate { .. })
            ));
        }

        let summary = summarize(&s, &SceneMask::Unmasked, Some(0.42)).unwrap();
        assert_eq!(summary.mean_index, 0.42);
        assert!(!summary.has_quality_band);
    }
}
