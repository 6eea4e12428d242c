//! In-memory earth-observation engine.
//!
//! [`LocalReos`] evaluates the same [`Query`] graphs as the remote service,
//! over scenes held in memory. It backs the test suite and offline runs from
//! a JSON scene fixture. Coordinates are planar map units (meters) unless
//! the engine is switched to geodesic area.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldcheck_algorithms::imagery::{bits_clear, normalized_difference, update_mask};
use fieldcheck_algorithms::statistics::region_mean;
use fieldcheck_algorithms::vector::{geodesic_area, planar_area};
use fieldcheck_core::{GeoTransform, Geometry, Raster};
use geo::{Intersects, Rect};
use serde::Deserialize;
use tracing::debug;

use crate::error::{CloudError, Result};
use crate::query::{Image, Query, QueryOutput, Reducer, SceneFilter, SceneInfo};
use crate::reos::Reos;

/// How [`Query::Area`] is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AreaMode {
    /// Planar area in squared coordinate units.
    #[default]
    Planar,
    /// Ellipsoidal area in square meters for longitude/latitude input.
    Geodesic,
}

/// One scene held in memory.
#[derive(Debug, Clone)]
pub struct LocalScene {
    pub collection: String,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Scene-level metadata such as `CLOUDY_PIXEL_PERCENTAGE`
    pub properties: HashMap<String, f64>,
    /// Bands sharing one grid
    pub bands: HashMap<String, Raster>,
}

impl LocalScene {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            timestamp,
            properties: HashMap::new(),
            bands: HashMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_band(mut self, name: impl Into<String>, raster: Raster) -> Self {
        self.bands.insert(name.into(), raster);
        self
    }

    /// Union of the band extents.
    fn footprint(&self) -> Option<Rect<f64>> {
        self.bands
            .values()
            .map(|r| r.bounds())
            .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
            .map(|(x0, y0, x1, y1)| Rect::new((x0, y0), (x1, y1)))
    }

    fn info(&self, cloud_property: &str) -> SceneInfo {
        let mut bands: Vec<String> = self.bands.keys().cloned().collect();
        bands.sort();
        SceneInfo {
            id: self.id.clone(),
            timestamp: self.timestamp,
            cloud_cover: self.properties.get(cloud_property).copied(),
            bands,
        }
    }

    fn matches(&self, filter: &SceneFilter) -> bool {
        let cloud_ok = self
            .properties
            .get(&filter.cloud_property)
            .is_some_and(|&cc| cc < filter.cloud_cover_max);
        let overlaps = self
            .footprint()
            .is_some_and(|rect| filter.bounds.to_polygon().intersects(&rect));

        self.collection == filter.collection
            && filter.date_range.contains(&self.timestamp)
            && cloud_ok
            && overlaps
    }
}

/// In-memory [`Reos`] implementation.
#[derive(Debug, Default)]
pub struct LocalReos {
    scenes: Vec<LocalScene>,
    area_mode: AreaMode,
    evaluations: AtomicUsize,
}

impl LocalReos {
    pub fn new(scenes: Vec<LocalScene>) -> Self {
        Self {
            scenes,
            ..Self::default()
        }
    }

    pub fn with_area_mode(mut self, mode: AreaMode) -> Self {
        self.area_mode = mode;
        self
    }

    /// Load scenes from a JSON fixture file (see [`SceneFixtureFile`]).
    pub fn from_fixture_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CloudError::Fixture(format!("reading {}: {e}", path.display())))?;
        Self::from_fixture_json(&text)
    }

    /// Load scenes from fixture JSON text.
    pub fn from_fixture_json(text: &str) -> Result<Self> {
        let file: SceneFixtureFile =
            serde_json::from_str(text).map_err(|e| CloudError::Fixture(e.to_string()))?;
        let scenes = file
            .scenes
            .into_iter()
            .map(SceneFixture::into_scene)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(scenes).with_area_mode(file.area_mode))
    }

    pub fn scenes(&self) -> &[LocalScene] {
        &self.scenes
    }

    /// Number of queries evaluated so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    fn scene(&self, id: &str) -> Result<&LocalScene> {
        self.scenes
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CloudError::Remote(format!("unknown scene {id}")))
    }

    /// Evaluate an image expression to a raster; masked pixels are NaN.
    fn render(&self, image: &Image) -> Result<Raster> {
        match image {
            Image::Band { scene, band } => self
                .scene(scene)?
                .bands
                .get(band)
                .cloned()
                .ok_or_else(|| CloudError::Remote(format!("scene {scene} has no band {band}"))),
            Image::NormalizedDifference { a, b } => {
                Ok(normalized_difference(&self.render(a)?, &self.render(b)?)?)
            }
            Image::BitsClear { source, bits } => Ok(bits_clear(&self.render(source)?, bits)?),
            Image::UpdateMask { image, mask } => {
                Ok(update_mask(&self.render(image)?, &self.render(mask)?)?)
            }
        }
    }

    fn area(&self, region: &Geometry) -> f64 {
        match self.area_mode {
            AreaMode::Planar => planar_area(region),
            AreaMode::Geodesic => geodesic_area(region),
        }
    }
}

#[async_trait]
impl Reos for LocalReos {
    async fn list_scenes(&self, filter: &SceneFilter) -> Result<Vec<SceneInfo>> {
        let scenes: Vec<SceneInfo> = self
            .scenes
            .iter()
            .filter(|s| s.matches(filter))
            .map(|s| s.info(&filter.cloud_property))
            .collect();
        debug!("local catalog matched {} of {} scenes", scenes.len(), self.scenes.len());
        Ok(scenes)
    }

    async fn evaluate(&self, query: &Query) -> Result<QueryOutput> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);

        match query {
            Query::Area { region } => Ok(QueryOutput::Area(self.area(region))),
            Query::ReduceRegion {
                region,
                reducer: Reducer::Mean,
                scale,
                images,
            } => {
                let polygon = region.to_polygon();
                let means = images
                    .iter()
                    .map(|image| Ok(region_mean(&self.render(image)?, &polygon, *scale)?))
                    .collect::<Result<Vec<_>>>()?;
                Ok(QueryOutput::ReduceRegion(means))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Top level of a scene fixture file.
///
/// ```json
/// {
///   "areaMode": "planar",
///   "scenes": [{
///     "collection": "COPERNICUS/S2",
///     "id": "20230601T105619",
///     "timestamp": "2023-06-01T10:56:19Z",
///     "properties": {"CLOUDY_PIXEL_PERCENTAGE": 3.2},
///     "transform": {"origin_x": 0, "origin_y": 100, "pixel_width": 10, "pixel_height": -10},
///     "bands": {"B4": [[...], ...], "B8": [[...], ...], "QA60": [[...], ...]}
///   }]
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFixtureFile {
    #[serde(default)]
    pub area_mode: AreaMode,
    pub scenes: Vec<SceneFixture>,
}

/// One scene in a fixture file; `null` band values are masked pixels.
#[derive(Debug, Deserialize)]
pub struct SceneFixture {
    pub collection: String,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub properties: HashMap<String, f64>,
    pub transform: GeoTransform,
    pub bands: HashMap<String, Vec<Vec<Option<f64>>>>,
}

impl SceneFixture {
    fn into_scene(self) -> Result<LocalScene> {
        let mut scene = LocalScene::new(self.collection, self.id, self.timestamp);
        scene.properties = self.properties;
        for (name, rows) in self.bands {
            let rows: Vec<Vec<f64>> = rows
                .into_iter()
                .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
                .collect();
            let raster = Raster::from_rows(&rows)
                .map_err(|e| CloudError::Fixture(format!("scene {} band {name}: {e}", scene.id)))?
                .with_transform(self.transform);
            scene.bands.insert(name, raster);
        }
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::DateRange;
    use chrono::{NaiveDate, TimeZone};
    use fieldcheck_core::vector::parse_geometry;

    fn band(value: f64) -> Raster {
        Raster::filled(10, 10, value).with_transform(GeoTransform::new(0.0, 100.0, 10.0, -10.0))
    }

    fn scene(id: &str, day: u32, cloud: f64) -> LocalScene {
        LocalScene::new("COPERNICUS/S2", id, Utc.with_ymd_and_hms(2023, 6, day, 10, 0, 0).unwrap())
            .with_property("CLOUDY_PIXEL_PERCENTAGE", cloud)
            .with_band("B8", band(0.6))
            .with_band("B4", band(0.2))
    }

    fn filter(ring: &str) -> SceneFilter {
        SceneFilter {
            collection: "COPERNICUS/S2".into(),
            bounds: parse_geometry(ring).unwrap(),
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2099, 5, 1).unwrap(),
            ),
            cloud_property: "CLOUDY_PIXEL_PERCENTAGE".into(),
            cloud_cover_max: 15.0,
        }
    }

    #[tokio::test]
    async fn test_catalog_filters() {
        let mut other = scene("other", 3, 1.0);
        other.collection = "LANDSAT".into();
        let reos = LocalReos::new(vec![
            scene("clear", 1, 2.0),
            scene("cloudy", 2, 15.0),
            other,
            LocalScene::new("COPERNICUS/S2", "no-metadata", Utc.with_ymd_and_hms(2023, 6, 4, 0, 0, 0).unwrap())
                .with_band("B8", band(0.5)),
        ]);

        let inside = reos.list_scenes(&filter("[[[10,10],[50,10],[50,50],[10,10]]]")).await.unwrap();
        let ids: Vec<_> = inside.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["clear"]);
        assert_eq!(inside[0].cloud_cover, Some(2.0));
        assert_eq!(inside[0].bands, vec!["B4".to_string(), "B8".to_string()]);

        let outside = reos.list_scenes(&filter("[[[500,500],[600,500],[600,600],[500,500]]]")).await.unwrap();
        assert!(outside.is_empty());
    }

    #[tokio::test]
    async fn test_reduce_ndvi() {
        let reos = LocalReos::new(vec![scene("a", 1, 0.0)]);
        let query = Query::ReduceRegion {
            region: parse_geometry("[[[0,0],[100,0],[100,100],[0,100]]]").unwrap(),
            reducer: Reducer::Mean,
            scale: 10.0,
            images: vec![Image::band("a", "B8").normalized_difference(Image::band("a", "B4"))],
        };

        let QueryOutput::ReduceRegion(means) = reos.evaluate(&query).await.unwrap() else {
            panic!("expected a reduction output");
        };
        assert!((means[0].unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(reos.evaluations(), 1);
    }

    #[tokio::test]
    async fn test_missing_band_aborts_batch() {
        let reos = LocalReos::new(vec![scene("a", 1, 0.0)]);
        let query = Query::ReduceRegion {
            region: parse_geometry("[[[0,0],[100,0],[100,100],[0,100]]]").unwrap(),
            reducer: Reducer::Mean,
            scale: 10.0,
            images: vec![Image::band("a", "B8"), Image::band("a", "QA60")],
        };
        assert!(matches!(reos.evaluate(&query).await, Err(CloudError::Remote(_))));
    }

    #[tokio::test]
    async fn test_planar_area() {
        let reos = LocalReos::default();
        let query = Query::Area {
            region: parse_geometry("[[[0,0],[200,0],[200,100],[0,100]]]").unwrap(),
        };
        assert_eq!(reos.evaluate(&query).await.unwrap(), QueryOutput::Area(20_000.0));
    }

    #[test]
    fn test_fixture_json() {
        let reos = LocalReos::from_fixture_json(
            r#"{
                "areaMode": "geodesic",
                "scenes": [{
                    "collection": "COPERNICUS/S2",
                    "id": "s1",
                    "timestamp": "2023-06-01T10:56:19Z",
                    "properties": {"CLOUDY_PIXEL_PERCENTAGE": 3.0},
                    "transform": {"origin_x": 0.0, "origin_y": 20.0, "pixel_width": 10.0, "pixel_height": -10.0},
                    "bands": {"B8": [[0.5, null], [0.5, 0.5]]}
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(reos.area_mode, AreaMode::Geodesic);
        let b8 = &reos.scenes()[0].bands["B8"];
        assert_eq!(b8.shape(), (2, 2));
        assert!(b8.get(0, 1).unwrap().is_nan());
        assert_eq!(b8.bounds(), (0.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn test_fixture_rejects_ragged_band() {
        let err = LocalReos::from_fixture_json(
            r#"{"scenes": [{
                "collection": "C", "id": "s1", "timestamp": "2023-06-01T00:00:00Z",
                "transform": {"origin_x": 0.0, "origin_y": 0.0, "pixel_width": 1.0, "pixel_height": -1.0},
                "bands": {"B8": [[0.5, 0.1], [0.5]]}
            }]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CloudError::Fixture(_)));
    }
}
