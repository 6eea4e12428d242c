//! Polygon geometry supplied by clients.
//!
//! A [`Geometry`] is always valid once constructed: every ring is simple,
//! has at least three distinct vertices and encloses a non-zero area. Rings are stored
//! open (without the closing vertex) and closed again on export.

mod parse;

pub use parse::parse_geometry;

use crate::error::{Error, Result};
use geo::Intersects;
use geo_types::{Coord, Line, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// A polygon vertex as `(longitude, latitude)`, or `(x, y)` in projected units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Vertex> for Coord<f64> {
    fn from(v: Vertex) -> Self {
        Coord { x: v.x, y: v.y }
    }
}

/// A validated polygon: one exterior ring plus optional holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolygonRepr", into = "PolygonRepr")]
pub struct Geometry {
    exterior: Vec<Vertex>,
    holes: Vec<Vec<Vertex>>,
}

impl Geometry {
    /// Build a polygon from open or closed rings, validating each ring.
    pub fn new(exterior: Vec<Vertex>, holes: Vec<Vec<Vertex>>) -> Result<Self> {
        let exterior = normalize_ring(exterior, "exterior ring")?;
        let holes = holes
            .into_iter()
            .enumerate()
            .map(|(i, ring)| normalize_ring(ring, &format!("hole {}", i + 1)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { exterior, holes })
    }

    /// Exterior ring, without the closing vertex
    pub fn exterior(&self) -> &[Vertex] {
        &self.exterior
    }

    /// Interior rings, without closing vertices
    pub fn holes(&self) -> &[Vec<Vertex>] {
        &self.holes
    }

    /// Rings as closed coordinate lists, exterior first.
    pub fn closed_rings(&self) -> Vec<Vec<[f64; 2]>> {
        std::iter::once(&self.exterior)
            .chain(self.holes.iter())
            .map(|ring| {
                ring.iter()
                    .chain(ring.first())
                    .map(|v| [v.x, v.y])
                    .collect()
            })
            .collect()
    }

    /// Convert to a `geo_types` polygon for measurement and containment tests.
    pub fn to_polygon(&self) -> Polygon<f64> {
        let ring = |r: &Vec<Vertex>| LineString::from(r.iter().map(|&v| Coord::from(v)).collect::<Vec<_>>());
        // LineString rings are closed by Polygon::new
        Polygon::new(ring(&self.exterior), self.holes.iter().map(ring).collect())
    }
}

fn normalize_ring(mut ring: Vec<Vertex>, label: &str) -> Result<Vec<Vertex>> {
    if let Some(v) = ring.iter().find(|v| !v.x.is_finite() || !v.y.is_finite()) {
        return Err(Error::InvalidGeometryShape(format!(
            "{label} has a non-finite coordinate ({}, {})",
            v.x, v.y
        )));
    }

    ring.dedup();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    let mut distinct: Vec<Vertex> = Vec::with_capacity(ring.len());
    for v in &ring {
        if !distinct.contains(v) {
            distinct.push(*v);
        }
    }
    if distinct.len() < 3 {
        return Err(Error::InvalidGeometryShape(format!(
            "{label} needs at least 3 distinct vertices, got {}",
            distinct.len()
        )));
    }

    if self_intersects(&ring) {
        return Err(Error::InvalidGeometryShape(format!(
            "{label} intersects itself"
        )));
    }

    if shoelace(&ring).abs() < f64::EPSILON {
        return Err(Error::InvalidGeometryShape(format!(
            "{label} encloses no area"
        )));
    }

    Ok(ring)
}

/// Whether two non-adjacent edges of an open ring touch or cross.
fn self_intersects(ring: &[Vertex]) -> bool {
    let n = ring.len();
    let edge = |i: usize| Line::new(Coord::from(ring[i]), Coord::from(ring[(i + 1) % n]));
    (0..n).any(|i| {
        (i + 2..n)
            .filter(|&j| !(i == 0 && j == n - 1))
            .any(|j| edge(i).intersects(&edge(j)))
    })
}

/// Signed area of an open ring.
fn shoelace(ring: &[Vertex]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// GeoJSON-style wire representation: `{"type": "Polygon", "coordinates": [...]}`.
#[derive(Serialize, Deserialize)]
struct PolygonRepr {
    #[serde(rename = "type")]
    type_: String,
    coordinates: Vec<Vec<[f64; 2]>>,
}

impl From<Geometry> for PolygonRepr {
    fn from(g: Geometry) -> Self {
        Self {
            type_: "Polygon".to_string(),
            coordinates: g.closed_rings(),
        }
    }
}

impl TryFrom<PolygonRepr> for Geometry {
    type Error = Error;

    fn try_from(repr: PolygonRepr) -> Result<Self> {
        if repr.type_ != "Polygon" {
            return Err(Error::InvalidGeometryEncoding(format!(
                "expected Polygon, got {}",
                repr.type_
            )));
        }
        let mut rings = repr
            .coordinates
            .into_iter()
            .map(|r| r.into_iter().map(|[x, y]| Vertex::new(x, y)).collect());
        let exterior = rings
            .next()
            .ok_or_else(|| Error::InvalidGeometryShape("polygon has no rings".into()))?;
        Geometry::new(exterior, rings.collect())
    }
}
