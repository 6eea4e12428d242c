//! Geometry parser for raw client input.

use super::{Geometry, Vertex};
use crate::error::{Error, Result};
use serde_json::Value;

/// Parse polygon text into a validated [`Geometry`].
///
/// Two encodings are accepted:
/// - a single ring: `[[x, y], [x, y], ...]`
/// - a list of rings: `[[[x, y], ...], [[x, y], ...]]`, where the first ring
///   is the exterior and the remaining rings are holes
///
/// The closing vertex is optional. Text that is not JSON, or whose nesting is
/// not an array of arrays, fails with [`Error::InvalidGeometryEncoding`];
/// vertices that are not two finite numbers and degenerate rings fail with
/// [`Error::InvalidGeometryShape`].
pub fn parse_geometry(raw: &str) -> Result<Geometry> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| Error::InvalidGeometryEncoding(format!("not valid JSON: {e}")))?;

    let outer = as_array(&value, "coordinates")?;
    let first = outer
        .first()
        .ok_or_else(|| Error::InvalidGeometryShape("no vertices".into()))?;

    let rings: Vec<&Value> = if is_ring_list(first) {
        outer.iter().collect()
    } else {
        vec![&value]
    };

    let mut rings = rings
        .into_iter()
        .enumerate()
        .map(|(i, ring)| parse_ring(ring, i));
    let exterior = rings
        .next()
        .ok_or_else(|| Error::InvalidGeometryShape("no rings".into()))??;
    let holes = rings.collect::<Result<Vec<_>>>()?;

    Geometry::new(exterior, holes)
}

/// A ring list starts with an array whose first element is itself an array.
fn is_ring_list(first: &Value) -> bool {
    first
        .as_array()
        .and_then(|ring| ring.first())
        .is_some_and(Value::is_array)
}

fn parse_ring(value: &Value, index: usize) -> Result<Vec<Vertex>> {
    as_array(value, &format!("ring {index}"))?
        .iter()
        .enumerate()
        .map(|(i, vertex)| parse_vertex(vertex, index, i))
        .collect()
}

fn parse_vertex(value: &Value, ring: usize, index: usize) -> Result<Vertex> {
    let pair = as_array(value, &format!("vertex {index} of ring {ring}"))?;
    let coord = |v: &Value| {
        v.as_f64().ok_or_else(|| {
            Error::InvalidGeometryShape(format!(
                "vertex {index} of ring {ring} has a non-numeric coordinate: {v}"
            ))
        })
    };
    match pair.as_slice() {
        [x, y] => Ok(Vertex::new(coord(x)?, coord(y)?)),
        _ => Err(Error::InvalidGeometryShape(format!(
            "vertex {index} of ring {ring} has {} coordinates, expected 2",
            pair.len()
        ))),
    }
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::InvalidGeometryEncoding(format!("{what} is not an array")))
}
