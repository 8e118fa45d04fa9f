//! Word index: normalizes raw OCR output into positioned word records.
//!
//! OCR backends hand back whatever polygons the service produced. Cloud OCR
//! omits coordinates that are zero and occasionally returns degenerate
//! polygons; Tesseract only knows rectangles. Everything downstream works on
//! the uniform [`WordRecord`] produced here.

use serde::{Deserialize, Serialize};

/// A polygon vertex in image pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl Vertex {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Four-vertex polygon enclosing a word, in reading order
/// (top-left, top-right, bottom-right, bottom-left for upright text).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub vertices: [Vertex; 4],
}

impl BoundingBox {
    /// Builds the polygon of an axis-aligned rectangle.
    pub fn from_rect(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self::from_corners(left, top, left.saturating_add(width), top.saturating_add(height))
    }

    fn from_corners(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            vertices: [
                Vertex::new(left, top),
                Vertex::new(right, top),
                Vertex::new(right, bottom),
                Vertex::new(left, bottom),
            ],
        }
    }

    pub fn min_x(&self) -> i32 {
        self.vertices.iter().map(|v| v.x).min().unwrap_or(0)
    }

    pub fn min_y(&self) -> i32 {
        self.vertices.iter().map(|v| v.y).min().unwrap_or(0)
    }

    pub fn max_x(&self) -> i32 {
        self.vertices.iter().map(|v| v.x).max().unwrap_or(0)
    }

    pub fn max_y(&self) -> i32 {
        self.vertices.iter().map(|v| v.y).max().unwrap_or(0)
    }

    /// Normalizes an arbitrary polygon into four vertices.
    ///
    /// Short polygons repeat their last vertex; longer ones collapse to the
    /// enclosing rectangle. Returns None for an empty polygon.
    fn from_polygon(points: &[Vertex]) -> Option<Self> {
        match points.len() {
            0 => None,
            4 => Some(Self {
                vertices: [points[0], points[1], points[2], points[3]],
            }),
            n if n < 4 => {
                let last = points[n - 1];
                let mut vertices = [last; 4];
                vertices[..n].copy_from_slice(points);
                Some(Self { vertices })
            }
            _ => {
                let min_x = points.iter().map(|v| v.x).min()?;
                let min_y = points.iter().map(|v| v.y).min()?;
                let max_x = points.iter().map(|v| v.x).max()?;
                let max_y = points.iter().map(|v| v.y).max()?;
                Some(Self::from_corners(min_x, min_y, max_x, max_y))
            }
        }
    }
}

/// A word as reported by an OCR backend, before normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawWord {
    pub text: String,
    pub vertices: Vec<Vertex>,
}

/// A detected word with its bounding polygon. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    pub text: String,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

impl WordRecord {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Flat list of normalized words for one image.
#[derive(Clone, Debug, Default)]
pub struct WordIndex {
    words: Vec<WordRecord>,
}

impl WordIndex {
    /// Normalizes raw OCR words, dropping blank text and empty polygons.
    pub fn build(raw: Vec<RawWord>) -> Self {
        let words = raw
            .into_iter()
            .filter_map(|word| {
                let text = word.text.trim();
                if text.is_empty() {
                    return None;
                }
                let bbox = BoundingBox::from_polygon(&word.vertices)?;
                Some(WordRecord::new(text, bbox))
            })
            .collect();
        Self { words }
    }

    pub fn words(&self) -> &[WordRecord] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
