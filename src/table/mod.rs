//! Table reconstruction from OCR word boxes.

pub mod reconstruct;
pub mod words;

pub use reconstruct::{reconstruct, Table, TableThresholds};
pub use words::{BoundingBox, RawWord, Vertex, WordIndex};
