pub mod setup;
pub mod tesseract;
pub mod vision;

pub use tesseract::TesseractOcr;
pub use vision::CloudVisionOcr;

use crate::config::{OcrBackendKind, OcrConfig};
use crate::error::Result;
use crate::table::RawWord;

/// Detects words and their bounding polygons in an encoded image.
pub trait OcrBackend {
    fn detect(&self, image: &[u8]) -> Result<Vec<RawWord>>;
}

/// Builds the backend selected in the configuration.
pub fn backend_from_config(config: &OcrConfig) -> Result<Box<dyn OcrBackend>> {
    crate::log(&format!("OCR backend: {:?}", config.backend));
    Ok(match config.backend {
        OcrBackendKind::Tesseract => Box::new(TesseractOcr::from_config(config)?),
        OcrBackendKind::Vision => Box::new(CloudVisionOcr::from_config(config)?),
    })
}
