use image::ImageFormat;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::{ensure_tesseract, TesseractPaths};
use super::OcrBackend;
use crate::config::OcrConfig;
use crate::error::{Result, ScheduleError};
use crate::table::{BoundingBox, RawWord};

/// Runs the local `tesseract` executable with TSV output.
pub struct TesseractOcr {
    paths: TesseractPaths,
    language: String,
    page_seg_mode: u8,
    min_confidence: f32,
}

impl TesseractOcr {
    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        let paths = ensure_tesseract(&config.language)
            .map_err(|e| ScheduleError::ocr(format!("{:#}", e)))?;
        Ok(Self {
            paths,
            language: config.language.clone(),
            page_seg_mode: config.page_seg_mode,
            min_confidence: config.min_confidence,
        })
    }
}

impl OcrBackend for TesseractOcr {
    fn detect(&self, image: &[u8]) -> Result<Vec<RawWord>> {
        let decoded = image::load_from_memory(image)
            .map_err(|e| ScheduleError::ocr(format!("unreadable image: {}", e)))?;

        // Re-encode so Tesseract always receives a format it reads
        let temp_input = NamedTempFile::with_suffix(".png")?;
        decoded
            .save_with_format(temp_input.path(), ImageFormat::Png)
            .map_err(|e| ScheduleError::ocr(format!("could not write temp image: {}", e)))?;

        // Tesseract appends .tsv to the output base
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let output = Command::new(&self.paths.executable)
            .arg(temp_input.path())
            .arg(&output_base)
            .arg("--tessdata-dir")
            .arg(&self.paths.tessdata)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_seg_mode.to_string())
            .arg("tsv")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScheduleError::ocr(format!("Tesseract failed: {}", stderr.trim())));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| ScheduleError::ocr(format!("Failed to read Tesseract output: {}", e)))?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_words(&tsv_content, self.min_confidence))
    }
}

/// Extracts word-level rows (level 5) from Tesseract TSV output.
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text
pub fn parse_tsv_words(tsv: &str, min_confidence: f32) -> Vec<RawWord> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 12 || fields[0] != "5" {
                return None;
            }

            let text = fields[11].trim();
            let conf: f32 = fields[10].parse().unwrap_or(-1.0);
            if text.is_empty() || conf < 0.0 || conf < min_confidence {
                return None;
            }

            let left: i32 = fields[6].parse().ok()?;
            let top: i32 = fields[7].parse().ok()?;
            let width: i32 = fields[8].parse().ok()?;
            let height: i32 = fields[9].parse().ok()?;

            Some(RawWord {
                text: text.to_string(),
                vertices: BoundingBox::from_rect(left, top, width, height)
                    .vertices
                    .to_vec(),
            })
        })
        .collect()
}
