//! Google Cloud Vision text detection.

use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;

use super::OcrBackend;
use crate::config::OcrConfig;
use crate::error::{Result, ScheduleError};
use crate::table::{RawWord, Vertex};

pub struct CloudVisionOcr {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl CloudVisionOcr {
    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        let api_key = std::env::var(&config.vision_api_key_env).map_err(|_| {
            ScheduleError::ocr(format!(
                "Vision API key not set (expected in ${})",
                config.vision_api_key_env
            ))
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScheduleError::ocr(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.vision_endpoint.clone(),
            api_key,
        })
    }
}

impl OcrBackend for CloudVisionOcr {
    fn detect(&self, image: &[u8]) -> Result<Vec<RawWord>> {
        let body = json!({
            "requests": [{
                "image": {"content": base64::engine::general_purpose::STANDARD.encode(image)},
                "features": [{"type": "TEXT_DETECTION"}],
            }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| ScheduleError::ocr(format!("Vision request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(ScheduleError::ocr(format!(
                "Vision returned HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let payload: Value = response
            .json()
            .map_err(|e| ScheduleError::ocr(format!("Vision reply is not JSON: {}", e)))?;
        parse_vision_response(&payload)
    }
}

/// Reads word annotations from an `images:annotate` reply.
///
/// The first annotation is the whole detected text block and is skipped.
/// Vision omits zero coordinates, so missing `x`/`y` read as 0.
pub fn parse_vision_response(payload: &Value) -> Result<Vec<RawWord>> {
    let Some(first) = payload["responses"].get(0) else {
        return Err(ScheduleError::ocr("Vision reply has no responses"));
    };

    if let Some(message) = first["error"]["message"].as_str() {
        return Err(ScheduleError::ocr(message.to_string()));
    }

    let Some(annotations) = first["textAnnotations"].as_array() else {
        return Ok(Vec::new());
    };

    let words = annotations
        .iter()
        .skip(1)
        .map(|annotation| {
            let text = annotation["description"].as_str().unwrap_or_default();
            let vertices = annotation["boundingPoly"]["vertices"]
                .as_array()
                .map(|points| {
                    points
                        .iter()
                        .map(|p| {
                            Vertex::new(coordinate(&p["x"]), coordinate(&p["y"]))
                        })
                        .collect()
                })
                .unwrap_or_default();
            RawWord {
                text: text.to_string(),
                vertices,
            }
        })
        .collect();

    Ok(words)
}

/// Missing coordinates are zero; out-of-range ones clamp to the i32 range.
fn coordinate(value: &Value) -> i32 {
    value
        .as_i64()
        .map(|v| i32::try_from(v).unwrap_or(if v < 0 { i32::MIN } else { i32::MAX }))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_full_text_annotation() {
        let payload = json!({
            "responses": [{
                "textAnnotations": [
                    {"description": "CS101 MWF", "boundingPoly": {"vertices": [{"x": 0, "y": 0}]}},
                    {"description": "CS101", "boundingPoly": {"vertices": [
                        {"x": 10, "y": 20}, {"x": 90, "y": 20}, {"x": 90, "y": 45}, {"x": 10, "y": 45}
                    ]}},
                    {"description": "MWF", "boundingPoly": {"vertices": [
                        {"y": 20}, {"x": 40, "y": 20}, {"x": 40, "y": 45}, {"y": 45}
                    ]}},
                ]
            }]
        });

        let words = parse_vision_response(&payload).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "CS101");
        assert_eq!(words[0].vertices[2], Vertex::new(90, 45));
        assert_eq!(words[1].vertices[0], Vertex::new(0, 20));
    }

    #[test]
    fn test_no_annotations_is_empty() {
        let payload = json!({"responses": [{}]});
        assert!(parse_vision_response(&payload).unwrap().is_empty());
    }

    #[test]
    fn test_error_object_is_ocr_error() {
        let payload = json!({"responses": [{"error": {"code": 3, "message": "Bad image data."}}]});
        let err = parse_vision_response(&payload).unwrap_err();
        assert!(matches!(err, ScheduleError::Ocr(ref m) if m == "Bad image data."));
    }

    #[test]
    fn test_missing_responses_is_ocr_error() {
        let err = parse_vision_response(&json!({})).unwrap_err();
        assert_eq!(err.kind(), "ocr_error");
    }

    #[test]
    fn test_out_of_range_coordinates_clamp() {
        let payload = json!({
            "responses": [{
                "textAnnotations": [
                    {"description": "all"},
                    {"description": "Huge", "boundingPoly": {"vertices": [
                        {"x": 5_000_000_000_i64, "y": -5_000_000_000_i64}, {"x": 12, "y": 7}
                    ]}},
                ]
            }]
        });

        let words = parse_vision_response(&payload).unwrap();
        assert_eq!(words[0].vertices[0], Vertex::new(i32::MAX, i32::MIN));
        assert_eq!(words[0].vertices[1], Vertex::new(12, 7));
    }
}
