//! Table-to-schedule conversion through an external language model.

use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

use super::entry::{parse_schedule_json, ScheduleEntry};
use crate::config::LlmConfig;
use crate::error::{Result, ScheduleError};
use crate::log;
use crate::table::Table;

const SYSTEM_PROMPT: &str = "\
You convert class schedule tables into JSON. The table was read from a photo \
by OCR, so cells may be split, merged or misspelled. Return ONLY a JSON array, \
no prose. Each element must be an object with string fields: \
\"course\" (course name or code), \
\"day_code\" (meeting days using M, Tu, W, Th, F concatenated, e.g. \"MWF\" or \"TuTh\"), \
\"start_time\" and \"end_time\" (12-hour clock with AM/PM, e.g. \"10:00 AM\"), \
\"location\" (building and room, or an empty string). \
Skip header rows and rows that are not class meetings.";

/// Converts a reconstructed table into schedule entries.
pub trait ScheduleParser {
    fn parse(&self, table: &Table) -> Result<Vec<ScheduleEntry>>;
}

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct LlmScheduleParser {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl LlmScheduleParser {
    /// Builds a client, reading the API key from the configured variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ScheduleError::parse(format!(
                "language model API key not set (expected in ${})",
                config.api_key_env
            ))
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScheduleError::parse(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn request_body(&self, table: &Table) -> serde_json::Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt(table)},
            ]
        })
    }
}

impl ScheduleParser for LlmScheduleParser {
    fn parse(&self, table: &Table) -> Result<Vec<ScheduleEntry>> {
        log(&format!(
            "Sending {}-row table to {} ({})",
            table.row_count(),
            self.endpoint,
            self.model
        ));

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(table))
            .send()
            .map_err(|e| ScheduleError::parse(format!("schedule parser request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ScheduleError::parse(format!(
                "schedule parser returned HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| ScheduleError::parse(format!("schedule parser reply is not JSON: {}", e)))?;
        let reply = reply_content(&payload)?;
        let entries = parse_schedule_json(reply)?;

        log(&format!("Schedule parser returned {} entries", entries.len()));
        Ok(entries)
    }
}

/// Reads entries from a JSON file instead of calling a model.
pub struct JsonFileParser {
    path: PathBuf,
}

impl JsonFileParser {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ScheduleParser for JsonFileParser {
    fn parse(&self, _table: &Table) -> Result<Vec<ScheduleEntry>> {
        let text = std::fs::read_to_string(&self.path)?;
        parse_schedule_json(&text)
    }
}

fn user_prompt(table: &Table) -> String {
    format!(
        "Schedule table (one row per line, cells separated by \" | \"):\n{}",
        table.to_text()
    )
}

/// Extracts the assistant message text from a chat-completions payload.
fn reply_content(payload: &serde_json::Value) -> Result<&str> {
    payload
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ScheduleError::parse("schedule parser reply has no message content"))
}
