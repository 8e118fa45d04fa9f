//! Writing pipeline results to disk.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::table::Table;

/// Writes a serialized calendar document.
pub fn save_calendar(output_path: &Path, ics: &str) -> Result<()> {
    let mut file = File::create(output_path)
        .context(format!("Failed to create calendar file: {}", output_path.display()))?;

    file.write_all(ics.as_bytes())
        .context("Failed to write calendar data")?;

    Ok(())
}

/// Export a reconstructed table to a JSON file.
///
/// The output is pretty-printed for human readability.
pub fn export_table_json(table: &Table, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(table).context("Failed to serialize table to JSON")?;

    let mut file = File::create(output_path)
        .context(format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_calendar_keeps_crlf() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schedule.ics");

        save_calendar(&path, "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n").unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n");
    }

    #[test]
    fn test_export_table_json() {
        let table = Table::new(vec![
            vec!["CS101".to_string(), "MWF".to_string()],
            vec!["MATH 2".to_string()],
        ]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("table.json");

        export_table_json(&table, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Vec<String>> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, table.rows());
        assert!(content.contains("\"MATH 2\""));
    }

    #[test]
    fn test_save_calendar_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("schedule.ics");

        let err = save_calendar(&path, "x").unwrap_err();
        assert!(err.to_string().contains("Failed to create calendar file"));
    }
}
