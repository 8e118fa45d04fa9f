//! Image-to-calendar pipeline.
//!
//! Stages run in order on one image: OCR, word normalization, table
//! reconstruction, schedule parsing, materialization and serialization.
//! The first failing stage ends the run with its error unchanged.

use chrono::Utc;
use chrono_tz::Tz;

use crate::calendar::{write_calendar, CalendarEvent};
use crate::error::{Result, ScheduleError};
use crate::log;
use crate::ocr::OcrBackend;
use crate::schedule::{materialize, ScheduleEntry, ScheduleParser, SemesterAnchor};
use crate::table::{reconstruct, Table, TableThresholds, WordIndex};

pub struct Pipeline<'a> {
    pub ocr: &'a dyn OcrBackend,
    pub parser: &'a dyn ScheduleParser,
    pub thresholds: TableThresholds,
    pub zone: Tz,
}

/// Everything one run produced, intermediate stages included.
#[derive(Debug)]
pub struct PipelineOutput {
    pub table: Table,
    pub entries: Vec<ScheduleEntry>,
    pub events: Vec<CalendarEvent>,
    pub ics: String,
}

impl Pipeline<'_> {
    /// Runs OCR and table reconstruction only.
    pub fn table(&self, image: &[u8]) -> Result<Table> {
        detect_table(self.ocr, image, &self.thresholds)
    }

    pub fn run(&self, image: &[u8], anchor: SemesterAnchor) -> Result<PipelineOutput> {
        self.run_stages(image, anchor)
            .inspect_err(|e| log(&format!("Pipeline failed ({}): {}", e.kind(), e)))
    }

    fn run_stages(&self, image: &[u8], anchor: SemesterAnchor) -> Result<PipelineOutput> {
        let table = self.table(image)?;
        let entries = self.parser.parse(&table)?;
        let events = materialize(&entries, anchor, self.zone)?;
        let ics = write_calendar(&events, Utc::now());

        Ok(PipelineOutput {
            table,
            entries,
            events,
            ics,
        })
    }
}

/// OCR an image and rebuild its table layout.
pub fn detect_table(
    ocr: &dyn OcrBackend,
    image: &[u8],
    thresholds: &TableThresholds,
) -> Result<Table> {
    let raw = ocr.detect(image)?;
    let index = WordIndex::build(raw);
    log(&format!("OCR detected {} words", index.len()));

    if index.is_empty() {
        return Err(ScheduleError::EmptyTable);
    }

    let table = reconstruct(index.words(), thresholds);
    log(&format!(
        "Reconstructed table: {} rows, {} cells",
        table.row_count(),
        table.cell_count()
    ));
    Ok(table)
}
