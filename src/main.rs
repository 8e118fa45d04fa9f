//! Schedule Snap
//!
//! Reads a photographed class schedule, rebuilds its table layout from OCR
//! word boxes, asks a language model for structured class meetings and writes
//! them out as weekly recurring iCalendar events with reminders.

mod calendar;
mod cli;
mod config;
mod error;
mod export;
mod ocr;
mod paths;
mod pipeline;
mod schedule;
mod server;
mod table;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, Utc};
use clap::Parser;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use cli::{Cli, Command};
use config::AppConfig;
use pipeline::Pipeline;
use schedule::{DayToken, JsonFileParser, LlmScheduleParser, ScheduleParser, SemesterAnchor};

const LOG_FILE: &str = "schedule_snap.log";

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join(LOG_FILE);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(paths::get_logs_dir().join(LOG_FILE))
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));

    let cli = Cli::parse();

    paths::ensure_directories()?;
    config::init_config(cli.config.as_deref());
    let config = config::get_config();

    match cli.command {
        Command::Serve { bind, port } => serve(config, bind, port),
        Command::Convert {
            image,
            output,
            anchor,
            table_out,
            entries,
        } => convert(
            config,
            &image,
            &output,
            anchor,
            table_out.as_deref(),
            entries.as_deref(),
        ),
        Command::Table { image } => print_table(config, &image),
        Command::Materialize {
            entries,
            output,
            anchor,
        } => materialize_file(config, &entries, &output, anchor),
        Command::Inspect { calendar } => inspect(&calendar),
    }
}

fn serve(config: &AppConfig, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let zone = config.zone()?;
    let ocr = ocr::backend_from_config(&config.ocr)?;
    let parser = LlmScheduleParser::from_config(&config.llm)?;
    let pipeline = Pipeline {
        ocr: ocr.as_ref(),
        parser: &parser,
        thresholds: config.table,
        zone,
    };

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let port = port.unwrap_or(config.server.port);
    server::serve(&pipeline, &bind, port, config.server.max_upload_bytes)
}

fn convert(
    config: &AppConfig,
    image: &Path,
    output: &Path,
    anchor: Option<SemesterAnchor>,
    table_out: Option<&Path>,
    entries: Option<&Path>,
) -> Result<()> {
    let zone = config.zone()?;
    let bytes =
        std::fs::read(image).context(format!("Failed to read image: {}", image.display()))?;

    let ocr = ocr::backend_from_config(&config.ocr)?;
    let parser: Box<dyn ScheduleParser> = match entries {
        Some(path) => Box::new(JsonFileParser::new(path.to_path_buf())),
        None => Box::new(LlmScheduleParser::from_config(&config.llm)?),
    };
    let pipeline = Pipeline {
        ocr: ocr.as_ref(),
        parser: parser.as_ref(),
        thresholds: config.table,
        zone,
    };

    let anchor = anchor.unwrap_or_else(|| SemesterAnchor::today(zone));
    log(&format!("Anchor week: {}", anchor));
    let result = pipeline.run(&bytes, anchor)?;

    if let Some(path) = table_out {
        export::export_table_json(&result.table, path)?;
        log(&format!("Table written to {}", path.display()));
    }

    export::save_calendar(output, &result.ics)?;
    log(&format!(
        "Wrote {} events from {} entries to {}",
        result.events.len(),
        result.entries.len(),
        output.display()
    ));
    Ok(())
}

fn print_table(config: &AppConfig, image: &Path) -> Result<()> {
    let bytes =
        std::fs::read(image).context(format!("Failed to read image: {}", image.display()))?;
    let ocr = ocr::backend_from_config(&config.ocr)?;
    let table = pipeline::detect_table(ocr.as_ref(), &bytes, &config.table)?;

    let json = serde_json::to_string_pretty(&table).context("Failed to serialize table")?;
    println!("{}", json);
    Ok(())
}

fn materialize_file(
    config: &AppConfig,
    entries: &Path,
    output: &Path,
    anchor: Option<SemesterAnchor>,
) -> Result<()> {
    let zone = config.zone()?;
    let text = std::fs::read_to_string(entries)
        .context(format!("Failed to read entries: {}", entries.display()))?;
    let entries = schedule::parse_schedule_json(&text)?;

    let anchor = anchor.unwrap_or_else(|| SemesterAnchor::today(zone));
    let events = schedule::materialize(&entries, anchor, zone)?;
    let ics = calendar::write_calendar(&events, Utc::now());

    export::save_calendar(output, &ics)?;
    log(&format!("Wrote {} events to {}", events.len(), output.display()));
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .context(format!("Failed to read calendar: {}", path.display()))?;
    let events = calendar::read_calendar(&text)?;

    for event in &events {
        let byday = DayToken::from_weekday(event.start.weekday()).map_or("--", DayToken::byday);
        println!(
            "{}  {} {} {}-{} ({})  {}  [{}; alarm {} min before]",
            event.title,
            byday,
            event.start.format("%a %Y-%m-%d"),
            event.start.format("%H:%M"),
            event.end.format("%H:%M"),
            event.start.timezone().name(),
            event.location,
            event.recurrence.rule(),
            event.alarm.minutes_before
        );
    }
    log(&format!("{} events in {}", events.len(), path.display()));
    Ok(())
}
