use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::schedule::SemesterAnchor;

#[derive(Parser)]
#[command(name = "schedule-snap")]
#[command(about = "Turn a photographed class schedule into a recurring iCalendar file", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: config.json next to the executable)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the upload endpoint.
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Convert a schedule photo into an .ics file.
    Convert {
        image: PathBuf,
        #[arg(short, long, default_value = "schedule.ics")]
        output: PathBuf,
        /// Any date in the first week of classes (YYYY-MM-DD). Default: this week
        #[arg(long)]
        anchor: Option<SemesterAnchor>,
        /// Also write the reconstructed table as JSON
        #[arg(long)]
        table_out: Option<PathBuf>,
        /// Read schedule entries from this JSON file instead of the language model
        #[arg(long)]
        entries: Option<PathBuf>,
    },

    /// Print the table reconstructed from a photo as JSON.
    Table { image: PathBuf },

    /// Build an .ics file from a JSON list of schedule entries.
    Materialize {
        entries: PathBuf,
        #[arg(short, long, default_value = "schedule.ics")]
        output: PathBuf,
        #[arg(long)]
        anchor: Option<SemesterAnchor>,
    },

    /// List the events in an .ics file written by this tool.
    Inspect { calendar: PathBuf },
}
