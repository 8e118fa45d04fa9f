use anyhow::{anyhow, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::log;
use crate::paths::get_tesseract_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const SYSTEM_EXECUTABLES: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];
#[cfg(not(windows))]
const SYSTEM_EXECUTABLES: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

#[cfg(windows)]
const SYSTEM_TESSDATA: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];
#[cfg(not(windows))]
const SYSTEM_TESSDATA: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Locates Tesseract and the trained data for `language`, downloading the
/// data file into the local data directory when no installation carries it.
pub fn ensure_tesseract(language: &str) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;

    if let Some(tessdata) = find_tessdata_dir(language) {
        log(&format!(
            "Tesseract at {} with tessdata {}",
            executable.display(),
            tessdata.display()
        ));
        return Ok(TesseractPaths {
            executable,
            tessdata,
        });
    }

    log(&format!("{}.traineddata not found, downloading...", language));
    let tessdata = get_tesseract_dir().join("tessdata");
    fs::create_dir_all(&tessdata)?;
    download_tessdata(&tessdata, language)?;

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Downloads `<language>.traineddata` from the tessdata repository.
fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let url = format!("{}/{}.traineddata", TESSDATA_REPO, language);
    let target = tessdata_dir.join(format!("{}.traineddata", language));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "schedule-snap")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            language,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&target)?;
    file.write_all(&bytes)?;

    log(&format!(
        "Downloaded {}.traineddata ({} bytes)",
        language,
        bytes.len()
    ));

    Ok(())
}

/// Finds the Tesseract executable: PATH first, then well-known install locations.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    let local = get_tesseract_dir().join(if cfg!(windows) {
        "tesseract.exe"
    } else {
        "tesseract"
    });
    if local.exists() {
        return Ok(local);
    }

    SYSTEM_EXECUTABLES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory holding `<language>.traineddata`.
pub fn find_tessdata_dir(language: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }
    candidates.push(get_tesseract_dir().join("tessdata"));
    candidates.extend(SYSTEM_TESSDATA.iter().map(PathBuf::from));

    first_with_traineddata(candidates, language)
}

fn first_with_traineddata(candidates: Vec<PathBuf>, language: &str) -> Option<PathBuf> {
    let file = format!("{}.traineddata", language);
    candidates.into_iter().find(|dir| dir.join(&file).exists())
}
