use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    ExifDateTimeOriginal,
    ExifTagScan,
    FileModified,
    CurrentDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureDate {
    pub date: NaiveDate,
    pub source: DateSource,
}

impl CaptureDate {
    fn today() -> Self {
        Self {
            date: Local::now().date_naive(),
            source: DateSource::CurrentDate,
        }
    }
}

impl fmt::Display for CaptureDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))
    }
}

enum Lookup {
    Found(NaiveDate),
    NotFound,
}

/// EXIF readers, tried in order before the file's modification time.
#[derive(Debug, Clone, Copy)]
enum ExifStrategy {
    DateTimeOriginal,
    TagScan,
}

impl ExifStrategy {
    const CHAIN: [ExifStrategy; 2] = [ExifStrategy::DateTimeOriginal, ExifStrategy::TagScan];

    fn source(self) -> DateSource {
        match self {
            ExifStrategy::DateTimeOriginal => DateSource::ExifDateTimeOriginal,
            ExifStrategy::TagScan => DateSource::ExifTagScan,
        }
    }

    fn lookup(self, path: &Path) -> Lookup {
        let found = match self {
            ExifStrategy::DateTimeOriginal => read_exif_date(path),
            ExifStrategy::TagScan => scan_exif_tags(path),
        };
        found.map_or(Lookup::NotFound, Lookup::Found)
    }
}

/// Resolves the capture date of one image. Never fails: when the image cannot
/// be opened or its modification time is unavailable, a warning is logged and
/// today's date is returned.
pub fn resolve_capture_date(path: &Path) -> CaptureDate {
    match try_resolve(path) {
        Ok(date) => date,
        Err(err) => {
            warn!(
                "画像 {} の撮影日を取得できませんでした: {:#}",
                path.display(),
                err
            );
            CaptureDate::today()
        }
    }
}

fn try_resolve(path: &Path) -> Result<CaptureDate> {
    ensure_readable_image(path)?;

    for strategy in ExifStrategy::CHAIN {
        if let Lookup::Found(date) = strategy.lookup(path) {
            let source = strategy.source();
            debug!("{}: {:?} から撮影日を取得しました", path.display(), source);
            return Ok(CaptureDate { date, source });
        }
    }

    Ok(CaptureDate {
        date: file_modified_date(path)?,
        source: DateSource::FileModified,
    })
}

fn ensure_readable_image(path: &Path) -> Result<()> {
    let reader = ImageReader::open(path)
        .with_context(|| format!("画像を開けませんでした: {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("画像形式を判別できませんでした: {}", path.display()))?;
    if reader.format().is_none() {
        bail!("未対応の画像形式です: {}", path.display());
    }
    reader
        .into_dimensions()
        .with_context(|| format!("画像ヘッダを読めませんでした: {}", path.display()))?;
    Ok(())
}

fn read_exif_date(path: &Path) -> Option<NaiveDate> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut buf) {
        Ok(exif) => exif,
        Err(err) => {
            debug!("EXIFを解析できませんでした: {}: {}", path.display(), err);
            return None;
        }
    };

    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(values) => values
            .first()
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .and_then(parse_exif_datetime),
        _ => None,
    }
}

fn scan_exif_tags(path: &Path) -> Option<NaiveDate> {
    let exif = match rexif::parse_file(path) {
        Ok(exif) => exif,
        Err(err) => {
            debug!("EXIFタグを走査できませんでした: {}: {}", path.display(), err);
            return None;
        }
    };

    exif.entries
        .iter()
        .filter(|entry| entry.tag == rexif::ExifTag::DateTimeOriginal)
        .find_map(|entry| parse_exif_datetime(&entry.value_more_readable))
}

fn file_modified_date(path: &Path) -> Result<NaiveDate> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("更新日時を取得できませんでした: {}", path.display()))?;
    Ok(DateTime::<Local>::from(modified).date_naive())
}

/// Parses the EXIF `YYYY:MM:DD HH:MM:SS` literal into its calendar date.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDate> {
    let normalized = raw.trim_end_matches('\0').trim();
    NaiveDateTime::parse_from_str(normalized, EXIF_DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.date())
}
