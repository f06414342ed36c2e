use crate::date_resolver::{resolve_capture_date, DateSource};
use crate::font::WatermarkFont;
use crate::render::add_watermark;
use crate::watermark::WatermarkSpec;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];
const OUTPUT_SUFFIX: &str = "_watermark";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub output: PathBuf,
    pub date: String,
    pub date_source: DateSource,
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub candidates: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub font: String,
    pub files: Vec<FileOutcome>,
    pub stats: BatchStats,
}

/// Watermarks `input` (a file or a flat directory of images) into
/// `<input>_watermark`. Only a missing input aborts; per-file failures are
/// logged and recorded in the report.
pub fn process_path(input: &Path, spec: &WatermarkSpec) -> Result<BatchReport> {
    if !input.exists() {
        bail!("入力パスが存在しません: {}", input.display());
    }

    let output_dir = output_dir_for(input);
    fs::create_dir_all(&output_dir).with_context(|| {
        format!(
            "出力フォルダを作成できませんでした: {}",
            output_dir.display()
        )
    })?;

    let candidates = collect_candidates(input);
    let font = WatermarkFont::load(spec.font_size, &spec.font_paths);

    let mut stats = BatchStats {
        candidates: candidates.len(),
        ..BatchStats::default()
    };
    let mut files = Vec::with_capacity(candidates.len());

    for source in candidates {
        let outcome = process_file(&source, &output_dir, spec, &font);
        if outcome.succeeded() {
            stats.succeeded += 1;
        } else {
            stats.failed += 1;
        }
        files.push(outcome);
    }

    Ok(BatchReport {
        input: input.to_path_buf(),
        output_dir,
        font: font.describe(),
        files,
        stats,
    })
}

fn process_file(
    source: &Path,
    output_dir: &Path,
    spec: &WatermarkSpec,
    font: &WatermarkFont,
) -> FileOutcome {
    let capture = resolve_capture_date(source);
    let text = capture.to_string();
    let output = output_dir.join(output_file_name(
        source.file_name().unwrap_or_else(|| source.as_os_str()),
    ));

    let error = match add_watermark(source, &output, &text, font, spec.color, spec.position) {
        Ok(()) => {
            info!("透かしを追加しました: {} -> {}", source.display(), output.display());
            None
        }
        Err(err) => {
            error!("画像 {} の処理に失敗しました: {:#}", source.display(), err);
            Some(format!("{:#}", err))
        }
    };

    FileOutcome {
        source: source.to_path_buf(),
        output,
        date: text,
        date_source: capture.source,
        error,
    }
}

/// Files to stamp: the input itself when it is a file, otherwise the direct
/// children with an image extension, sorted by path. Listing errors are
/// logged and skipped.
pub fn collect_candidates(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }

    let entries = match fs::read_dir(input) {
        Ok(entries) => entries,
        Err(err) => {
            error!("フォルダを読めませんでした: {}: {}", input.display(), err);
            return Vec::new();
        }
    };

    let mut out: Vec<PathBuf> = readable_entries(input, entries)
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| has_image_extension(path) && path.is_file())
        .collect();
    out.sort();
    out
}

fn readable_entries<T>(dir: &Path, entries: impl IntoIterator<Item = io::Result<T>>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                error!("エントリ読み取り失敗: {}: {}", dir.display(), err);
                None
            }
        })
        .collect()
}

pub fn output_dir_for(input: &Path) -> PathBuf {
    match input.file_name() {
        Some(name) => {
            let mut name = name.to_os_string();
            name.push(OUTPUT_SUFFIX);
            input.with_file_name(name)
        }
        None => {
            let mut raw = input.as_os_str().to_os_string();
            raw.push(OUTPUT_SUFFIX);
            PathBuf::from(raw)
        }
    }
}

/// `IMG_0001.JPG` -> `IMG_0001_watermark.JPG`.
pub fn output_file_name(file_name: &OsStr) -> OsString {
    let path = Path::new(file_name);
    let mut out = path
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| file_name.to_os_string());
    out.push(OUTPUT_SUFFIX);
    if let Some(ext) = path.extension() {
        out.push(".");
        out.push(ext);
    }
    out
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
