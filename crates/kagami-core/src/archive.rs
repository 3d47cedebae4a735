//! Batch export of completed jobs into a single ZIP archive.

use std::collections::HashSet;
use std::io::{self, Cursor, Write};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::encode::OutputFormat;
use crate::job::ConversionJob;

/// Leading part of every archive file name.
pub const ARCHIVE_PREFIX: &str = "kagami";

/// Errors from building an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Nothing to export: no job is completed with a non-empty output.
    #[error("No completed conversions to export")]
    NoCompletedJobs,

    #[error("Failed to write archive: {0}")]
    Zip(#[from] ZipError),

    #[error("Failed to write archive entry: {0}")]
    Io(#[from] io::Error),
}

/// A finished archive ready to be saved.
#[derive(Debug, Clone)]
pub struct Archive {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// Entry names in the order they were written.
    pub entries: Vec<String>,
}

/// Download name for a converted file.
///
/// The last extension of `original` is replaced by the format's canonical
/// extension. A dot-file counts as all extension (`.hidden` becomes `.png`);
/// names with a trailing dot or no extension at all are kept whole.
///
/// # Example
///
/// ```ignore
/// assert_eq!(output_filename("photo.png", OutputFormat::Jpeg), "photo.jpg");
/// ```
pub fn output_filename(original: &str, format: OutputFormat) -> String {
    format!("{}.{}", strip_extension(original), format.extension())
}

/// `kagami_YYYY-MM-DD.zip`.
pub fn archive_filename(date: NaiveDate) -> String {
    format!("{ARCHIVE_PREFIX}_{}.zip", date.format("%Y-%m-%d"))
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}

/// Assign every candidate name a unique entry name.
///
/// The first occurrence keeps its name; later ones get `_1`, `_2`, ...
/// before the extension, skipping any name already taken.
fn unique_names<I>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut used = HashSet::new();
    let mut names = Vec::new();

    for candidate in candidates {
        let name = if used.contains(&candidate) {
            let (base, ext) = match candidate.rfind('.') {
                Some(dot) => (&candidate[..dot], &candidate[dot..]),
                None => (candidate.as_str(), ""),
            };
            let mut counter = 1u32;
            loop {
                let next = format!("{base}_{counter}{ext}");
                if !used.contains(&next) {
                    break next;
                }
                counter += 1;
            }
        } else {
            candidate
        };
        used.insert(name.clone());
        names.push(name);
    }
    names
}

/// Build an archive dated today (local time).
///
/// See [`build_archive_on`].
pub fn build_archive<'a, I>(jobs: I, format: OutputFormat) -> Result<Archive, ArchiveError>
where
    I: IntoIterator<Item = &'a ConversionJob>,
{
    build_archive_on(jobs, format, chrono::Local::now().date_naive())
}

/// Build an archive of every completed job with output, dated `date`.
///
/// Each entry is named after its job with the extension of the format the
/// job was converted to, or `format` when that is not recorded. Entries are
/// stored uncompressed since the images are compressed already.
///
/// # Errors
///
/// Returns `ArchiveError::NoCompletedJobs` when nothing qualifies, before
/// any archive is started.
pub fn build_archive_on<'a, I>(
    jobs: I,
    format: OutputFormat,
    date: NaiveDate,
) -> Result<Archive, ArchiveError>
where
    I: IntoIterator<Item = &'a ConversionJob>,
{
    let completed: Vec<&ConversionJob> = jobs.into_iter().filter(|job| job.has_output()).collect();
    if completed.is_empty() {
        return Err(ArchiveError::NoCompletedJobs);
    }

    let entries = unique_names(
        completed
            .iter()
            .map(|job| output_filename(&job.name, job.output_format.unwrap_or(format))),
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (job, name) in completed.iter().zip(&entries) {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file(name.as_str(), options)?;
        writer.write_all(job.output.as_deref().unwrap_or_default())?;
    }
    let bytes = writer.finish()?.into_inner();

    let filename = archive_filename(date);
    info!(%filename, files = entries.len(), bytes = bytes.len(), "archive built");

    Ok(Archive {
        bytes,
        filename,
        entries,
    })
}
