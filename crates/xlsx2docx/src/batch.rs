use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::Path;

use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ConvertError;
use crate::options::ConvertOptions;
use crate::{ConversionOutcome, ConversionReport, convert_bytes};

/// One uploaded or listed spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl BatchInput {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub name: String,
    /// Archive entry written for this input, when conversion succeeded.
    pub entry: Option<String>,
    pub outcome: ConversionOutcome,
    pub report: Option<ConversionReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub archive: Vec<u8>,
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.files
            .iter()
            .filter(|file| file.outcome.success)
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }
}

/// `<stem>.docx` for an input file name, ignoring any directories.
#[must_use]
pub fn output_entry_name(input_name: &str) -> String {
    let file_name = input_name.rsplit(['/', '\\']).next().unwrap_or(input_name);
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("document");
    format!("{stem}.docx")
}

/// Converts every input independently and zips the successful documents.
///
/// A failing input is recorded and skipped. Inputs sharing a stem map to the
/// same entry; the last successful one wins.
pub fn convert_batch(
    inputs: &[BatchInput],
    options: &ConvertOptions,
) -> Result<BatchReport, ConvertError> {
    let mut entries: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut files = Vec::with_capacity(inputs.len());

    for input in inputs {
        match convert_bytes(&input.bytes, Some(&input.name), options) {
            Ok((docx, report)) => {
                let entry = output_entry_name(&input.name);
                if entries.insert(entry.clone(), docx).is_some() {
                    warn!(entry = %entry, input = %input.name, "replacing earlier batch entry");
                }
                files.push(FileOutcome {
                    name: input.name.clone(),
                    entry: Some(entry),
                    outcome: ConversionOutcome::ok(),
                    report: Some(report),
                });
            }
            Err(error) => {
                warn!(input = %input.name, %error, "batch input failed");
                files.push(FileOutcome {
                    name: input.name.clone(),
                    entry: None,
                    outcome: ConversionOutcome::failed(&error),
                    report: None,
                });
            }
        }
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    for (entry, bytes) in &entries {
        zip.start_file(entry.as_str(), file_options)?;
        zip.write_all(bytes)?;
    }
    let archive = zip.finish()?.into_inner();

    let report = BatchReport { archive, files };
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        entries = entries.len(),
        "batch finished"
    );
    Ok(report)
}
