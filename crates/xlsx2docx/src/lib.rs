mod assemble;
mod batch;
mod classify;
mod columns;
mod csv_out;
mod docx_out;
mod error;
mod format;
mod merge;
mod model;
mod options;
mod reader;
mod render;
mod table_detect;
mod warning;
mod worksheet;

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::assemble::summarize_region;

pub use assemble::{Assembly, assemble};
pub use batch::{BatchInput, BatchReport, FileOutcome, convert_batch, output_entry_name};
pub use classify::{has_top_border, non_empty_count};
pub use columns::effective_column_count;
pub use csv_out::{region_csv_string, write_region_csv};
pub use docx_out::{DOCX_CONTENT_TYPE, write_docx};
pub use error::ConvertError;
pub use format::{CellFormatter, excel_serial_to_datetime, format_number, is_date_format};
pub use model::{
    Alignment, Block, Border, BorderLine, CellBorders, Document, MergeInstruction, MergeRole,
    OutputCell, OutputParagraph, OutputTable, RegionSummary, TableRegion,
};
pub use options::{AlignmentPolicy, ConvertOptions, ParagraphSpacing};
pub use reader::{SheetRead, SourceFormat, read_worksheet};
pub use table_detect::detect_regions;
pub use warning::{ConversionWarning, WarningCode};
pub use worksheet::{BorderStyle, Cell, CellValue, CellView, MergeRange, Worksheet};

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub table_count: usize,
    pub paragraph_count: usize,
    pub regions: Vec<RegionSummary>,
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionReport {
    /// True when the document has no tables and no paragraphs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table_count == 0 && self.paragraph_count == 0
    }
}

/// Success flag plus a readable message, as reported per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub success: bool,
    pub error_message: Option<String>,
}

impl ConversionOutcome {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    #[must_use]
    pub fn failed(error: &ConvertError) -> Self {
        Self {
            success: false,
            error_message: Some(error.to_string()),
        }
    }
}

impl<T> From<&Result<T, ConvertError>> for ConversionOutcome {
    fn from(result: &Result<T, ConvertError>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(error) => Self::failed(error),
        }
    }
}

/// Converts an in-memory worksheet into docx bytes.
pub fn convert_worksheet(
    sheet: &Worksheet,
    options: &ConvertOptions,
) -> Result<(Vec<u8>, ConversionReport), ConvertError> {
    options.validate()?;

    let Assembly {
        document,
        regions,
        warnings,
    } = assemble(sheet, options);
    let docx = write_docx(&document, options)?;

    let report = ConversionReport {
        table_count: document.table_count(),
        paragraph_count: document.paragraph_count(),
        regions,
        warnings,
    };
    info!(
        tables = report.table_count,
        paragraphs = report.paragraph_count,
        warnings = report.warnings.len(),
        "worksheet converted"
    );
    Ok((docx, report))
}

/// Reads the first worksheet of `bytes` and converts it.
pub fn convert_bytes(
    bytes: &[u8],
    name_hint: Option<&str>,
    options: &ConvertOptions,
) -> Result<(Vec<u8>, ConversionReport), ConvertError> {
    let SheetRead {
        worksheet,
        warnings: read_warnings,
        ..
    } = read_worksheet(bytes, name_hint)?;
    let (docx, mut report) = convert_worksheet(&worksheet, options)?;
    let mut warnings = read_warnings;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    Ok((docx, report))
}

/// Converts `input` and writes the document to `output`.
///
/// Nothing is written unless conversion succeeds; a failed write removes
/// whatever part of `output` was created.
pub fn convert_file(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConversionReport, ConvertError> {
    let bytes = fs::read(input)?;
    let name_hint = input.file_name().and_then(|name| name.to_str());
    let (docx, report) = convert_bytes(&bytes, name_hint, options)?;

    if let Err(error) = fs::write(output, &docx) {
        if let Err(cleanup) = fs::remove_file(output)
            && cleanup.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %output.display(), %cleanup, "could not remove partial output");
        }
        return Err(error.into());
    }
    Ok(report)
}

/// Boundary form of [`convert_file`]: never fails, reports instead.
#[must_use]
pub fn convert(input: &Path, output: &Path, options: &ConvertOptions) -> ConversionOutcome {
    let result = convert_file(input, output, options);
    if let Err(error) = &result {
        warn!(input = %input.display(), %error, "conversion failed");
    }
    ConversionOutcome::from(&result)
}

/// Detected regions with their column counts and accepted merges, without
/// rendering a document.
pub fn analyze_regions(
    bytes: &[u8],
    name_hint: Option<&str>,
) -> Result<(Vec<RegionSummary>, Vec<ConversionWarning>), ConvertError> {
    let SheetRead {
        worksheet,
        mut warnings,
        ..
    } = read_worksheet(bytes, name_hint)?;
    let regions = detect_regions(&worksheet)
        .into_iter()
        .enumerate()
        .map(|(index, region)| summarize_region(&worksheet, region, index + 1, &mut warnings))
        .collect();
    Ok((regions, warnings))
}

#[cfg(test)]
mod tests {
    use super::{ConversionOutcome, ConvertError, ConvertOptions, Worksheet, convert_worksheet};

    #[test]
    fn outcome_mirrors_result() {
        let ok: Result<(), ConvertError> = Ok(());
        assert_eq!(ConversionOutcome::from(&ok), ConversionOutcome::ok());

        let failed: Result<(), ConvertError> = Err(ConvertError::NoWorksheet);
        let outcome = ConversionOutcome::from(&failed);
        assert!(!outcome.success);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("workbook has no worksheets")
        );
    }

    #[test]
    fn rejects_invalid_options_before_converting() {
        let options = ConvertOptions {
            font_size_half_points: 0,
            ..ConvertOptions::default()
        };
        let error = convert_worksheet(&Worksheet::new(), &options)
            .expect_err("zero font size should be rejected");
        assert!(matches!(error, ConvertError::InvalidOption(_)));
    }

    #[test]
    fn report_counts_blocks() {
        let sheet = Worksheet::from_text_rows(&[&["Quarterly"], &["a", "b"], &["1", "2"]]);
        let (docx, report) =
            convert_worksheet(&sheet, &ConvertOptions::default()).expect("conversion should work");

        assert!(docx.starts_with(b"PK"));
        assert_eq!(report.table_count, 1);
        assert_eq!(report.paragraph_count, 1);
        assert_eq!(report.regions.len(), 1);
        assert!(!report.is_empty());
    }
}
