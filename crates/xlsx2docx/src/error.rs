use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("zip container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("failed to read legacy workbook: {0}")]
    Xls(#[from] calamine::XlsError),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("malformed workbook part {part}: {reason}")]
    MalformedPart { part: String, reason: String },

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl ConvertError {
    pub(crate) fn malformed(part: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPart {
            part: part.to_string(),
            reason: reason.into(),
        }
    }
}
