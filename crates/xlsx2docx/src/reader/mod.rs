//! Spreadsheet input: container sniffing plus the two workbook readers.

mod xls;
mod xlsx;

use std::path::Path;

use tracing::debug;

use crate::error::ConvertError;
use crate::warning::ConversionWarning;
use crate::worksheet::Worksheet;

pub use xls::read_xls;
pub use xlsx::read_xlsx;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Office Open XML workbook (`.xlsx`, `.xlsm`).
    Xlsx,
    /// BIFF8 compound-file workbook (`.xls`).
    Xls,
}

impl SourceFormat {
    /// Picks the reader from the leading bytes, then from the name's extension.
    pub fn detect(bytes: &[u8], name_hint: Option<&str>) -> Result<Self, ConvertError> {
        if bytes.starts_with(ZIP_MAGIC) {
            return Ok(Self::Xlsx);
        }
        if bytes.starts_with(OLE_MAGIC) {
            return Ok(Self::Xls);
        }

        let extension = name_hint
            .and_then(|name| Path::new(name).extension())
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("xlsx" | "xlsm") => Ok(Self::Xlsx),
            Some("xls") => Ok(Self::Xls),
            _ => Err(ConvertError::UnsupportedFormat(
                name_hint.map_or_else(
                    || "input is neither an xlsx nor an xls workbook".to_string(),
                    |name| format!("{name} is neither an xlsx nor an xls workbook"),
                ),
            )),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
        }
    }
}

/// First worksheet of a workbook together with reader-level warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRead {
    pub format: SourceFormat,
    pub worksheet: Worksheet,
    pub warnings: Vec<ConversionWarning>,
}

pub fn read_worksheet(bytes: &[u8], name_hint: Option<&str>) -> Result<SheetRead, ConvertError> {
    let format = SourceFormat::detect(bytes, name_hint)?;
    debug!(format = format.as_str(), size = bytes.len(), "reading workbook");
    match format {
        SourceFormat::Xlsx => Ok(SheetRead {
            format,
            worksheet: read_xlsx(bytes)?,
            warnings: Vec::new(),
        }),
        SourceFormat::Xls => {
            let (worksheet, warning) = read_xls(bytes)?;
            Ok(SheetRead {
                format,
                worksheet,
                warnings: vec![warning],
            })
        }
    }
}
