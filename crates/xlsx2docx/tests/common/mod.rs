use std::path::Path;

use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet, XlsxError};

/// Writes `value` as a number when it parses as one, otherwise as a string.
/// Empty strings leave the cell absent.
pub fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &str,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    if value.is_empty() {
        if let Some(format) = format {
            worksheet.write_blank(row, col, format)?;
        }
        return Ok(());
    }

    match (value.parse::<f64>(), format) {
        (Ok(number), Some(format)) => worksheet.write_number_with_format(row, col, number, format)?,
        (Ok(number), None) => worksheet.write_number(row, col, number)?,
        (Err(_), Some(format)) => worksheet.write_string_with_format(row, col, value, format)?,
        (Err(_), None) => worksheet.write_string(row, col, value)?,
    };
    Ok(())
}

/// Workbook bytes built by `build` on the first worksheet.
pub fn xlsx_bytes(
    build: impl FnOnce(&mut Worksheet) -> Result<(), XlsxError>,
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    build(worksheet)?;
    workbook.save_to_buffer()
}

/// Plain grid of values, row by row, no borders.
pub fn create_test_xlsx(path: &Path, rows: &[&[&str]]) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = xlsx_bytes(|worksheet| {
        for (row, values) in (0_u32..).zip(rows.iter()) {
            for (col, value) in (0_u16..).zip(values.iter()) {
                write_value(worksheet, row, col, value, None)?;
            }
        }
        Ok(())
    })?;
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn top_border() -> Format {
    Format::new().set_border_top(FormatBorder::Thin)
}
