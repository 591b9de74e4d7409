use std::io::Cursor;

use calamine::{Data, Reader, Xls, open_workbook_from_rs};
use tracing::warn;

use crate::error::ConvertError;
use crate::warning::{ConversionWarning, WarningCode};
use crate::worksheet::{Cell, CellValue, MergeRange, Worksheet};

/// Reads values and merges of the first sheet of a legacy workbook.
///
/// The binary format's border records are not exposed by the reader, so
/// every cell comes back without a top border and region detection relies
/// on cell density alone. The returned warning says so.
pub fn read_xls(bytes: &[u8]) -> Result<(Worksheet, ConversionWarning), ConvertError> {
    let mut workbook: Xls<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ConvertError::NoWorksheet)?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut worksheet = Worksheet::new();

    for (row, col, data) in range.used_cells() {
        let Some(cell) = convert_cell(data) else {
            continue;
        };
        // used_cells() is relative to range.start(); the model is 1-based
        let row = start_row as usize + row + 1;
        let col = start_col as usize + col + 1;
        worksheet.set_cell(row, col, cell);
    }

    if let Some(merges) = workbook.worksheet_merge_cells(&sheet_name) {
        for dimensions in merges {
            let merge = MergeRange::from_bounds(
                dimensions.start.0 as usize + 1,
                dimensions.start.1 as usize + 1,
                dimensions.end.0 as usize + 1,
                dimensions.end.1 as usize + 1,
            );
            if merge.row_span > 1 || merge.col_span > 1 {
                worksheet.add_merge(merge);
            }
        }
    }

    warn!(sheet = %sheet_name, "xls input carries no border data; using density detection only");
    let warning = ConversionWarning::new(
        WarningCode::LegacyFormatWithoutBorders,
        format!("sheet '{sheet_name}' was read from an xls file without border information"),
    );
    Ok((worksheet, warning))
}

#[allow(clippy::cast_precision_loss)]
fn convert_cell(data: &Data) -> Option<Cell> {
    let cell = match data {
        Data::Empty => return None,
        Data::String(text) => Cell::text(text.clone()),
        Data::Float(value) => Cell::number(*value),
        Data::Int(value) => Cell::number(*value as f64),
        Data::Bool(value) => Cell::boolean(*value),
        Data::Error(error) => Cell {
            value: CellValue::Error(error.to_string()),
            ..Cell::default()
        },
        Data::DateTime(value) => Cell::number(value.as_f64()).as_date(),
        Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::text(text.clone()),
    };
    Some(cell)
}

#[cfg(test)]
mod tests {
    use calamine::{CellErrorType, Data};

    use super::{convert_cell, read_xls};
    use crate::error::ConvertError;
    use crate::worksheet::CellValue;

    #[test]
    fn converts_calamine_values() {
        assert!(convert_cell(&Data::Empty).is_none());
        assert_eq!(
            convert_cell(&Data::Int(42)).map(|cell| cell.value),
            Some(CellValue::Number(42.0))
        );
        assert_eq!(
            convert_cell(&Data::String("Total".to_string())).map(|cell| cell.value),
            Some(CellValue::Text("Total".to_string()))
        );
        assert_eq!(
            convert_cell(&Data::Error(CellErrorType::Div0)).map(|cell| cell.value),
            Some(CellValue::Error("#DIV/0!".to_string()))
        );
    }

    #[test]
    fn garbage_is_a_read_error() {
        let error = read_xls(b"definitely not a compound file")
            .expect_err("garbage should not parse");
        assert!(matches!(error, ConvertError::Xls(_)));
    }
}
