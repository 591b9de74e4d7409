use tracing::warn;

use crate::format::{CellFormatter, format_number};
use crate::model::{
    Alignment, Border, BorderLine, CellBorders, MergeConflict, MergeInstruction, OutputTable,
    TableRegion,
};
use crate::options::{AlignmentPolicy, ConvertOptions};
use crate::warning::{ConversionWarning, WarningCode};
use crate::worksheet::{CellView, Worksheet};

fn cell_alignment(
    policy: AlignmentPolicy,
    numeric: bool,
    row_offset: usize,
    col: usize,
) -> Alignment {
    if policy == AlignmentPolicy::LegacyHeaderCentered && (row_offset == 0 || col == 0) {
        return Alignment::Center;
    }
    if numeric {
        Alignment::Right
    } else {
        Alignment::Left
    }
}

/// Reads displayed text the way the legacy layout does: thousands
/// separators are ignored and at most one decimal point is allowed.
fn legacy_number(text: &str) -> Option<f64> {
    let plain = text.trim().replace(',', "");
    if plain.is_empty() || plain.matches('.').count() > 1 {
        return None;
    }
    plain.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Fills text and number flag of one output cell from its source cell.
fn fill_cell(
    formatter: &CellFormatter<'_>,
    policy: AlignmentPolicy,
    source: &CellView<'_>,
) -> (String, bool) {
    let text = formatter.format(source);
    if policy == AlignmentPolicy::LegacyHeaderCentered
        && let Some(value) = legacy_number(&text)
    {
        return (format_number(value, Some("#,##0.00")), true);
    }
    let numeric = source.is_numeric();
    (text, numeric)
}

pub(crate) fn render_table(
    sheet: &Worksheet,
    region: TableRegion,
    effective_columns: usize,
    instructions: &[MergeInstruction],
    options: &ConvertOptions,
    table_id: usize,
    warnings: &mut Vec<ConversionWarning>,
) -> Option<OutputTable> {
    let rows = region.row_count();
    if rows == 0 || effective_columns == 0 {
        return None;
    }

    let formatter = CellFormatter::new(&options.date_format, sheet.date1904());
    let mut table = OutputTable::new(rows, effective_columns);

    for (offset, source_row) in region.rows().enumerate() {
        for col in 0..effective_columns {
            let source = sheet.cell(source_row, col + 1);
            let (text, numeric) = fill_cell(&formatter, options.alignment, &source);
            let cell = table.cell_mut(offset, col);
            cell.text = text;
            cell.numeric = numeric;
            cell.alignment = cell_alignment(options.alignment, numeric, offset, col);
        }
    }

    for instruction in instructions {
        let outcome = table.merge(
            instruction.top_row_offset,
            instruction.left_col - 1,
            instruction.row_span,
            instruction.col_span,
        );
        if let Err(conflict) = outcome {
            let row = region.start_row + instruction.top_row_offset;
            warn!(row, col = instruction.left_col, ?conflict, "skipping merge");
            let reason = match conflict {
                MergeConflict::AlreadyMerged => "overlaps another merge",
                MergeConflict::OutOfBounds => "falls outside the table",
            };
            warnings.push(
                ConversionWarning::new(
                    WarningCode::MergeOverlap,
                    format!(
                        "merge at row {row} column {} {reason}",
                        instruction.left_col
                    ),
                )
                .with_row(row)
                .with_table_id(table_id),
            );
        }
    }

    draw_borders(
        &mut table,
        options.thick_border_eighths,
        options.dotted_border_eighths,
    );
    Some(table)
}

/// Thick top on the first row, thick bottom on the last, dotted row and
/// column separators inside, no outer left or right edge.
pub(crate) fn draw_borders(table: &mut OutputTable, thick: u8, dotted: u8) {
    let thick = Border {
        line: BorderLine::Single,
        size: thick,
    };
    let dotted = Border {
        line: BorderLine::Dotted,
        size: dotted,
    };
    let last_row = table.rows().saturating_sub(1);
    let last_col = table.columns().saturating_sub(1);

    for row in 0..table.rows() {
        for col in 0..table.columns() {
            let right_edge = table
                .group_of(row, col)
                .map_or(col, |group| group.last_col());
            table.cell_mut(row, col).borders = CellBorders {
                top: (row == 0).then_some(thick),
                bottom: Some(if row == last_row { thick } else { dotted }),
                right: (right_edge != last_col).then_some(dotted),
            };
        }
    }
}
