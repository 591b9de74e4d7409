use tracing::debug;

use crate::columns::effective_column_count;
use crate::format::CellFormatter;
use crate::merge::project_merges;
use crate::model::{Alignment, Block, Document, OutputParagraph, RegionSummary, TableRegion};
use crate::options::ConvertOptions;
use crate::render::render_table;
use crate::table_detect::detect_regions;
use crate::warning::{ConversionWarning, WarningCode};
use crate::worksheet::Worksheet;

/// Tables and paragraphs for one worksheet, plus what was decided per region.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub document: Document,
    pub regions: Vec<RegionSummary>,
    pub warnings: Vec<ConversionWarning>,
}

/// Accepted merge instructions and column count for one region.
pub(crate) fn summarize_region(
    sheet: &Worksheet,
    region: TableRegion,
    table_id: usize,
    warnings: &mut Vec<ConversionWarning>,
) -> RegionSummary {
    let effective_columns = effective_column_count(sheet, region);
    let before = warnings.len();
    let merges = project_merges(
        sheet.merges(),
        region,
        effective_columns,
        table_id,
        warnings,
    );
    RegionSummary {
        region,
        effective_columns,
        merges,
        dropped_merges: warnings.len() - before,
    }
}

fn free_row_text(sheet: &Worksheet, formatter: &CellFormatter<'_>, row: usize) -> String {
    sheet
        .row(row)
        .iter()
        .map(|cell| formatter.format(&cell.view()))
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Walks every row once: detected regions become tables, the remaining
/// rows become one paragraph each when they carry any text.
#[must_use]
pub fn assemble(sheet: &Worksheet, options: &ConvertOptions) -> Assembly {
    let mut warnings = Vec::new();
    let mut blocks = Vec::new();
    let mut summaries = Vec::new();
    let formatter = CellFormatter::new(&options.date_format, sheet.date1904());

    let mut regions = detect_regions(sheet).into_iter().peekable();
    let mut cursor = 1;
    while cursor <= sheet.max_row() {
        if let Some(region) = regions.next_if(|region| region.start_row == cursor) {
            let table_id = summaries.len() + 1;
            let summary = summarize_region(sheet, region, table_id, &mut warnings);
            debug!(
                table_id,
                start = region.start_row,
                end = region.end_row,
                columns = summary.effective_columns,
                merges = summary.merges.len(),
                "rendering table region"
            );
            let table = render_table(
                sheet,
                region,
                summary.effective_columns,
                &summary.merges,
                options,
                table_id,
                &mut warnings,
            );
            if let Some(table) = table {
                blocks.push(Block::Table(table));
            }
            summaries.push(summary);
            cursor = region.end_row + 1;
            continue;
        }

        let text = free_row_text(sheet, &formatter, cursor);
        if !text.is_empty() || options.blank_row_paragraphs {
            blocks.push(Block::Paragraph(OutputParagraph {
                text,
                alignment: Alignment::Left,
            }));
        }
        cursor += 1;
    }

    if summaries.is_empty() && blocks.iter().any(is_text_block) {
        warnings.push(ConversionWarning::new(
            WarningCode::NoTablesDetected,
            "no table regions detected; every row was written as a paragraph",
        ));
    }

    Assembly {
        document: Document { blocks },
        regions: summaries,
        warnings,
    }
}

fn is_text_block(block: &Block) -> bool {
    matches!(block, Block::Paragraph(paragraph) if !paragraph.text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::assemble;
    use crate::model::{Block, BorderLine, Document, MergeRole, OutputTable, TableRegion};
    use crate::options::ConvertOptions;
    use crate::warning::WarningCode;
    use crate::worksheet::{BorderStyle, Cell, MergeRange, Worksheet};

    fn tables(document: &Document) -> Vec<&OutputTable> {
        document
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Table(table) => Some(table),
                Block::Paragraph(_) => None,
            })
            .collect()
    }

    #[test]
    fn two_by_two_sheet_becomes_one_bordered_table() {
        let sheet = Worksheet::from_text_rows(&[&["A", "B"], &["1", "2"]]);
        let assembly = assemble(&sheet, &ConvertOptions::default());

        assert_eq!(assembly.document.blocks.len(), 1);
        assert_eq!(assembly.regions.len(), 1);
        assert_eq!(assembly.regions[0].region, TableRegion::new(1, 2));
        assert_eq!(assembly.regions[0].effective_columns, 2);
        assert!(assembly.regions[0].merges.is_empty());

        let table = tables(&assembly.document)[0];
        assert_eq!((table.rows(), table.columns()), (2, 2));
        let first = table.cell(0, 0).borders;
        assert_eq!(first.top.map(|border| border.line), Some(BorderLine::Single));
        assert_eq!(first.bottom.map(|border| border.line), Some(BorderLine::Dotted));
        assert_eq!(first.right.map(|border| border.line), Some(BorderLine::Dotted));
        assert_eq!(
            table.cell(1, 0).borders.bottom.map(|border| border.line),
            Some(BorderLine::Single)
        );
    }

    #[test]
    fn title_row_becomes_paragraph_before_trailing_table() {
        let sheet = Worksheet::from_text_rows(&[&["Title"], &[], &["X", "Y", "Z"]]);
        let assembly = assemble(&sheet, &ConvertOptions::default());

        assert_eq!(assembly.document.blocks.len(), 2);
        let Block::Paragraph(title) = &assembly.document.blocks[0] else {
            panic!("first block should be a paragraph");
        };
        assert_eq!(title.text, "Title");
        let Block::Table(table) = &assembly.document.blocks[1] else {
            panic!("second block should be a table");
        };
        assert_eq!((table.rows(), table.columns()), (1, 3));
        assert!(assembly.warnings.is_empty());
    }

    #[test]
    fn contained_merge_is_applied() {
        let sheet = Worksheet::from_text_rows(&[
            &["h1", "h2"],
            &["a", "b"],
            &["c", "d"],
            &["e", "f"],
        ])
        .with_merge(MergeRange::from_bounds(2, 1, 3, 2));
        let assembly = assemble(&sheet, &ConvertOptions::default());

        let table = tables(&assembly.document)[0];
        assert_eq!(
            table.cell(1, 0).merge,
            Some(MergeRole::Anchor {
                row_span: 2,
                col_span: 2
            })
        );
        assert_eq!(table.cell(1, 0).absorbed, vec!["b", "c", "d"]);
    }

    #[test]
    fn merge_wider_than_table_leaves_cells_independent() {
        let sheet = Worksheet::from_text_rows(&[&["a", "b"], &["c", "d"]])
            .with_merge(MergeRange::from_bounds(1, 1, 1, 3));
        let assembly = assemble(&sheet, &ConvertOptions::default());

        let table = tables(&assembly.document)[0];
        assert!((0..2).all(|col| table.cell(0, col).merge.is_none()));
        assert_eq!(assembly.regions[0].dropped_merges, 1);
        assert_eq!(assembly.warnings[0].code, WarningCode::MergeDropped);
    }

    #[test]
    fn blank_sheet_has_no_blocks() {
        let assembly = assemble(&Worksheet::new(), &ConvertOptions::default());
        assert!(assembly.document.is_empty());
        assert!(assembly.regions.is_empty());
        assert!(assembly.warnings.is_empty());

        let spaced = Worksheet::from_text_rows(&[&[], &["", " "], &[]]);
        assert!(assemble(&spaced, &ConvertOptions::default()).document.is_empty());
    }

    #[test]
    fn free_row_joins_cells_with_spaces() {
        let sheet = Worksheet::from_rows(vec![vec![
            Cell::empty(),
            Cell::text("Total:"),
        ]]);
        let assembly = assemble(&sheet, &ConvertOptions::default());

        let Block::Paragraph(paragraph) = &assembly.document.blocks[0] else {
            panic!("row should become a paragraph");
        };
        assert_eq!(paragraph.text, "Total:");
        assert_eq!(assembly.warnings[0].code, WarningCode::NoTablesDetected);
    }

    #[test]
    fn blank_rows_can_emit_spacer_paragraphs() {
        let sheet = Worksheet::from_text_rows(&[&["Intro"], &[], &["a", "b"]]);
        let options = ConvertOptions {
            blank_row_paragraphs: true,
            ..ConvertOptions::default()
        };
        let assembly = assemble(&sheet, &options);

        assert_eq!(assembly.document.paragraph_count(), 2);
        assert_eq!(assembly.document.table_count(), 1);
    }

    #[test]
    fn bordered_blank_region_renders_empty_table() {
        let sheet = Worksheet::from_rows(vec![vec![
            Cell::empty().with_top_border(BorderStyle::Thin),
        ]]);
        let assembly = assemble(&sheet, &ConvertOptions::default());

        let table = tables(&assembly.document)[0];
        assert_eq!((table.rows(), table.columns()), (1, 1));
        assert!(table.cell(0, 0).text.is_empty());
    }
}
