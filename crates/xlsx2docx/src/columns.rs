use crate::classify::rightmost_populated;
use crate::model::TableRegion;
use crate::worksheet::Worksheet;

/// Rightmost populated column across the region's rows, never less than one.
#[must_use]
pub fn effective_column_count(sheet: &Worksheet, region: TableRegion) -> usize {
    region
        .rows()
        .filter_map(|row| rightmost_populated(sheet.row(row)))
        .max()
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::effective_column_count;
    use crate::model::TableRegion;
    use crate::worksheet::{BorderStyle, Cell, Worksheet};

    #[test]
    fn widest_row_wins() {
        let sheet = Worksheet::from_text_rows(&[&["a", "b"], &["", "", "c", ""], &["d"]]);
        assert_eq!(effective_column_count(&sheet, TableRegion::new(1, 3)), 3);
        assert_eq!(effective_column_count(&sheet, TableRegion::new(1, 1)), 2);
    }

    #[test]
    fn blank_region_keeps_one_column() {
        let sheet = Worksheet::from_rows(vec![vec![
            Cell::empty().with_top_border(BorderStyle::Thin),
            Cell::empty().with_top_border(BorderStyle::Thin),
        ]]);
        assert_eq!(effective_column_count(&sheet, TableRegion::new(1, 1)), 1);
    }

    #[test]
    fn trailing_styled_blanks_do_not_widen() {
        let sheet = Worksheet::from_rows(vec![vec![
            Cell::text("a"),
            Cell::text("b"),
            Cell::empty().with_top_border(BorderStyle::Thin),
            Cell::text(" "),
        ]]);
        assert_eq!(effective_column_count(&sheet, TableRegion::new(1, 1)), 2);
    }
}
