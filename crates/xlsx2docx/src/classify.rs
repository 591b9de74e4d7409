use crate::worksheet::{BorderStyle, Cell};

/// True when any cell of the row has a drawn top border.
#[must_use]
pub fn has_top_border(cells: &[Cell]) -> bool {
    cells
        .iter()
        .any(|cell| cell.top_border.is_some_and(BorderStyle::is_drawn))
}

#[must_use]
pub fn non_empty_count(cells: &[Cell]) -> usize {
    cells.iter().filter(|cell| !cell.value.is_blank()).count()
}

/// Column (1-based) of the rightmost populated cell in the row.
#[must_use]
pub fn rightmost_populated(cells: &[Cell]) -> Option<usize> {
    cells
        .iter()
        .rposition(|cell| !cell.value.is_blank())
        .map(|index| index + 1)
}

#[cfg(test)]
mod tests {
    use super::{has_top_border, non_empty_count, rightmost_populated};
    use crate::worksheet::{BorderStyle, Cell};

    #[test]
    fn counts_only_populated_cells() {
        let row = vec![
            Cell::text("a"),
            Cell::empty(),
            Cell::text("  "),
            Cell::number(0.0),
        ];
        assert_eq!(non_empty_count(&row), 2);
        assert_eq!(rightmost_populated(&row), Some(4));
        assert_eq!(rightmost_populated(&[Cell::empty()]), None);
    }

    #[test]
    fn explicit_none_border_is_not_drawn() {
        let drawn = vec![Cell::empty(), Cell::empty().with_top_border(BorderStyle::Hair)];
        let undrawn = vec![Cell::text("x").with_top_border(BorderStyle::None)];
        assert!(has_top_border(&drawn));
        assert!(!has_top_border(&undrawn));
        assert!(!has_top_border(&[]));
    }
}
