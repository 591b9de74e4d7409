use tracing::debug;

use crate::classify::{has_top_border, non_empty_count};
use crate::model::TableRegion;
use crate::worksheet::Worksheet;

/// Populated cells needed for a borderless row to read as tabular.
pub(crate) const MIN_DENSE_CELLS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    Outside,
    Inside { start: usize },
}

fn is_table_signal(sheet: &Worksheet, row: usize) -> bool {
    let cells = sheet.row(row);
    has_top_border(cells) || non_empty_count(cells) >= MIN_DENSE_CELLS
}

/// Scans rows top to bottom and returns disjoint, increasing table regions.
///
/// A row opens a region when it carries a drawn top border or at least two
/// populated cells; an open region closes on the first row with neither.
#[must_use]
pub fn detect_regions(sheet: &Worksheet) -> Vec<TableRegion> {
    let mut regions = Vec::new();
    let mut state = DetectorState::Outside;

    for row in 1..=sheet.max_row() {
        let signal = is_table_signal(sheet, row);
        state = match (state, signal) {
            (DetectorState::Outside, true) => DetectorState::Inside { start: row },
            (DetectorState::Inside { start }, false) => {
                regions.push(TableRegion::new(start, row - 1));
                DetectorState::Outside
            }
            (unchanged, _) => unchanged,
        };
    }

    if let DetectorState::Inside { start } = state {
        regions.push(TableRegion::new(start, sheet.max_row()));
    }

    debug!(count = regions.len(), "table regions detected");
    regions
}
