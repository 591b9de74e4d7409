use tracing::debug;

use crate::model::{MergeInstruction, TableRegion};
use crate::warning::{ConversionWarning, WarningCode};
use crate::worksheet::MergeRange;

/// Translates merges fully inside `region` into region-relative instructions.
///
/// Merges that cross the region boundary are ignored; merges reaching past
/// `effective_columns` are dropped with a warning rather than clipped.
pub(crate) fn project_merges(
    merges: &[MergeRange],
    region: TableRegion,
    effective_columns: usize,
    table_id: usize,
    warnings: &mut Vec<ConversionWarning>,
) -> Vec<MergeInstruction> {
    let mut instructions = merges
        .iter()
        .filter(|merge| merge.top >= region.start_row && merge.bottom() <= region.end_row)
        .filter_map(|merge| {
            let instruction = MergeInstruction {
                top_row_offset: merge.top - region.start_row,
                left_col: merge.left,
                row_span: merge.row_span,
                col_span: merge.col_span,
            };
            if instruction.right_col() > effective_columns {
                debug!(
                    row = merge.top,
                    col = merge.left,
                    right = instruction.right_col(),
                    effective_columns,
                    "dropping merge wider than table"
                );
                warnings.push(
                    ConversionWarning::new(
                        WarningCode::MergeDropped,
                        format!(
                            "merge at row {} columns {}-{} exceeds the table's {} column(s)",
                            merge.top,
                            merge.left,
                            merge.right(),
                            effective_columns
                        ),
                    )
                    .with_row(merge.top)
                    .with_table_id(table_id),
                );
                return None;
            }
            Some(instruction)
        })
        .collect::<Vec<_>>();

    instructions.sort_by_key(|instruction| (instruction.top_row_offset, instruction.left_col));
    instructions
}

#[cfg(test)]
mod tests {
    use super::project_merges;
    use crate::model::{MergeInstruction, TableRegion};
    use crate::warning::WarningCode;
    use crate::worksheet::MergeRange;

    #[test]
    fn accepts_contained_merge_within_columns() {
        let merges = vec![MergeRange::from_bounds(2, 1, 3, 2)];
        let mut warnings = Vec::new();

        let instructions = project_merges(&merges, TableRegion::new(1, 4), 2, 1, &mut warnings);

        assert_eq!(
            instructions,
            vec![MergeInstruction {
                top_row_offset: 1,
                left_col: 1,
                row_span: 2,
                col_span: 2,
            }]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn drops_merge_wider_than_effective_columns() {
        let merges = vec![MergeRange::from_bounds(1, 1, 1, 3)];
        let mut warnings = Vec::new();

        let instructions = project_merges(&merges, TableRegion::new(1, 2), 2, 1, &mut warnings);

        assert!(instructions.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WarningCode::MergeDropped);
        assert_eq!(warnings[0].table_id, Some(1));
    }

    #[test]
    fn rejects_merges_crossing_region_edges() {
        let merges = vec![
            MergeRange::from_bounds(1, 1, 2, 1),
            MergeRange::from_bounds(4, 1, 5, 1),
            MergeRange::from_bounds(8, 1, 9, 2),
        ];
        let mut warnings = Vec::new();

        let instructions = project_merges(&merges, TableRegion::new(2, 4), 3, 1, &mut warnings);

        assert!(instructions.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn instructions_are_ordered_by_position() {
        let merges = vec![
            MergeRange::from_bounds(3, 1, 3, 2),
            MergeRange::from_bounds(1, 2, 2, 2),
        ];
        let mut warnings = Vec::new();

        let instructions = project_merges(&merges, TableRegion::new(1, 3), 2, 1, &mut warnings);

        assert_eq!(instructions[0].top_row_offset, 0);
        assert_eq!(instructions[1].top_row_offset, 2);
    }
}
