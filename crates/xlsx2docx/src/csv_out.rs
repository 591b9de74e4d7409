use std::io::Write;
use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::error::ConvertError;
use crate::model::RegionSummary;

const REGION_HEADERS: [&str; 5] = ["start_row", "end_row", "columns", "merges", "dropped_merges"];

fn write_regions<W: Write>(
    writer: &mut Writer<W>,
    regions: &[RegionSummary],
) -> Result<(), ConvertError> {
    writer.write_record(REGION_HEADERS)?;
    for summary in regions {
        writer.write_record([
            summary.region.start_row.to_string(),
            summary.region.end_row.to_string(),
            summary.effective_columns.to_string(),
            summary.merges.len().to_string(),
            summary.dropped_merges.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one line per detected region.
pub fn write_region_csv(
    path: &Path,
    regions: &[RegionSummary],
    delimiter: u8,
) -> Result<(), ConvertError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    write_regions(&mut writer, regions)
}

pub fn region_csv_string(regions: &[RegionSummary], delimiter: u8) -> Result<String, ConvertError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    write_regions(&mut writer, regions)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| ConvertError::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| ConvertError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}

#[cfg(test)]
mod tests {
    use super::region_csv_string;
    use crate::model::{MergeInstruction, RegionSummary, TableRegion};

    #[test]
    fn lists_regions_with_counts() {
        let regions = vec![
            RegionSummary {
                region: TableRegion::new(3, 7),
                effective_columns: 4,
                merges: vec![MergeInstruction {
                    top_row_offset: 0,
                    left_col: 1,
                    row_span: 1,
                    col_span: 2,
                }],
                dropped_merges: 1,
            },
            RegionSummary {
                region: TableRegion::new(9, 9),
                effective_columns: 1,
                merges: Vec::new(),
                dropped_merges: 0,
            },
        ];

        let csv = region_csv_string(&regions, b',').expect("csv should render");
        assert_eq!(
            csv,
            "start_row,end_row,columns,merges,dropped_merges\n3,7,4,1,1\n9,9,1,0,0\n"
        );
    }

    #[test]
    fn honours_delimiter() {
        let csv = region_csv_string(&[], b';').expect("csv should render");
        assert_eq!(csv, "start_row;end_row;columns;merges;dropped_merges\n");
    }
}
