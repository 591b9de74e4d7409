use serde::{Deserialize, Serialize};
use xlsx2docx::{ConversionWarning, RegionSummary};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_UPLOAD_NAME: &str = "upload.xlsx";
pub const BATCH_ARCHIVE_NAME: &str = "xlsx2docx-batch.zip";
pub const DOCX_CACHE_KEY_PREFIX: &str = "docx:v1:";
pub const DOCX_CACHE_TTL_SECONDS: u32 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Counts stored next to a cached document so a cache hit can still
/// report them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedReport {
    pub table_count: usize,
    pub paragraph_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegionItem {
    pub table_id: usize,
    pub start_row: usize,
    pub end_row: usize,
    pub effective_columns: usize,
    pub merges: usize,
    pub dropped_merges: usize,
}

impl RegionItem {
    #[must_use]
    pub fn from_summary(table_id: usize, summary: &RegionSummary) -> Self {
        Self {
            table_id,
            start_row: summary.region.start_row,
            end_row: summary.region.end_row,
            effective_columns: summary.effective_columns,
            merges: summary.merges.len(),
            dropped_merges: summary.dropped_merges,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarningItem {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<usize>,
}

impl From<&ConversionWarning> for WarningItem {
    fn from(warning: &ConversionWarning) -> Self {
        Self {
            code: warning.code.as_str().to_string(),
            message: warning.message.clone(),
            row: warning.row,
            table_id: warning.table_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegionsResponse {
    pub file_name: String,
    pub items: Vec<RegionItem>,
    pub warnings: Vec<WarningItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
