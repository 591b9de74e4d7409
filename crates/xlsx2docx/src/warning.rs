#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    MergeDropped,
    MergeOverlap,
    NoTablesDetected,
    LegacyFormatWithoutBorders,
}

impl WarningCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MergeDropped => "merge_dropped",
            Self::MergeOverlap => "merge_overlap",
            Self::NoTablesDetected => "no_tables_detected",
            Self::LegacyFormatWithoutBorders => "legacy_format_without_borders",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionWarning {
    pub code: WarningCode,
    pub message: String,
    pub row: Option<usize>,
    pub table_id: Option<usize>,
}

impl ConversionWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            row: None,
            table_id: None,
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub fn with_table_id(mut self, table_id: usize) -> Self {
        self.table_id = Some(table_id);
        self
    }
}
