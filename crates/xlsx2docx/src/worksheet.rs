#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
}

impl CellValue {
    /// Absent values and whitespace-only text both count as blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::Number(_) | Self::Bool(_) | Self::Error(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderStyle {
    None,
    Hair,
    Thin,
    Medium,
    Thick,
    Dotted,
    Dashed,
    DashDot,
    DashDotDot,
    Double,
    MediumDashed,
    MediumDashDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderStyle {
    #[must_use]
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "" | "none" => Self::None,
            "hair" => Self::Hair,
            "medium" => Self::Medium,
            "thick" => Self::Thick,
            "dotted" => Self::Dotted,
            "dashed" => Self::Dashed,
            "dashDot" => Self::DashDot,
            "dashDotDot" => Self::DashDotDot,
            "double" => Self::Double,
            "mediumDashed" => Self::MediumDashed,
            "mediumDashDot" => Self::MediumDashDot,
            "mediumDashDotDot" => Self::MediumDashDotDot,
            "slantDashDot" => Self::SlantDashDot,
            // unknown producers' styles still draw a line
            _ => Self::Thin,
        }
    }

    #[must_use]
    pub fn is_drawn(self) -> bool {
        self != Self::None
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub number_format: Option<String>,
    pub is_date: bool,
    pub top_border: Option<BorderStyle>,
}

impl Cell {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: CellValue::Text(value.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn number(value: f64) -> Self {
        Self {
            value: CellValue::Number(value),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self {
            value: CellValue::Bool(value),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_number_format(mut self, format: impl Into<String>) -> Self {
        self.number_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn as_date(mut self) -> Self {
        self.is_date = true;
        self
    }

    #[must_use]
    pub fn with_top_border(mut self, style: BorderStyle) -> Self {
        self.top_border = Some(style);
        self
    }

    #[must_use]
    pub fn view(&self) -> CellView<'_> {
        CellView {
            value: &self.value,
            number_format: self.number_format.as_deref(),
            is_date: self.is_date,
            top_border: self.top_border,
        }
    }
}

static EMPTY_VALUE: CellValue = CellValue::Empty;

/// Read-only view of one worksheet position.
///
/// Positions with no stored cell (beyond a row's populated width, or
/// secondary cells of a merge that the reader did not materialize) yield an
/// empty view with no border.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellView<'a> {
    pub value: &'a CellValue,
    pub number_format: Option<&'a str>,
    pub is_date: bool,
    pub top_border: Option<BorderStyle>,
}

impl CellView<'_> {
    #[must_use]
    pub fn empty() -> Self {
        CellView {
            value: &EMPTY_VALUE,
            number_format: None,
            is_date: false,
            top_border: None,
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self.value, CellValue::Number(_)) && !self.is_date
    }
}

/// Rectangular merge range, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRange {
    pub top: usize,
    pub left: usize,
    pub row_span: usize,
    pub col_span: usize,
}

impl MergeRange {
    #[must_use]
    pub fn from_bounds(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        let (top, bottom) = (top.min(bottom), top.max(bottom));
        let (left, right) = (left.min(right), left.max(right));
        Self {
            top,
            left,
            row_span: bottom - top + 1,
            col_span: right - left + 1,
        }
    }

    /// Parses an `A1:C3` style reference. Single-cell references are not merges.
    #[must_use]
    pub fn from_a1(reference: &str) -> Option<Self> {
        let (first, last) = reference.trim().split_once(':')?;
        let (top, left) = parse_a1(first)?;
        let (bottom, right) = parse_a1(last)?;
        let merge = Self::from_bounds(top, left, bottom, right);
        (merge.row_span > 1 || merge.col_span > 1).then_some(merge)
    }

    #[must_use]
    pub fn bottom(&self) -> usize {
        self.top + self.row_span - 1
    }

    #[must_use]
    pub fn right(&self) -> usize {
        self.left + self.col_span - 1
    }
}

/// Parses `B12` (optionally `$B$12`) into a 1-based `(row, column)` pair.
pub(crate) fn parse_a1(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.trim().replace('$', "");
    let split = reference.find(|ch: char| ch.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }

    let mut column = 0_usize;
    for ch in letters.chars() {
        let digit = usize::from(u8::try_from(ch.to_ascii_uppercase()).ok()? - b'A') + 1;
        column = column.checked_mul(26)?.checked_add(digit)?;
    }
    let row = digits.parse::<usize>().ok()?;
    (row > 0).then_some((row, column))
}

/// The first worksheet of a workbook: rows of cells plus merge ranges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Worksheet {
    rows: Vec<Vec<Cell>>,
    merges: Vec<MergeRange>,
    date1904: bool,
}

impl Worksheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Convenience constructor where `""` stands for an absent cell.
    #[must_use]
    pub fn from_text_rows(rows: &[&[&str]]) -> Self {
        Self::from_rows(
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|text| {
                            if text.is_empty() {
                                Cell::empty()
                            } else {
                                Cell::text(*text)
                            }
                        })
                        .collect()
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn with_merge(mut self, merge: MergeRange) -> Self {
        self.merges.push(merge);
        self
    }

    pub fn set_cell(&mut self, row: usize, column: usize, cell: Cell) {
        if row == 0 || column == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < column {
            cells.resize_with(column, Cell::default);
        }
        cells[column - 1] = cell;
    }

    pub fn add_merge(&mut self, merge: MergeRange) {
        self.merges.push(merge);
    }

    pub fn set_date1904(&mut self, date1904: bool) {
        self.date1904 = date1904;
    }

    #[must_use]
    pub fn date1904(&self) -> bool {
        self.date1904
    }

    #[must_use]
    pub fn max_row(&self) -> usize {
        self.rows.len()
    }

    /// Cells of a 1-based row; rows past `max_row` are empty.
    #[must_use]
    pub fn row(&self, row: usize) -> &[Cell] {
        row.checked_sub(1)
            .and_then(|index| self.rows.get(index))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> CellView<'_> {
        column
            .checked_sub(1)
            .and_then(|index| self.row(row).get(index))
            .map_or_else(CellView::empty, Cell::view)
    }

    #[must_use]
    pub fn merges(&self) -> &[MergeRange] {
        &self.merges
    }
}
