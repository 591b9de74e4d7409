/// Contiguous run of worksheet rows classified as a table. 1-based, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRegion {
    pub start_row: usize,
    pub end_row: usize,
}

impl TableRegion {
    #[must_use]
    pub fn new(start_row: usize, end_row: usize) -> Self {
        debug_assert!(end_row >= start_row, "region must not be inverted");
        Self { start_row, end_row }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.end_row + 1 - self.start_row
    }

    pub fn rows(&self) -> impl Iterator<Item = usize> {
        self.start_row..=self.end_row
    }
}

/// Region-relative merge: 0-based row offset, 1-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeInstruction {
    pub top_row_offset: usize,
    pub left_col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

impl MergeInstruction {
    #[must_use]
    pub fn right_col(&self) -> usize {
        self.left_col + self.col_span - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSummary {
    pub region: TableRegion,
    pub effective_columns: usize,
    pub merges: Vec<MergeInstruction>,
    pub dropped_merges: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    #[must_use]
    pub const fn as_ooxml(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderLine {
    Single,
    Dotted,
}

impl BorderLine {
    #[must_use]
    pub const fn as_ooxml(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Dotted => "dotted",
        }
    }
}

/// One drawn edge; `size` is in eighths of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Border {
    pub line: BorderLine,
    pub size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellBorders {
    pub top: Option<Border>,
    pub bottom: Option<Border>,
    pub right: Option<Border>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRole {
    Anchor { row_span: usize, col_span: usize },
    Covered { anchor_row: usize, anchor_col: usize },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputCell {
    pub text: String,
    /// Non-empty texts absorbed from cells merged into this one.
    pub absorbed: Vec<String>,
    pub alignment: Alignment,
    pub numeric: bool,
    pub merge: Option<MergeRole>,
    pub borders: CellBorders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeGroup {
    pub anchor_row: usize,
    pub anchor_col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

impl MergeGroup {
    #[must_use]
    pub fn last_row(&self) -> usize {
        self.anchor_row + self.row_span - 1
    }

    #[must_use]
    pub fn last_col(&self) -> usize {
        self.anchor_col + self.col_span - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeConflict {
    OutOfBounds,
    AlreadyMerged,
}

/// Fixed-size grid of output cells, 0-based and row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    rows: usize,
    columns: usize,
    cells: Vec<OutputCell>,
}

impl OutputTable {
    #[must_use]
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![OutputCell::default(); rows * columns],
        }
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &OutputCell {
        &self.cells[row * self.columns + col]
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> &mut OutputCell {
        &mut self.cells[row * self.columns + col]
    }

    /// Merge group containing `(row, col)`, if any.
    #[must_use]
    pub fn group_of(&self, row: usize, col: usize) -> Option<MergeGroup> {
        let (anchor_row, anchor_col) = match self.cell(row, col).merge? {
            MergeRole::Anchor { .. } => (row, col),
            MergeRole::Covered {
                anchor_row,
                anchor_col,
            } => (anchor_row, anchor_col),
        };
        match self.cell(anchor_row, anchor_col).merge? {
            MergeRole::Anchor { row_span, col_span } => Some(MergeGroup {
                anchor_row,
                anchor_col,
                row_span,
                col_span,
            }),
            MergeRole::Covered { .. } => None,
        }
    }

    /// Joins a rectangle into one merge group. The anchor keeps its text and
    /// absorbs the non-empty text of every covered cell.
    pub fn merge(
        &mut self,
        row: usize,
        col: usize,
        row_span: usize,
        col_span: usize,
    ) -> Result<(), MergeConflict> {
        if row_span == 0
            || col_span == 0
            || row + row_span > self.rows
            || col + col_span > self.columns
        {
            return Err(MergeConflict::OutOfBounds);
        }

        let positions = (row..row + row_span)
            .flat_map(|r| (col..col + col_span).map(move |c| (r, c)))
            .collect::<Vec<_>>();
        if positions
            .iter()
            .any(|&(r, c)| self.cell(r, c).merge.is_some())
        {
            return Err(MergeConflict::AlreadyMerged);
        }

        let mut absorbed = Vec::new();
        for &(r, c) in positions.iter().skip(1) {
            let covered = self.cell_mut(r, c);
            let text = std::mem::take(&mut covered.text);
            if !text.trim().is_empty() {
                absorbed.push(text);
            }
            covered.merge = Some(MergeRole::Covered {
                anchor_row: row,
                anchor_col: col,
            });
        }

        let anchor = self.cell_mut(row, col);
        anchor.absorbed.extend(absorbed);
        anchor.merge = Some(MergeRole::Anchor { row_span, col_span });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputParagraph {
    pub text: String,
    pub alignment: Alignment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(OutputParagraph),
    Table(OutputTable),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| matches!(block, Block::Table(_)))
            .count()
    }

    #[must_use]
    pub fn paragraph_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| matches!(block, Block::Paragraph(_)))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
