use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};

use crate::error::ConvertError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentPolicy {
    /// Numbers right, everything else left.
    #[default]
    TypeDriven,
    /// First row and first column centered; other cells type-driven.
    LegacyHeaderCentered,
}

impl FromStr for AlignmentPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "type-driven" | "type_driven" | "type" => Ok(Self::TypeDriven),
            "legacy" | "legacy-header-centered" | "header-centered" => {
                Ok(Self::LegacyHeaderCentered)
            }
            other => Err(format!(
                "unknown alignment policy '{other}', expected type-driven or legacy"
            )),
        }
    }
}

/// Paragraph metrics in twentieths of a point; `line` is an exact height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphSpacing {
    pub before: u32,
    pub after: u32,
    pub line: u32,
}

impl ParagraphSpacing {
    #[must_use]
    pub const fn from_points(before: u32, after: u32, line: u32) -> Self {
        Self {
            before: before * 20,
            after: after * 20,
            line: line * 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub alignment: AlignmentPolicy,
    pub date_format: String,
    pub blank_row_paragraphs: bool,
    pub text_font: String,
    pub number_font: String,
    pub font_size_half_points: u32,
    pub paragraph: ParagraphSpacing,
    pub cell: ParagraphSpacing,
    pub thick_border_eighths: u8,
    pub dotted_border_eighths: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            alignment: AlignmentPolicy::TypeDriven,
            date_format: "%Y-%m-%d".to_string(),
            blank_row_paragraphs: false,
            text_font: "SimSun".to_string(),
            number_font: "Times New Roman".to_string(),
            font_size_half_points: 22,
            paragraph: ParagraphSpacing::from_points(6, 6, 18),
            cell: ParagraphSpacing::from_points(5, 5, 12),
            thick_border_eighths: 12,
            dotted_border_eighths: 6,
        }
    }
}

impl ConvertOptions {
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.date_format.trim().is_empty() {
            return Err(ConvertError::InvalidOption(
                "date_format must not be empty".to_string(),
            ));
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConvertError::InvalidOption(format!(
                "date_format '{}' is not a valid strftime pattern",
                self.date_format
            )));
        }
        if self.font_size_half_points == 0 {
            return Err(ConvertError::InvalidOption(
                "font size must be positive".to_string(),
            ));
        }
        for (name, size) in [
            ("thick_border_eighths", self.thick_border_eighths),
            ("dotted_border_eighths", self.dotted_border_eighths),
        ] {
            if !(2..=96).contains(&size) {
                return Err(ConvertError::InvalidOption(format!(
                    "{name} must be within 2..=96, got {size}"
                )));
            }
        }
        Ok(())
    }

    /// Stable text form of every option that changes the produced document.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "{:?}|{}|{}|{}|{}|{}|{:?}|{:?}|{}|{}",
            self.alignment,
            self.date_format,
            self.blank_row_paragraphs,
            self.text_font,
            self.number_font,
            self.font_size_half_points,
            self.paragraph,
            self.cell,
            self.thick_border_eighths,
            self.dotted_border_eighths
        )
    }
}
