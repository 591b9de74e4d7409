use std::fmt::Write as _;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::worksheet::{CellValue, CellView};

const TIME_FORMAT: &str = "%H:%M:%S";

/// Maps one cell to its display string.
#[derive(Debug, Clone, Copy)]
pub struct CellFormatter<'a> {
    date_format: &'a str,
    date1904: bool,
}

impl<'a> CellFormatter<'a> {
    #[must_use]
    pub fn new(date_format: &'a str, date1904: bool) -> Self {
        Self {
            date_format,
            date1904,
        }
    }

    #[must_use]
    pub fn format(&self, cell: &CellView<'_>) -> String {
        match cell.value {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Error(code) => code.clone(),
            CellValue::Number(value) if cell.is_date => self
                .format_date(*value, cell.number_format)
                .unwrap_or_else(|| format_general(*value)),
            CellValue::Number(value) => format_number(*value, cell.number_format),
        }
    }

    fn format_date(&self, serial: f64, number_format: Option<&str>) -> Option<String> {
        let datetime = excel_serial_to_datetime(serial, self.date1904)?;
        let tokens = number_format.map(DateTokens::scan).unwrap_or_default();
        let has_fraction = datetime.time() != NaiveTime::MIN;

        let pattern = if tokens.time_only() {
            TIME_FORMAT.to_string()
        } else if has_fraction && (tokens.time || number_format.is_none()) {
            format!("{} {TIME_FORMAT}", self.date_format)
        } else {
            self.date_format.to_string()
        };

        let mut out = String::new();
        write!(out, "{}", datetime.format(&pattern)).ok()?;
        Some(out)
    }
}

/// Converts an Excel serial day number to a calendar timestamp.
#[must_use]
pub fn excel_serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if serial < 60.0 {
        // serials before the fictitious 1900-02-29 are offset by one day
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let days = serial.trunc();
    let millis = ((serial - days) * 86_400_000.0).round();
    #[allow(clippy::cast_possible_truncation)]
    let (days, millis) = (days as i64, millis as i64);
    let datetime = epoch
        .and_time(NaiveTime::MIN)
        .checked_add_signed(Duration::try_days(days)?)?
        .checked_add_signed(Duration::try_milliseconds(millis)?)?;
    // sub-second noise from binary fractions is not displayable
    Some(datetime.with_nanosecond(0).unwrap_or(datetime))
}

/// Inverse of [`excel_serial_to_datetime`].
#[must_use]
pub fn datetime_to_excel_serial(datetime: NaiveDateTime, date1904: bool) -> Option<f64> {
    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let elapsed = datetime - epoch.and_time(NaiveTime::MIN);
    #[allow(clippy::cast_precision_loss)]
    let mut serial = elapsed.num_milliseconds() as f64 / 86_400_000.0;
    if !date1904 && serial < 61.0 {
        serial -= 1.0;
    }
    Some(serial)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DateTokens {
    date: bool,
    time: bool,
}

impl DateTokens {
    fn scan(code: &str) -> Self {
        let visible = visible_format_chars(first_section(code));
        let lower = visible.to_ascii_lowercase();
        let date = lower.contains(['y', 'd']);
        let time = lower.contains(['h', 's']) || lower.contains("am/pm");
        // a bare month token is a date unless it sits inside a time pattern
        let month_only = lower.contains('m') && !date && !time;
        Self {
            date: date || month_only,
            time,
        }
    }

    fn time_only(self) -> bool {
        self.time && !self.date
    }
}

/// Whether a number format code renders its value as a date or time.
#[must_use]
pub fn is_date_format(code: &str) -> bool {
    let section = first_section(code);
    if section.eq_ignore_ascii_case("general") {
        return false;
    }
    let tokens = DateTokens::scan(section);
    tokens.date || tokens.time
}

fn first_section(code: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (index, ch) in code.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &code[..index],
            _ => {}
        }
    }
    code
}

/// Strips quoted literals, bracketed modifiers, escapes and fill/padding
/// markers, leaving only the placeholder characters of a format section.
fn visible_format_chars(section: &str) -> String {
    let mut out = String::with_capacity(section.len());
    let mut chars = section.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for inner in chars.by_ref() {
                    if inner == '"' {
                        break;
                    }
                }
            }
            '[' => {
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NumberPattern {
    decimals: usize,
    grouping: bool,
    percent: bool,
}

impl NumberPattern {
    fn parse(code: &str) -> Option<Self> {
        let visible = visible_format_chars(first_section(code));
        if !visible.contains(['0', '#', '?']) {
            return None;
        }
        // Scientific and fraction layouts render as General.
        let upper = visible.to_ascii_uppercase();
        if upper.contains("E+") || upper.contains("E-") || visible.contains('/') {
            return None;
        }

        let (integer, fraction) = visible.split_once('.').unwrap_or((visible.as_str(), ""));
        let decimals = fraction
            .chars()
            .take_while(|ch| matches!(ch, '0' | '#' | '?'))
            .count();
        let grouping = integer.contains(',') && integer.contains(['0', '#', '?']);
        Some(Self {
            decimals,
            grouping,
            percent: visible.contains('%'),
        })
    }

    fn render(self, value: f64) -> String {
        let scaled = if self.percent { value * 100.0 } else { value };
        let digits = format!("{:.*}", self.decimals, scaled.abs());
        let (integer, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

        let mut out = String::new();
        let is_zero = digits.chars().all(|ch| matches!(ch, '0' | '.'));
        if scaled.is_sign_negative() && !is_zero {
            out.push('-');
        }
        if self.grouping {
            out.push_str(&group_thousands(integer));
        } else {
            out.push_str(integer);
        }
        if !fraction.is_empty() {
            out.push('.');
            out.push_str(fraction);
        }
        if self.percent {
            out.push('%');
        }
        out
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[must_use]
pub fn format_number(value: f64, number_format: Option<&str>) -> String {
    number_format
        .map(str::trim)
        .filter(|code| !code.is_empty() && !code.eq_ignore_ascii_case("general"))
        .and_then(NumberPattern::parse)
        .map_or_else(|| format_general(value), |pattern| pattern.render(value))
}

#[must_use]
pub fn format_general(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{value:.0}");
    }
    if value.abs() >= 1e15 || value.abs() < 1e-9 {
        return value.to_string();
    }

    let fixed = format!("{value:.10}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}
