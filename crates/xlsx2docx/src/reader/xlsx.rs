use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::ConvertError;
use crate::format::{datetime_to_excel_serial, is_date_format};
use crate::worksheet::{BorderStyle, Cell, CellValue, MergeRange, Worksheet, parse_a1};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";
const DEFAULT_SHEET_PART: &str = "xl/worksheets/sheet1.xml";

/// Reads the first worksheet of an xlsx package.
pub fn read_xlsx(bytes: &[u8]) -> Result<Worksheet, ConvertError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let workbook = read_part(&mut archive, WORKBOOK_PART)?
        .ok_or_else(|| ConvertError::malformed(WORKBOOK_PART, "part is missing"))?;
    let info = parse_workbook(&workbook)?;
    let sheet_path = match read_part(&mut archive, WORKBOOK_RELS_PART)? {
        Some(rels) => parse_relationships(&rels)?
            .remove(&info.first_sheet_rel)
            .map(|target| resolve_target(&target))
            .ok_or_else(|| {
                ConvertError::malformed(
                    WORKBOOK_RELS_PART,
                    format!("relationship {} not found", info.first_sheet_rel),
                )
            })?,
        None => DEFAULT_SHEET_PART.to_string(),
    };

    let shared_strings = read_part(&mut archive, SHARED_STRINGS_PART)?
        .map(|xml| parse_shared_strings(&xml))
        .transpose()?
        .unwrap_or_default();
    let styles = read_part(&mut archive, STYLES_PART)?
        .map(|xml| parse_styles(&xml))
        .transpose()?
        .unwrap_or_default();
    let sheet_xml = read_part(&mut archive, &sheet_path)?
        .ok_or_else(|| ConvertError::malformed(&sheet_path, "worksheet part is missing"))?;

    let mut worksheet = parse_sheet(&sheet_xml, &shared_strings, &styles, info.date1904)?;
    worksheet.set_date1904(info.date1904);
    Ok(worksheet)
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, ConvertError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(error) => return Err(error.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, ConvertError> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[derive(Debug, PartialEq, Eq)]
struct WorkbookInfo {
    first_sheet_rel: String,
    date1904: bool,
}

fn parse_workbook(xml: &str) -> Result<WorkbookInfo, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut first_sheet_rel = None;
    let mut date1904 = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    date1904 = attribute(&e, b"date1904")?
                        .is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true"));
                }
                b"sheet" if first_sheet_rel.is_none() => {
                    // r:id is the only namespaced `id` on <sheet>
                    first_sheet_rel = attribute(&e, b"id")?;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let first_sheet_rel = first_sheet_rel.ok_or(ConvertError::NoWorksheet)?;
    Ok(WorkbookInfo {
        first_sheet_rel,
        date1904,
    })
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut targets = HashMap::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

/// Workbook relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts = vec!["xl"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0_usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(e) if in_text && phonetic_depth == 0 => {
                if let Some(current) = current.as_mut() {
                    current.push_str(&e.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(decode_escapes(&current.take().unwrap_or_default())),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Decodes `_xHHHH_` character escapes. `_x005F_` stands for a literal
/// underscore, so `_x005F_x000D_` stays as the text `_x000D_`.
fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("_x") {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.bytes().all(|byte| byte.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &candidate[7..];
            }
            None => {
                out.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolved presentation of one `cellXfs` entry.
#[derive(Debug, Clone, Default, PartialEq)]
struct CellStyle {
    number_format: Option<String>,
    is_date: bool,
    top_border: Option<BorderStyle>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct StyleSheet {
    cell_styles: Vec<CellStyle>,
}

impl StyleSheet {
    fn get(&self, index: Option<usize>) -> Option<&CellStyle> {
        self.cell_styles.get(index.unwrap_or(0))
    }
}

fn builtin_number_format(id: u32) -> Option<&'static str> {
    Some(match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    })
}

/// Builtin ids whose rendering is a date or time, including the East Asian
/// locale ids that carry no format code in the file.
fn is_builtin_date(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

fn parse_number<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|value| value.trim().parse().ok())
}

fn parse_styles(xml: &str) -> Result<StyleSheet, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut borders: Vec<Option<BorderStyle>> = Vec::new();
    let mut xfs: Vec<(u32, usize)> = Vec::new();
    let mut in_borders = false;
    let mut in_cell_xfs = false;
    let mut in_border = false;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let is_empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    if let (Some(id), Some(code)) = (
                        parse_number(attribute(&e, b"numFmtId")?),
                        attribute(&e, b"formatCode")?,
                    ) {
                        custom_formats.insert(id, code);
                    }
                }
                b"borders" => in_borders = !is_empty,
                b"border" if in_borders => {
                    borders.push(None);
                    in_border = !is_empty;
                }
                b"top" if in_border => {
                    if let (Some(slot), Some(style)) =
                        (borders.last_mut(), attribute(&e, b"style")?)
                    {
                        *slot = Some(BorderStyle::from_ooxml(&style));
                    }
                }
                b"cellXfs" => in_cell_xfs = !is_empty,
                b"xf" if in_cell_xfs => {
                    let number_format = parse_number(attribute(&e, b"numFmtId")?).unwrap_or(0);
                    let border = parse_number(attribute(&e, b"borderId")?).unwrap_or(0);
                    xfs.push((number_format, border));
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"borders" => in_borders = false,
                b"border" => in_border = false,
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let cell_styles = xfs
        .into_iter()
        .map(|(format_id, border_id)| {
            let number_format = custom_formats
                .get(&format_id)
                .cloned()
                .or_else(|| builtin_number_format(format_id).map(str::to_string));
            let is_date = is_builtin_date(format_id)
                || (custom_formats.contains_key(&format_id)
                    && number_format.as_deref().is_some_and(is_date_format));
            CellStyle {
                number_format,
                is_date,
                top_border: borders.get(border_id).copied().flatten(),
            }
        })
        .collect();
    Ok(StyleSheet { cell_styles })
}

/// One `<c>` element while its children are being read.
#[derive(Debug, Default)]
struct PendingCell {
    reference: Option<String>,
    kind: Option<String>,
    style: Option<usize>,
    value: String,
    inline: String,
    in_value: bool,
    in_inline_text: bool,
    phonetic_depth: usize,
}

impl PendingCell {
    fn from_element(element: &BytesStart<'_>) -> Result<Self, ConvertError> {
        Ok(Self {
            reference: attribute(element, b"r")?,
            kind: attribute(element, b"t")?,
            style: attribute(element, b"s")?.and_then(|value| value.trim().parse().ok()),
            ..Self::default()
        })
    }
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Workbook-level data every cell of the sheet is resolved against.
struct SheetContext<'a> {
    shared_strings: &'a [String],
    styles: &'a StyleSheet,
    date1904: bool,
}

fn cell_value(
    pending: &PendingCell,
    context: &SheetContext<'_>,
    part: &str,
) -> Result<(CellValue, bool), ConvertError> {
    let raw = pending.value.as_str();
    let value = match pending.kind.as_deref() {
        Some("s") => {
            let index: usize = raw.trim().parse().map_err(|_| {
                ConvertError::malformed(part, format!("bad shared string index '{raw}'"))
            })?;
            let text = context.shared_strings.get(index).ok_or_else(|| {
                ConvertError::malformed(part, format!("shared string {index} out of range"))
            })?;
            CellValue::Text(text.clone())
        }
        Some("inlineStr") => CellValue::Text(decode_escapes(&pending.inline)),
        Some("str") => CellValue::Text(raw.to_string()),
        Some("b") => CellValue::Bool(raw.trim() == "1"),
        Some("e") => CellValue::Error(raw.trim().to_string()),
        Some("d") => {
            return Ok(parse_iso_datetime(raw)
                .and_then(|datetime| datetime_to_excel_serial(datetime, context.date1904))
                .map_or_else(
                    || (CellValue::Text(raw.to_string()), false),
                    |serial| (CellValue::Number(serial), true),
                ));
        }
        _ if raw.trim().is_empty() => CellValue::Empty,
        _ => CellValue::Number(raw.trim().parse().map_err(|_| {
            ConvertError::malformed(part, format!("bad numeric value '{raw}'"))
        })?),
    };
    Ok((value, false))
}

const SHEET_PART: &str = "worksheet";

fn store_cell(
    pending: PendingCell,
    row: usize,
    column: &mut usize,
    worksheet: &mut Worksheet,
    context: &SheetContext<'_>,
) -> Result<(), ConvertError> {
    let (cell_row, cell_column) = match pending.reference.as_deref() {
        Some(reference) => parse_a1(reference).ok_or_else(|| {
            ConvertError::malformed(SHEET_PART, format!("bad cell reference '{reference}'"))
        })?,
        None => (row, *column + 1),
    };
    *column = cell_column;

    let (value, typed_date) = cell_value(&pending, context, SHEET_PART)?;
    let style = context.styles.get(pending.style);
    let is_number = matches!(value, CellValue::Number(_));
    let cell = Cell {
        value,
        number_format: style
            .and_then(|style| style.number_format.clone())
            .filter(|_| is_number),
        is_date: is_number && (typed_date || style.is_some_and(|style| style.is_date)),
        top_border: style.and_then(|style| style.top_border),
    };
    worksheet.set_cell(cell_row, cell_column, cell);
    Ok(())
}

fn parse_sheet(
    xml: &str,
    shared_strings: &[String],
    styles: &StyleSheet,
    date1904: bool,
) -> Result<Worksheet, ConvertError> {
    let context = SheetContext {
        shared_strings,
        styles,
        date1904,
    };
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut worksheet = Worksheet::new();
    let mut row = 0_usize;
    let mut column = 0_usize;
    let mut pending: Option<PendingCell> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                row = parse_number(attribute(e, b"r")?).unwrap_or(row + 1);
                column = 0;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                pending = Some(PendingCell::from_element(&e)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let cell = PendingCell::from_element(&e)?;
                store_cell(cell, row, &mut column, &mut worksheet, &context)?;
            }
            Event::Start(e) => {
                if let Some(cell) = pending.as_mut() {
                    match e.local_name().as_ref() {
                        b"v" => cell.in_value = true,
                        b"t" => cell.in_inline_text = true,
                        b"rPh" => cell.phonetic_depth += 1,
                        _ => {}
                    }
                }
            }
            Event::Text(e) => {
                if let Some(cell) = pending.as_mut() {
                    if cell.in_value {
                        cell.value.push_str(&e.unescape()?);
                    } else if cell.in_inline_text && cell.phonetic_depth == 0 {
                        cell.inline.push_str(&e.unescape()?);
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some(cell) = pending.take() {
                        store_cell(cell, row, &mut column, &mut worksheet, &context)?;
                    }
                }
                b"v" => {
                    if let Some(cell) = pending.as_mut() {
                        cell.in_value = false;
                    }
                }
                b"t" => {
                    if let Some(cell) = pending.as_mut() {
                        cell.in_inline_text = false;
                    }
                }
                b"rPh" => {
                    if let Some(cell) = pending.as_mut() {
                        cell.phonetic_depth = cell.phonetic_depth.saturating_sub(1);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    for merge in read_merge_refs(xml)? {
        worksheet.add_merge(merge);
    }
    Ok(worksheet)
}

fn read_merge_refs(xml: &str) -> Result<Vec<MergeRange>, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut merges = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"mergeCell" => {
                if let Some(merge) = attribute(&e, b"ref")?
                    .as_deref()
                    .and_then(MergeRange::from_a1)
                {
                    merges.push(merge);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(merges)
}

#[cfg(test)]
mod tests {
    use super::{
        StyleSheet, decode_escapes, parse_relationships, parse_shared_strings, parse_sheet,
        parse_styles, parse_workbook, resolve_target,
    };
    use crate::format::CellFormatter;
    use crate::worksheet::{BorderStyle, CellValue, MergeRange};

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy&quot;年&quot;m&quot;月&quot;d&quot;日&quot;"/></numFmts>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left/><right/><top style="thin"><color indexed="64"/></top><bottom/></border>
  </borders>
  <cellStyleXfs count="1"><xf numFmtId="0" borderId="1"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" borderId="0"/>
    <xf numFmtId="4" borderId="1" applyBorder="1"/>
    <xf numFmtId="164" borderId="0"/>
    <xf numFmtId="14" borderId="0"/>
  </cellXfs>
  <dxfs count="1"><dxf><border><top style="thick"/></border></dxf></dxfs>
</styleSheet>"#;

    #[test]
    fn workbook_gives_first_sheet_and_date_system() {
        let xml = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
            xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
            <workbookPr date1904="1"/>
            <sheets>
              <sheet name="Summary" sheetId="2" r:id="rId4"/>
              <sheet name="Data" sheetId="1" r:id="rId1"/>
            </sheets></workbook>"#;
        let info = parse_workbook(xml).expect("workbook should parse");
        assert_eq!(info.first_sheet_rel, "rId4");
        assert!(info.date1904);
    }

    #[test]
    fn relationship_targets_resolve_under_xl() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId4" Type="worksheet" Target="worksheets/sheet2.xml"/>
            <Relationship Id="rId5" Type="worksheet" Target="/xl/worksheets/sheet9.xml"/>
            </Relationships>"#;
        let targets = parse_relationships(xml).expect("rels should parse");
        assert_eq!(resolve_target(&targets["rId4"]), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target(&targets["rId5"]), "xl/worksheets/sheet9.xml");
        assert_eq!(resolve_target("../xl/worksheets/a.xml"), "xl/worksheets/a.xml");
    }

    #[test]
    fn shared_strings_join_runs_and_skip_phonetics() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
            <si><t>Plain</t></si>
            <si><r><t xml:space="preserve">Rich </t></r><r><t>text</t></r></si>
            <si><t>東京</t><rPh sb="0" eb="2"><t>トウキョウ</t></rPh></si>
            <si/>
            <si><t>A &amp; B</t></si>
            </sst>"#;
        let strings = parse_shared_strings(xml).expect("sst should parse");
        assert_eq!(strings, vec!["Plain", "Rich text", "東京", "", "A & B"]);
    }

    #[test]
    fn styles_map_top_borders_and_date_formats() {
        let styles = parse_styles(STYLES).expect("styles should parse");
        assert_eq!(styles.cell_styles.len(), 4);
        assert_eq!(styles.cell_styles[0].top_border, None);
        assert_eq!(styles.cell_styles[1].top_border, Some(BorderStyle::Thin));
        assert_eq!(
            styles.cell_styles[1].number_format.as_deref(),
            Some("#,##0.00")
        );
        assert!(!styles.cell_styles[1].is_date);
        assert!(styles.cell_styles[2].is_date);
        assert!(styles.cell_styles[3].is_date);
    }

    #[test]
    fn sheet_cells_carry_values_styles_and_merges() {
        let styles = parse_styles(STYLES).expect("styles should parse");
        let shared = vec!["Item".to_string(), "Amount".to_string()];
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
            <sheetData>
              <row r="1"><c r="A1" t="s" s="1"><v>0</v></c><c r="B1" t="s" s="1"><v>1</v></c><c r="C1" s="1"/></row>
              <row r="2"><c r="A2" t="inlineStr"><is><t>Pen</t></is></c><c r="B2" s="1"><v>1250.5</v></c></row>
              <row r="4"><c r="A4" s="3"><v>45292</v></c><c r="B4" t="b"><v>1</v></c><c r="C4" t="e"><v>#DIV/0!</v></c></row>
              <row r="5"><c t="str"><v>no ref</v></c><c><v>2</v></c></row>
            </sheetData>
            <mergeCells count="2"><mergeCell ref="A4:B4"/><mergeCell ref="C5"/></mergeCells>
            </worksheet>"#;

        let sheet = parse_sheet(xml, &shared, &styles, false).expect("sheet should parse");

        assert_eq!(sheet.max_row(), 5);
        assert_eq!(sheet.cell(1, 1).value, &CellValue::Text("Item".to_string()));
        assert_eq!(sheet.cell(1, 3).value, &CellValue::Empty);
        assert_eq!(sheet.cell(1, 3).top_border, Some(BorderStyle::Thin));
        assert_eq!(sheet.cell(2, 1).value, &CellValue::Text("Pen".to_string()));
        assert_eq!(sheet.cell(2, 2).number_format, Some("#,##0.00"));
        assert!(sheet.cell(2, 2).is_numeric());
        assert!(sheet.row(3).is_empty());
        assert!(sheet.cell(4, 1).is_date);
        assert_eq!(sheet.cell(4, 2).value, &CellValue::Bool(true));
        assert_eq!(sheet.cell(4, 3).value, &CellValue::Error("#DIV/0!".to_string()));
        assert_eq!(sheet.cell(5, 1).value, &CellValue::Text("no ref".to_string()));
        assert_eq!(sheet.cell(5, 2).value, &CellValue::Number(2.0));
        assert_eq!(sheet.merges(), &[MergeRange::from_bounds(4, 1, 4, 2)]);
    }

    #[test]
    fn iso_date_cells_become_date_serials() {
        let xml = r#"<worksheet><sheetData><row r="1">
            <c r="A1" t="d"><v>2024-01-01T00:00:00Z</v></c>
            <c r="B1" t="d"><v>not a date</v></c>
            </row></sheetData></worksheet>"#;
        let sheet =
            parse_sheet(xml, &[], &StyleSheet::default(), false).expect("sheet should parse");

        assert_eq!(sheet.cell(1, 1).value, &CellValue::Number(45292.0));
        assert!(sheet.cell(1, 1).is_date);
        assert_eq!(
            sheet.cell(1, 2).value,
            &CellValue::Text("not a date".to_string())
        );
    }

    #[test]
    fn bad_shared_string_index_is_malformed() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>7</v></c></row></sheetData></worksheet>"#;
        assert!(parse_sheet(xml, &[], &StyleSheet::default(), false).is_err());
    }

    #[test]
    fn iso_dates_follow_the_1904_date_system() {
        let xml = r#"<worksheet><sheetData><row r="1">
            <c r="A1" t="d"><v>2024-01-01T00:00:00Z</v></c>
            </row></sheetData></worksheet>"#;
        let mut sheet =
            parse_sheet(xml, &[], &StyleSheet::default(), true).expect("sheet should parse");
        sheet.set_date1904(true);

        assert_eq!(sheet.cell(1, 1).value, &CellValue::Number(43_830.0));
        let formatter = CellFormatter::new("%Y-%m-%d", sheet.date1904());
        assert_eq!(formatter.format(&sheet.cell(1, 1)), "2024-01-01");
    }

    #[test]
    fn character_escapes_are_decoded() {
        assert_eq!(decode_escapes("a_x000D_b"), "a\rb");
        assert_eq!(decode_escapes("_x005F_x000D_"), "_x000D_");
        assert_eq!(decode_escapes("_x12_ and _xZZZZ_"), "_x12_ and _xZZZZ_");
        assert_eq!(decode_escapes("tail_x"), "tail_x");

        let xml = r#"<sst><si><t>Line_x000D__x000A_next</t></si></sst>"#;
        let strings = parse_shared_strings(xml).expect("sst should parse");
        assert_eq!(strings, vec!["Line\r\nnext"]);
    }

    #[test]
    fn inline_strings_skip_phonetic_runs_and_decode_escapes() {
        let xml = r#"<worksheet><sheetData><row r="1">
            <c r="A1" t="inlineStr"><is><t>東京</t><rPh sb="0" eb="2"><t>トウキョウ</t></rPh></is></c>
            <c r="B1" t="inlineStr"><is><r><t>Tab_x0009_</t></r><r><t>bed</t></r></is></c>
            </row></sheetData></worksheet>"#;
        let sheet =
            parse_sheet(xml, &[], &StyleSheet::default(), false).expect("sheet should parse");

        assert_eq!(sheet.cell(1, 1).value, &CellValue::Text("東京".to_string()));
        assert_eq!(
            sheet.cell(1, 2).value,
            &CellValue::Text("Tab\tbed".to_string())
        );
    }
}
