use std::io::{Cursor, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ConvertError;
use crate::model::{
    Alignment, Block, Border, CellBorders, Document, MergeRole, OutputCell, OutputParagraph,
    OutputTable,
};
use crate::options::{ConvertOptions, ParagraphSpacing};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

// A4 portrait with 1" top/bottom and 1.25" side margins, in twips.
const PAGE_WIDTH: usize = 11_906;
const PAGE_HEIGHT: usize = 16_838;
const MARGIN_TOP_BOTTOM: usize = 1_440;
const MARGIN_SIDE: usize = 1_800;
const TEXT_WIDTH: usize = PAGE_WIDTH - 2 * MARGIN_SIDE;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Thin wrapper so element writing reads as nesting rather than event plumbing.
struct XmlOut {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlOut {
    fn new() -> Result<Self, ConvertError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn element<'a>(name: &'a str, attributes: &[(&str, &str)]) -> BytesStart<'a> {
        let mut element = BytesStart::new(name);
        for &attribute in attributes {
            element.push_attribute(attribute);
        }
        element
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), ConvertError> {
        self.writer
            .write_event(Event::Start(Self::element(name, attributes)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), ConvertError> {
        self.writer
            .write_event(Event::Empty(Self::element(name, attributes)))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), ConvertError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), ConvertError> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

/// Run and paragraph properties shared by every paragraph of one kind.
struct ParagraphStyle<'a> {
    spacing: ParagraphSpacing,
    font: &'a str,
    size: &'a str,
}

fn write_paragraph(
    xml: &mut XmlOut,
    style: &ParagraphStyle<'_>,
    alignment: Alignment,
    text: &str,
) -> Result<(), ConvertError> {
    let before = style.spacing.before.to_string();
    let after = style.spacing.after.to_string();
    let line = style.spacing.line.to_string();

    xml.open("w:p", &[])?;
    xml.open("w:pPr", &[])?;
    xml.empty(
        "w:spacing",
        &[
            ("w:before", &before),
            ("w:after", &after),
            ("w:line", &line),
            ("w:lineRule", "exact"),
        ],
    )?;
    xml.empty("w:jc", &[("w:val", alignment.as_ooxml())])?;
    xml.close("w:pPr")?;

    if !text.is_empty() {
        xml.open("w:r", &[])?;
        xml.open("w:rPr", &[])?;
        xml.empty(
            "w:rFonts",
            &[
                ("w:ascii", style.font),
                ("w:hAnsi", style.font),
                ("w:eastAsia", style.font),
                ("w:cs", style.font),
            ],
        )?;
        xml.empty("w:sz", &[("w:val", style.size)])?;
        xml.empty("w:szCs", &[("w:val", style.size)])?;
        xml.close("w:rPr")?;
        write_run_text(xml, text)?;
        xml.close("w:r")?;
    }

    xml.close("w:p")
}

/// Writes run content. Line feeds become `<w:br/>` and tabs `<w:tab/>`;
/// other control characters are not allowed in WordprocessingML and are
/// dropped.
fn write_run_text(xml: &mut XmlOut, text: &str) -> Result<(), ConvertError> {
    fn flush(xml: &mut XmlOut, segment: &mut String) -> Result<(), ConvertError> {
        if !segment.is_empty() {
            xml.open("w:t", &[("xml:space", "preserve")])?;
            xml.text(segment)?;
            xml.close("w:t")?;
            segment.clear();
        }
        Ok(())
    }

    let mut segment = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                flush(xml, &mut segment)?;
                xml.empty("w:br", &[])?;
            }
            '\t' => {
                flush(xml, &mut segment)?;
                xml.empty("w:tab", &[])?;
            }
            '\u{FFFE}' | '\u{FFFF}' => {}
            ch if ch < ' ' => {}
            ch => segment.push(ch),
        }
    }
    flush(xml, &mut segment)
}

fn write_border_edge(
    xml: &mut XmlOut,
    name: &str,
    border: Option<Border>,
) -> Result<(), ConvertError> {
    match border {
        Some(border) => {
            let size = border.size.to_string();
            xml.empty(
                name,
                &[
                    ("w:val", border.line.as_ooxml()),
                    ("w:sz", &size),
                    ("w:space", "0"),
                    ("w:color", "000000"),
                ],
            )
        }
        None => xml.empty(name, &[("w:val", "nil")]),
    }
}

fn write_cell_borders(xml: &mut XmlOut, borders: CellBorders) -> Result<(), ConvertError> {
    xml.open("w:tcBorders", &[])?;
    write_border_edge(xml, "w:top", borders.top)?;
    write_border_edge(xml, "w:left", None)?;
    write_border_edge(xml, "w:bottom", borders.bottom)?;
    write_border_edge(xml, "w:right", borders.right)?;
    xml.close("w:tcBorders")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerticalMerge {
    None,
    Restart,
    Continue,
}

fn write_table_cell(
    xml: &mut XmlOut,
    cell: &OutputCell,
    column_width: usize,
    col_span: usize,
    vertical: VerticalMerge,
    options: &ConvertOptions,
) -> Result<(), ConvertError> {
    let width = (column_width * col_span).to_string();
    let span = col_span.to_string();
    let size = options.font_size_half_points.to_string();

    xml.open("w:tc", &[])?;
    xml.open("w:tcPr", &[])?;
    xml.empty("w:tcW", &[("w:w", &width), ("w:type", "dxa")])?;
    if col_span > 1 {
        xml.empty("w:gridSpan", &[("w:val", &span)])?;
    }
    match vertical {
        VerticalMerge::None => {}
        VerticalMerge::Restart => xml.empty("w:vMerge", &[("w:val", "restart")])?,
        VerticalMerge::Continue => xml.empty("w:vMerge", &[])?,
    }
    write_cell_borders(xml, cell.borders)?;
    xml.empty("w:vAlign", &[("w:val", "center")])?;
    xml.close("w:tcPr")?;

    let text_style = ParagraphStyle {
        spacing: options.cell,
        font: &options.text_font,
        size: &size,
    };
    let value_style = ParagraphStyle {
        font: if cell.numeric {
            &options.number_font
        } else {
            &options.text_font
        },
        ..text_style
    };

    if vertical == VerticalMerge::Continue {
        write_paragraph(xml, &text_style, cell.alignment, "")?;
    } else {
        write_paragraph(xml, &value_style, cell.alignment, &cell.text)?;
        for absorbed in &cell.absorbed {
            write_paragraph(xml, &text_style, cell.alignment, absorbed)?;
        }
    }
    xml.close("w:tc")
}

fn write_table(
    xml: &mut XmlOut,
    table: &OutputTable,
    options: &ConvertOptions,
) -> Result<(), ConvertError> {
    let column_width = TEXT_WIDTH / table.columns().max(1);
    let grid_width = column_width.to_string();

    xml.open("w:tbl", &[])?;
    xml.open("w:tblPr", &[])?;
    xml.empty("w:tblW", &[("w:w", "5000"), ("w:type", "pct")])?;
    xml.empty("w:tblLayout", &[("w:type", "fixed")])?;
    xml.close("w:tblPr")?;

    xml.open("w:tblGrid", &[])?;
    for _ in 0..table.columns() {
        xml.empty("w:gridCol", &[("w:w", &grid_width)])?;
    }
    xml.close("w:tblGrid")?;

    for row in 0..table.rows() {
        xml.open("w:tr", &[])?;
        for col in 0..table.columns() {
            let cell = table.cell(row, col);
            match cell.merge {
                None => {
                    write_table_cell(xml, cell, column_width, 1, VerticalMerge::None, options)?;
                }
                Some(MergeRole::Anchor { row_span, col_span }) => {
                    let vertical = if row_span > 1 {
                        VerticalMerge::Restart
                    } else {
                        VerticalMerge::None
                    };
                    write_table_cell(xml, cell, column_width, col_span, vertical, options)?;
                }
                // each merged row below the anchor keeps one continuation cell
                Some(MergeRole::Covered {
                    anchor_row,
                    anchor_col,
                }) if col == anchor_col && row > anchor_row => {
                    let col_span = table
                        .group_of(row, col)
                        .map_or(1, |group| group.col_span);
                    write_table_cell(
                        xml,
                        cell,
                        column_width,
                        col_span,
                        VerticalMerge::Continue,
                        options,
                    )?;
                }
                Some(MergeRole::Covered { .. }) => {}
            }
        }
        xml.close("w:tr")?;
    }

    xml.close("w:tbl")
}

fn write_free_paragraph(
    xml: &mut XmlOut,
    paragraph: &OutputParagraph,
    options: &ConvertOptions,
) -> Result<(), ConvertError> {
    let size = options.font_size_half_points.to_string();
    let style = ParagraphStyle {
        spacing: options.paragraph,
        font: &options.text_font,
        size: &size,
    };
    write_paragraph(xml, &style, paragraph.alignment, &paragraph.text)
}

fn write_section(xml: &mut XmlOut) -> Result<(), ConvertError> {
    let width = PAGE_WIDTH.to_string();
    let height = PAGE_HEIGHT.to_string();
    let vertical = MARGIN_TOP_BOTTOM.to_string();
    let side = MARGIN_SIDE.to_string();

    xml.open("w:sectPr", &[])?;
    xml.empty("w:pgSz", &[("w:w", &width), ("w:h", &height)])?;
    xml.empty(
        "w:pgMar",
        &[
            ("w:top", &vertical),
            ("w:right", &side),
            ("w:bottom", &vertical),
            ("w:left", &side),
            ("w:header", "851"),
            ("w:footer", "992"),
            ("w:gutter", "0"),
        ],
    )?;
    xml.close("w:sectPr")
}

fn document_xml(document: &Document, options: &ConvertOptions) -> Result<Vec<u8>, ConvertError> {
    let mut xml = XmlOut::new()?;
    xml.open("w:document", &[("xmlns:w", W_NS), ("xmlns:r", R_NS)])?;
    xml.open("w:body", &[])?;

    let mut previous_was_table = false;
    for block in &document.blocks {
        match block {
            Block::Paragraph(paragraph) => {
                write_free_paragraph(&mut xml, paragraph, options)?;
                previous_was_table = false;
            }
            Block::Table(table) => {
                // Word fuses directly adjacent tables into one
                if previous_was_table {
                    write_free_paragraph(
                        &mut xml,
                        &OutputParagraph {
                            text: String::new(),
                            alignment: Alignment::Left,
                        },
                        options,
                    )?;
                }
                write_table(&mut xml, table, options)?;
                previous_was_table = true;
            }
        }
    }

    write_section(&mut xml)?;
    xml.close("w:body")?;
    xml.close("w:document")?;
    Ok(xml.into_bytes())
}

fn styles_xml(options: &ConvertOptions) -> Result<Vec<u8>, ConvertError> {
    let size = options.font_size_half_points.to_string();

    let mut xml = XmlOut::new()?;
    xml.open("w:styles", &[("xmlns:w", W_NS)])?;
    xml.open("w:docDefaults", &[])?;
    xml.open("w:rPrDefault", &[])?;
    xml.open("w:rPr", &[])?;
    xml.empty(
        "w:rFonts",
        &[
            ("w:ascii", &options.number_font),
            ("w:hAnsi", &options.number_font),
            ("w:eastAsia", &options.text_font),
            ("w:cs", &options.number_font),
        ],
    )?;
    xml.empty("w:sz", &[("w:val", &size)])?;
    xml.empty("w:szCs", &[("w:val", &size)])?;
    xml.empty("w:lang", &[("w:val", "en-US"), ("w:eastAsia", "zh-CN")])?;
    xml.close("w:rPr")?;
    xml.close("w:rPrDefault")?;
    xml.empty("w:pPrDefault", &[])?;
    xml.close("w:docDefaults")?;

    xml.open(
        "w:style",
        &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")],
    )?;
    xml.empty("w:name", &[("w:val", "Normal")])?;
    xml.empty("w:qFormat", &[])?;
    xml.close("w:style")?;

    xml.open(
        "w:style",
        &[("w:type", "table"), ("w:default", "1"), ("w:styleId", "TableNormal")],
    )?;
    xml.empty("w:name", &[("w:val", "Normal Table")])?;
    xml.open("w:tblPr", &[])?;
    xml.empty("w:tblInd", &[("w:w", "0"), ("w:type", "dxa")])?;
    xml.open("w:tblCellMar", &[])?;
    xml.empty("w:top", &[("w:w", "0"), ("w:type", "dxa")])?;
    xml.empty("w:left", &[("w:w", "108"), ("w:type", "dxa")])?;
    xml.empty("w:bottom", &[("w:w", "0"), ("w:type", "dxa")])?;
    xml.empty("w:right", &[("w:w", "108"), ("w:type", "dxa")])?;
    xml.close("w:tblCellMar")?;
    xml.close("w:tblPr")?;
    xml.close("w:style")?;

    xml.close("w:styles")?;
    Ok(xml.into_bytes())
}

/// Serializes the document as a WordprocessingML package.
pub fn write_docx(document: &Document, options: &ConvertOptions) -> Result<Vec<u8>, ConvertError> {
    let parts: [(&str, Vec<u8>); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes().to_vec()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes().to_vec()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes().to_vec()),
        ("word/document.xml", document_xml(document, options)?),
        ("word/styles.xml", styles_xml(options)?),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(name, file_options)?;
        zip.write_all(&bytes)?;
    }
    let bytes = zip.finish()?.into_inner();

    debug!(
        blocks = document.blocks.len(),
        size = bytes.len(),
        "docx package written"
    );
    Ok(bytes)
}
