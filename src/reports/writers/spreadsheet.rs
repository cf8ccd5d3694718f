//! Spreadsheet report: a minimal OOXML workbook (zip of XML parts).
//!
//! Strings are written as inline strings, so no shared-strings part is
//! needed. Numeric cells carry the rounded dataset values.

use super::{ReportWriter, WriteContext};
use anyhow::Context;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const SHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const WORKSHEET_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

pub const DATA_SHEET: &str = "Data";
pub const ANALYSIS_SHEET: &str = "Análisis IA";
pub const STATS_SHEET: &str = "Estadísticas";

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

struct Sheet {
    name: &'static str,
    rows: Vec<Vec<Cell>>,
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`.
fn column_letters(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

fn xml_document(body: impl FnOnce(&mut Writer<Vec<u8>>) -> quick_xml::Result<()>) -> anyhow::Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    body(&mut writer)?;
    Ok(writer.into_inner())
}

fn worksheet_xml(sheet: &Sheet) -> anyhow::Result<Vec<u8>> {
    xml_document(|w| {
        w.write_event(Event::Start(
            BytesStart::new("worksheet").with_attributes([("xmlns", SHEET_NS)]),
        ))?;
        w.write_event(Event::Start(BytesStart::new("sheetData")))?;
        for (r, row) in sheet.rows.iter().enumerate() {
            let row_ref = (r + 1).to_string();
            w.write_event(Event::Start(
                BytesStart::new("row").with_attributes([("r", row_ref.as_str())]),
            ))?;
            for (c, cell) in row.iter().enumerate() {
                let cell_ref = format!("{}{}", column_letters(c), r + 1);
                match cell {
                    Cell::Text(text) => {
                        w.write_event(Event::Start(BytesStart::new("c").with_attributes([
                            ("r", cell_ref.as_str()),
                            ("t", "inlineStr"),
                        ])))?;
                        w.write_event(Event::Start(BytesStart::new("is")))?;
                        w.write_event(Event::Start(BytesStart::new("t")))?;
                        w.write_event(Event::Text(BytesText::new(text)))?;
                        w.write_event(Event::End(BytesEnd::new("t")))?;
                        w.write_event(Event::End(BytesEnd::new("is")))?;
                    }
                    Cell::Number(value) => {
                        w.write_event(Event::Start(
                            BytesStart::new("c").with_attributes([("r", cell_ref.as_str())]),
                        ))?;
                        w.write_event(Event::Start(BytesStart::new("v")))?;
                        w.write_event(Event::Text(BytesText::new(&value.to_string())))?;
                        w.write_event(Event::End(BytesEnd::new("v")))?;
                    }
                }
                w.write_event(Event::End(BytesEnd::new("c")))?;
            }
            w.write_event(Event::End(BytesEnd::new("row")))?;
        }
        w.write_event(Event::End(BytesEnd::new("sheetData")))?;
        w.write_event(Event::End(BytesEnd::new("worksheet")))?;
        Ok(())
    })
}

fn workbook_xml(sheets: &[Sheet]) -> anyhow::Result<Vec<u8>> {
    xml_document(|w| {
        w.write_event(Event::Start(
            BytesStart::new("workbook").with_attributes([("xmlns", SHEET_NS), ("xmlns:r", REL_NS)]),
        ))?;
        w.write_event(Event::Start(BytesStart::new("sheets")))?;
        for (i, sheet) in sheets.iter().enumerate() {
            let id = (i + 1).to_string();
            let rel = format!("rId{}", i + 1);
            w.write_event(Event::Empty(BytesStart::new("sheet").with_attributes([
                ("name", sheet.name),
                ("sheetId", id.as_str()),
                ("r:id", rel.as_str()),
            ])))?;
        }
        w.write_event(Event::End(BytesEnd::new("sheets")))?;
        w.write_event(Event::End(BytesEnd::new("workbook")))?;
        Ok(())
    })
}

fn workbook_rels_xml(sheets: &[Sheet]) -> anyhow::Result<Vec<u8>> {
    xml_document(|w| {
        w.write_event(Event::Start(
            BytesStart::new("Relationships").with_attributes([("xmlns", PKG_REL_NS)]),
        ))?;
        for i in 0..sheets.len() {
            let rel = format!("rId{}", i + 1);
            let target = format!("worksheets/sheet{}.xml", i + 1);
            w.write_event(Event::Empty(BytesStart::new("Relationship").with_attributes([
                ("Id", rel.as_str()),
                ("Type", WORKSHEET_REL),
                ("Target", target.as_str()),
            ])))?;
        }
        w.write_event(Event::End(BytesEnd::new("Relationships")))?;
        Ok(())
    })
}

fn root_rels_xml() -> anyhow::Result<Vec<u8>> {
    xml_document(|w| {
        w.write_event(Event::Start(
            BytesStart::new("Relationships").with_attributes([("xmlns", PKG_REL_NS)]),
        ))?;
        w.write_event(Event::Empty(BytesStart::new("Relationship").with_attributes([
            ("Id", "rId1"),
            ("Type", DOCUMENT_REL),
            ("Target", "xl/workbook.xml"),
        ])))?;
        w.write_event(Event::End(BytesEnd::new("Relationships")))?;
        Ok(())
    })
}

fn content_types_xml(sheets: &[Sheet]) -> anyhow::Result<Vec<u8>> {
    xml_document(|w| {
        w.write_event(Event::Start(BytesStart::new("Types").with_attributes([(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/content-types",
        )])))?;
        w.write_event(Event::Empty(BytesStart::new("Default").with_attributes([
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ])))?;
        w.write_event(Event::Empty(BytesStart::new("Default").with_attributes([
            ("Extension", "xml"),
            ("ContentType", "application/xml"),
        ])))?;
        w.write_event(Event::Empty(BytesStart::new("Override").with_attributes([
            ("PartName", "/xl/workbook.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
            ),
        ])))?;
        for i in 0..sheets.len() {
            let part = format!("/xl/worksheets/sheet{}.xml", i + 1);
            w.write_event(Event::Empty(BytesStart::new("Override").with_attributes([
                ("PartName", part.as_str()),
                (
                    "ContentType",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
                ),
            ])))?;
        }
        w.write_event(Event::End(BytesEnd::new("Types")))?;
        Ok(())
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetWriter;

impl SpreadsheetWriter {
    fn sheets(ctx: &WriteContext<'_>) -> Vec<Sheet> {
        let mut data = Vec::with_capacity(ctx.dataset.rows.len() + 1);
        data.push(ctx.dataset.columns.iter().map(|c| Cell::from(c.as_str())).collect());
        for row in &ctx.dataset.rows {
            let mut cells = vec![Cell::from(row.fecha.as_str()), Cell::from(row.hora.as_str())];
            cells.extend(row.values.iter().map(|&v| Cell::Number(v)));
            data.push(cells);
        }
        let mut sheets = vec![Sheet {
            name: DATA_SHEET,
            rows: data,
        }];

        if let Some(analysis) = ctx.analysis {
            let mut rows: Vec<Vec<Cell>> = vec![
                vec!["ANÁLISIS INTELIGENTE".into()],
                vec!["".into()],
                vec!["Resumen:".into(), analysis.summary.clone().into()],
                vec!["".into()],
                vec!["TENDENCIAS:".into()],
            ];
            rows.extend(analysis.trends.iter().map(|t| {
                vec![
                    t.variable.clone().into(),
                    t.trend.to_string().into(),
                    t.confidence_percent().into(),
                    t.description.clone().into(),
                ]
            }));
            rows.push(vec!["".into()]);
            rows.push(vec!["ALERTAS:".into()]);
            rows.extend(analysis.alerts.iter().map(|a| {
                vec![
                    a.kind.to_string().into(),
                    a.variable.clone().into(),
                    a.message.clone().into(),
                ]
            }));
            rows.push(vec!["".into()]);
            rows.push(vec!["RECOMENDACIONES:".into()]);
            rows.extend(
                analysis
                    .recommendations
                    .iter()
                    .map(|r| vec!["".into(), r.clone().into()]),
            );
            sheets.push(Sheet {
                name: ANALYSIS_SHEET,
                rows,
            });
        }

        if ctx.config.include_analysis && !ctx.stats.is_empty() {
            let mut rows = vec![vec![
                Cell::from("Columna"),
                Cell::from("Mínimo"),
                Cell::from("Máximo"),
                Cell::from("Promedio"),
            ]];
            rows.extend(ctx.stats.iter().map(|s| {
                vec![
                    Cell::from(s.column.as_str()),
                    Cell::Number(s.min),
                    Cell::Number(s.max),
                    Cell::Number((s.mean * 100.0).round() / 100.0),
                ]
            }));
            sheets.push(Sheet {
                name: STATS_SHEET,
                rows,
            });
        }

        sheets
    }
}

impl ReportWriter for SpreadsheetWriter {
    fn content_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn write(&self, ctx: &WriteContext<'_>) -> anyhow::Result<Vec<u8>> {
        let sheets = Self::sheets(ctx);

        let mut parts: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".to_string(), content_types_xml(&sheets)?),
            ("_rels/.rels".to_string(), root_rels_xml()?),
            ("xl/workbook.xml".to_string(), workbook_xml(&sheets)?),
            ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels_xml(&sheets)?),
        ];
        for (i, sheet) in sheets.iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), worksheet_xml(sheet)?));
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in parts {
            zip.start_file(name.as_str(), options)
                .with_context(|| format!("starting workbook part {name}"))?;
            zip.write_all(&bytes)
                .with_context(|| format!("writing workbook part {name}"))?;
        }
        let cursor = zip.finish().context("finishing workbook archive")?;
        Ok(cursor.into_inner())
    }
}
