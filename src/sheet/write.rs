// src/sheet/write.rs
use super::{cell_reference, SHEET_NAME, SHEET_PART};
use crate::{error::EtlError, process::Table};
use chrono::{SecondsFormat, Utc};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Seek, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Style index of the bold header font in `STYLES`.
const HEADER_STYLE: &str = "1";

fn workbook_xml() -> io::Result<Vec<u8>> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    w.write_event(Event::Start(
        BytesStart::new("workbook").with_attributes([("xmlns", NS_MAIN), ("xmlns:r", NS_REL)]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("sheets")))?;
    w.write_event(Event::Empty(BytesStart::new("sheet").with_attributes([
        ("name", SHEET_NAME),
        ("sheetId", "1"),
        ("r:id", "rId1"),
    ])))?;
    w.write_event(Event::End(BytesEnd::new("sheets")))?;
    w.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(w.into_inner())
}

fn core_xml() -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:creator>{}</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#,
        env!("CARGO_PKG_NAME")
    )
}

fn write_cell<W: Write>(
    w: &mut Writer<W>,
    reference: &str,
    value: &str,
    style: Option<&str>,
) -> io::Result<()> {
    let mut cell = BytesStart::new("c").with_attributes([("r", reference), ("t", "inlineStr")]);
    if let Some(s) = style {
        cell.push_attribute(("s", s));
    }
    w.write_event(Event::Start(cell))?;
    w.write_event(Event::Start(BytesStart::new("is")))?;
    let mut text = BytesStart::new("t");
    if value.trim() != value {
        text.push_attribute(("xml:space", "preserve"));
    }
    w.write_event(Event::Start(text))?;
    w.write_event(Event::Text(BytesText::new(value)))?;
    w.write_event(Event::End(BytesEnd::new("t")))?;
    w.write_event(Event::End(BytesEnd::new("is")))?;
    w.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

/// Worksheet XML: header in row 1 (bold), one row per record after it.
fn sheet_xml(table: &Table) -> io::Result<Vec<u8>> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    w.write_event(Event::Start(
        BytesStart::new("worksheet").with_attributes([("xmlns", NS_MAIN), ("xmlns:r", NS_REL)]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("sheetData")))?;

    let all_rows = std::iter::once(&table.headers).chain(table.rows.iter());
    for (r, cells) in all_rows.enumerate() {
        let row_number = (r + 1).to_string();
        w.write_event(Event::Start(
            BytesStart::new("row").with_attributes([("r", row_number.as_str())]),
        ))?;
        let style = (r == 0).then_some(HEADER_STYLE);
        for (c, value) in cells.iter().enumerate() {
            write_cell(&mut w, &cell_reference(r, c), value, style)?;
        }
        w.write_event(Event::End(BytesEnd::new("row")))?;
    }

    w.write_event(Event::End(BytesEnd::new("sheetData")))?;
    w.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(w.into_inner())
}

fn part_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Serialize `table` as a complete workbook into `out`.
pub fn build_workbook<W: Write + Seek>(table: &Table, out: W) -> io::Result<W> {
    let mut zip = ZipWriter::new(out);

    let parts: [(&str, Vec<u8>); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec()),
        ("_rels/.rels", ROOT_RELS.as_bytes().to_vec()),
        ("docProps/core.xml", core_xml().into_bytes()),
        ("xl/workbook.xml", workbook_xml()?),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes().to_vec()),
        ("xl/styles.xml", STYLES.as_bytes().to_vec()),
    ];
    for (name, data) in parts {
        zip.start_file(name, part_options()).map_err(io::Error::other)?;
        zip.write_all(&data)?;
    }

    zip.start_file(SHEET_PART, part_options()).map_err(io::Error::other)?;
    zip.write_all(&sheet_xml(table)?)?;

    zip.finish().map_err(io::Error::other)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output.xlsx".into());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write `table` to `path` as .xlsx. The workbook is built in a sibling
/// temp file and renamed over `path`, so a failure leaves no partial file.
pub fn write_xlsx(table: &Table, path: impl AsRef<Path>) -> Result<(), EtlError> {
    write_xlsx_checked(table, path, |_| Ok(()))
}

/// Like [`write_xlsx`], but runs `check` on the finished temp file first.
/// If the check fails the temp file is removed and `path` is not touched.
#[instrument(level = "info", skip(table, check), fields(path = %path.as_ref().display(), rows = table.len()))]
pub fn write_xlsx_checked<F>(table: &Table, path: impl AsRef<Path>, check: F) -> Result<(), EtlError>
where
    F: FnOnce(&Path) -> Result<(), EtlError>,
{
    let path = path.as_ref();
    let tmp = temp_path_for(path);

    let result = File::create(&tmp)
        .and_then(|file| build_workbook(table, BufWriter::new(file)))
        .and_then(|buf| buf.into_inner().map_err(|e| e.into_error()))
        .and_then(|file| file.sync_all())
        .map_err(|e| EtlError::io(path, e))
        .and_then(|()| check(&tmp))
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| EtlError::io(path, e)));

    if let Err(e) = result {
        if tmp.exists() {
            if let Err(rm) = fs::remove_file(&tmp) {
                warn!(tmp = %tmp.display(), error = %rm, "could not remove temp workbook");
            }
        }
        return Err(e);
    }

    debug!(columns = table.headers.len(), "workbook parts written");
    info!("wrote {}", path.display());
    Ok(())
}
