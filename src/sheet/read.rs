// src/sheet/read.rs
use super::{column_from_reference, SHARED_STRINGS_PART, SHEET_PART};
use crate::{error::EtlError, process::Table};
use quick_xml::{
    escape::resolve_xml_entity,
    events::{BytesRef, BytesStart, Event},
    Reader,
};
use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Seek},
    path::Path,
};
use tracing::{debug, instrument};
use zip::{result::ZipError, ZipArchive};

fn xml_reader<R: BufRead>(inner: R) -> Reader<R> {
    let mut reader = Reader::from_reader(inner);
    let config = reader.config_mut();
    config.expand_empty_elements = true;
    config.trim_text(false);
    reader
}

fn bad_part(part: &str, err: impl std::fmt::Display) -> EtlError {
    EtlError::malformed(format!("{}: {}", part, err))
}

fn attribute(node: &BytesStart, name: &str, part: &str) -> Result<Option<String>, EtlError> {
    node.try_get_attribute(name)
        .map_err(|e| bad_part(part, e))?
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .map_err(|e| bad_part(part, e))
        })
        .transpose()
}

/// Append the text an entity or character reference stands for.
fn push_ref(out: &mut String, bytes: &BytesRef, part: &str) -> Result<(), EtlError> {
    let raw = bytes.xml_content().map_err(|e| bad_part(part, e))?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        }
        .map_err(|e| bad_part(part, e))?;
        if let Some(ch) = char::from_u32(code) {
            out.push(ch);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        out.push_str(entity);
    } else {
        return Err(bad_part(part, format!("unknown entity &{};", raw)));
    }
    Ok(())
}

/// `<si>` items of the shared string table, phonetic runs skipped.
fn read_shared_strings<R: BufRead>(inner: R) -> Result<Vec<String>, EtlError> {
    let part = SHARED_STRINGS_PART;
    let mut reader = xml_reader(inner);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| bad_part(part, e))? {
            Event::Start(e) => match e.name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" if phonetic_depth == 0 => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.xml_content().map_err(|e| bad_part(part, e))?);
                }
            }
            Event::GeneralRef(r) if in_text => {
                if let Some(s) = current.as_mut() {
                    push_ref(s, &r, part)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

struct CellState {
    column: usize,
    shared: bool,
    text: String,
}

/// Rows of the worksheet as strings, positioned by their `r` references.
fn read_sheet_rows<R: BufRead>(inner: R, shared: &[String]) -> Result<Vec<Vec<String>>, EtlError> {
    let part = SHEET_PART;
    let mut reader = xml_reader(inner);
    let mut buf = Vec::new();
    let mut rows = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<CellState> = None;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| bad_part(part, e))? {
            Event::Start(e) => match e.name().as_ref() {
                b"row" => row = Some(Vec::new()),
                b"c" => {
                    let next = row.as_ref().map(Vec::len).unwrap_or_default();
                    let column = attribute(&e, "r", part)?
                        .and_then(|r| column_from_reference(&r))
                        .unwrap_or(next);
                    let kind = attribute(&e, "t", part)?;
                    cell = Some(CellState {
                        column,
                        shared: kind.as_deref() == Some("s"),
                        text: String::new(),
                    });
                }
                b"t" | b"v" if cell.is_some() => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"t" | b"v" => in_text = false,
                b"c" => {
                    if let (Some(done), Some(cells)) = (cell.take(), row.as_mut()) {
                        let value = if done.shared {
                            let idx: usize = done
                                .text
                                .trim()
                                .parse()
                                .map_err(|e| bad_part(part, e))?;
                            shared.get(idx).cloned().ok_or_else(|| {
                                bad_part(part, format!("shared string {} out of range", idx))
                            })?
                        } else {
                            done.text
                        };
                        if cells.len() <= done.column {
                            cells.resize(done.column + 1, String::new());
                        }
                        cells[done.column] = value;
                    }
                }
                b"row" => rows.extend(row.take()),
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(c) = cell.as_mut() {
                    c.text
                        .push_str(&t.xml_content().map_err(|e| bad_part(part, e))?);
                }
            }
            Event::GeneralRef(r) if in_text => {
                if let Some(c) = cell.as_mut() {
                    push_ref(&mut c.text, &r, part)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

/// Read the first worksheet of an archive into a [`Table`]; row 1 is the header.
pub fn read_workbook<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Table, EtlError> {
    let shared = match archive.by_name(SHARED_STRINGS_PART) {
        Ok(file) => read_shared_strings(BufReader::new(file))?,
        Err(ZipError::FileNotFound) => Vec::new(),
        Err(e) => return Err(bad_part(SHARED_STRINGS_PART, e)),
    };
    let sheet = archive
        .by_name(SHEET_PART)
        .map_err(|e| bad_part(SHEET_PART, e))?;
    let mut rows = read_sheet_rows(BufReader::new(sheet), &shared)?.into_iter();

    let headers = rows.next().unwrap_or_default();
    let width = headers.len();
    let rows = rows
        .map(|mut r| {
            // trailing empty cells may be omitted by other writers
            if r.len() < width {
                r.resize(width, String::new());
            }
            r
        })
        .collect();
    Table::new(headers, rows)
}

/// Open an .xlsx file and read its first worksheet.
#[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub fn read_xlsx(path: impl AsRef<Path>) -> Result<Table, EtlError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| EtlError::io(path, e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| EtlError::malformed(format!("{} is not a zip archive: {}", path.display(), e)))?;
    let table = read_workbook(&mut archive)?;
    debug!(rows = table.len(), columns = table.headers.len(), "workbook read");
    Ok(table)
}
