//! Minimal Office Open XML (.xlsx) support: one worksheet of string cells.

pub mod read;
pub mod write;

pub use read::read_xlsx;
pub use write::{write_xlsx, write_xlsx_checked};

pub const SHEET_NAME: &str = "Sheet1";
pub(crate) const SHEET_PART: &str = "xl/worksheets/sheet1.xml";
pub(crate) const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Convert a 0-based column index to its letter form (0 → `A`, 26 → `AA`).
pub fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Cell reference such as `C7` for 0-based `(row, column)`.
pub fn cell_reference(row: usize, column: usize) -> String {
    format!("{}{}", column_letters(column), row + 1)
}

/// Parse the letter part of a reference such as `AB12` back to a 0-based column.
pub fn column_from_reference(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return None;
    }
    letters
        .iter()
        .try_fold(0usize, |acc, &b| Some(acc * 26 + (b - b'A') as usize + 1))
        .map(|n| n - 1)
}
