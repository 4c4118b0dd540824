//! Format sniffing for delimited text of unknown encoding and separator.
//!
//! Candidates are tried in a fixed order and the first one that yields a
//! table with more than one column wins. A one-column result is how a wrong
//! delimiter shows up, so it counts as a failure.

use log::info;
use polars::prelude::*;
use std::borrow::Cow;
use std::io::Cursor;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Field delimiters, in the order they are tried.
pub const DELIMITERS: [u8; 2] = [b';', b','];

/// Text encodings, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// UTF-8 with a leading byte-order mark.
    Utf8Sig,
    Latin1,
    Windows1252,
}

impl TextEncoding {
    pub const ALL: [TextEncoding; 4] = [
        TextEncoding::Utf8,
        TextEncoding::Utf8Sig,
        TextEncoding::Latin1,
        TextEncoding::Windows1252,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Decodes `bytes`, or returns `None` if they are not valid in this
    /// encoding. The single-byte encodings accept any input.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            TextEncoding::Utf8Sig => bytes
                .strip_prefix(UTF8_BOM)
                .and_then(|rest| std::str::from_utf8(rest).ok())
                .map(Cow::Borrowed),
            TextEncoding::Latin1 => Some(Cow::Owned(bytes.iter().map(|&b| b as char).collect())),
            TextEncoding::Windows1252 => {
                Some(encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0)
            }
        }
    }
}

/// One (encoding, delimiter) pair of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvCandidate {
    pub encoding: TextEncoding,
    pub delimiter: u8,
}

impl CsvCandidate {
    /// Decodes and parses `bytes` as a headed table with every column read as
    /// text. Data lines whose field count differs from the header's are
    /// dropped; their number is returned next to the table.
    pub fn read(&self, bytes: &[u8]) -> Option<(DataFrame, usize)> {
        let text = self.encoding.decode(bytes)?;
        let (text, ragged) = well_formed_lines(&text, self.delimiter);
        let cursor = Cursor::new(text.into_bytes());
        let delimiter = self.delimiter;
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_ignore_errors(true)
            .map_parse_options(|options| options.with_separator(delimiter))
            .into_reader_with_file_handle(cursor)
            .finish()
            .ok()
            .map(|frame| (frame, ragged))
    }
}

/// Keeps the header and every data line with as many fields as the header.
/// Blank lines are skipped without being counted.
fn well_formed_lines(text: &str, delimiter: u8) -> (String, usize) {
    let mut lines = text.lines();
    let Some(header) = lines.next() else {
        return (String::new(), 0);
    };
    let width = field_count(header, delimiter);

    let mut kept = String::with_capacity(text.len());
    kept.push_str(header);
    kept.push('\n');
    let mut ragged = 0;
    for line in lines.filter(|line| !line.trim().is_empty()) {
        if field_count(line, delimiter) == width {
            kept.push_str(line);
            kept.push('\n');
        } else {
            ragged += 1;
        }
    }
    (kept, ragged)
}

/// Number of fields in one line. Delimiters inside double quotes are text.
fn field_count(line: &str, delimiter: u8) -> usize {
    let delimiter = char::from(delimiter);
    let mut quoted = false;
    let mut fields = 1;
    for c in line.chars() {
        if c == '"' {
            quoted = !quoted;
        } else if c == delimiter && !quoted {
            fields += 1;
        }
    }
    fields
}

/// The full chain: every encoding crossed with every delimiter, encoding-major.
pub fn candidates() -> impl Iterator<Item = CsvCandidate> {
    TextEncoding::ALL.into_iter().flat_map(|encoding| {
        DELIMITERS
            .into_iter()
            .map(move |delimiter| CsvCandidate { encoding, delimiter })
    })
}

/// Walks the chain lazily and returns the first candidate that yields more
/// than one column, together with its table.
pub fn decode_table(bytes: &[u8]) -> Option<(CsvCandidate, DataFrame)> {
    let (candidate, frame, ragged) = candidates().find_map(|candidate| {
        candidate
            .read(bytes)
            .filter(|(frame, _)| frame.width() > 1)
            .map(|(frame, ragged)| (candidate, frame, ragged))
    })?;
    if ragged > 0 {
        info!(
            "Dropped {} lines whose field count differs from the header ({}, '{}')",
            ragged,
            candidate.encoding.label(),
            char::from(candidate.delimiter)
        );
    }
    Some((candidate, frame))
}
