//! DIMAP key reader
//!
//! Minimal tokenizer used to pick the raster keys out of a `METADATA.DIM`
//! document. Not a markup parser: the text is split on `<`, `>` and
//! whitespace and keys are matched as `KEY value /KEY` token runs.

use std::fs;
use std::path::Path;

use log::debug;

use crate::errors::{SpotError, SpotResult};
use crate::io::byte_order::ByteOrder;
use crate::metadata::model::RasterDescription;

/// Splits a document into tokens
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| c == '<' || c == '>' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Value of the first `<key>value</key>` element, if any
pub fn key_value<'a>(tokens: &[&'a str], key: &str) -> Option<&'a str> {
    let close = format!("/{}", key);
    tokens.windows(3).find_map(|w| {
        if w[0] == key && w[2] == close {
            Some(w[1])
        } else {
            None
        }
    })
}

/// Value of an attribute carried by the first `key` element, if any
pub fn attribute_value<'a>(tokens: &[&'a str], key: &str, attribute: &str) -> Option<&'a str> {
    let prefix = format!("{}=", attribute);
    let start = tokens.iter().position(|t| *t == key)?;
    tokens[start + 1..]
        .iter()
        .take_while(|t| t.contains('='))
        .find_map(|t| t.strip_prefix(&prefix))
        .map(|v| v.trim_end_matches('/').trim_matches(|c| c == '"' || c == '\''))
}

fn required<'a>(tokens: &[&'a str], key: &str) -> SpotResult<&'a str> {
    key_value(tokens, key).ok_or_else(|| SpotError::MissingKey(key.to_string()))
}

fn required_number<T: std::str::FromStr>(tokens: &[&str], key: &str) -> SpotResult<T> {
    let value = required(tokens, key)?;
    value.parse().map_err(|_| {
        SpotError::InconsistentLayout(format!("{} has a non-numeric value '{}'", key, value))
    })
}

/// Reads the raster description keys of a document
///
/// `SKIPBYTES` defaults to zero and `BYTEORDER` to big-endian; the
/// dimension keys are required.
pub fn read_raster_description(text: &str) -> SpotResult<RasterDescription> {
    let tokens = tokenize(text);

    let nbits: u32 = required_number(&tokens, "NBITS")?;
    let columns = required_number(&tokens, "NCOLS")?;
    let rows = required_number(&tokens, "NROWS")?;
    let bands = required_number(&tokens, "NBANDS")?;
    let byte_order = match key_value(&tokens, "BYTEORDER") {
        Some(code) => ByteOrder::from_dimap_code(code)
            .ok_or_else(|| SpotError::Unsupported(format!("BYTEORDER '{}'", code)))?,
        None => ByteOrder::BigEndian,
    };
    let skip_bytes = match key_value(&tokens, "SKIPBYTES") {
        Some(_) => required_number(&tokens, "SKIPBYTES")?,
        None => 0,
    };
    if nbits != 8 && nbits != 16 {
        return Err(SpotError::Unsupported(format!("{} bits per sample", nbits)));
    }

    let description = RasterDescription {
        rows,
        columns,
        bands,
        nbits,
        byte_order,
        skip_bytes,
        data_file: attribute_value(&tokens, "DATA_FILE_PATH", "href").unwrap_or_default().to_string(),
        data_format: key_value(&tokens, "DATA_FILE_FORMAT").unwrap_or_default().to_string(),
    };
    debug!(
        "Raster keys: {}x{}x{} at {} bits, {:?}",
        description.rows, description.columns, description.bands, description.nbits, description.byte_order
    );
    Ok(description)
}

/// Reads the raster description of the document at `path`
///
/// The document is read as ISO-8859-1.
pub fn read_document(path: &Path) -> SpotResult<RasterDescription> {
    let bytes = fs::read(path)?;
    let text: String = bytes.into_iter().map(char::from).collect();
    read_raster_description(&text)
}
