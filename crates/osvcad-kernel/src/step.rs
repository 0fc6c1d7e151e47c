//! STEP (ISO-10303-21) import front end.
//!
//! Reads the exchange structure far enough to know what the file holds:
//! the header schema, the entity instances in the DATA section and how many
//! of them are solids. Surface and topology evaluation is left to the
//! kernel that consumes the summary.

use std::path::Path;

use crate::error::{KernelError, Result};

const HEADER_TAG: &str = "ISO-10303-21;";
const TRAILER_TAG: &str = "END-ISO-10303-21;";
const SOLID_ENTITY: &str = "MANIFOLD_SOLID_BREP";

/// What a STEP file contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSummary {
    /// First schema named in `FILE_SCHEMA`, if any.
    pub schema: Option<String>,
    /// Number of entity instances in the DATA section.
    pub entities: usize,
    /// Number of `MANIFOLD_SOLID_BREP` instances.
    pub solids: usize,
}

/// Read and summarize a STEP file from disk.
pub fn read_step_summary(path: &Path) -> Result<StepSummary> {
    let text = std::fs::read_to_string(path).map_err(|source| KernelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    summarize(&text).map_err(|reason| KernelError::import(path, reason))
}

/// Summarize STEP text. The error is a human-readable reason.
pub fn summarize(text: &str) -> std::result::Result<StepSummary, String> {
    let text = text.trim();
    if !text.starts_with(HEADER_TAG) {
        return Err(format!("missing '{HEADER_TAG}' header"));
    }
    if !text.ends_with(TRAILER_TAG) {
        return Err(format!("missing '{TRAILER_TAG}' trailer"));
    }

    let data_start = text
        .find("DATA;")
        .ok_or_else(|| "missing DATA section".to_string())?;
    let header = &text[..data_start];
    let data = &text[data_start + "DATA;".len()..];
    let data_end = data
        .find("ENDSEC;")
        .ok_or_else(|| "unterminated DATA section".to_string())?;

    let mut entities = 0;
    let mut solids = 0;
    for statement in split_statements(&data[..data_end]) {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        let entity_type = entity_type(statement)
            .ok_or_else(|| format!("malformed entity instance '{}'", truncate(statement)))?;
        entities += 1;
        if entity_type == SOLID_ENTITY {
            solids += 1;
        }
    }

    if solids == 0 {
        return Err("no solids found".to_string());
    }

    Ok(StepSummary {
        schema: file_schema(header),
        entities,
        solids,
    })
}

/// Split on `;` outside of single-quoted strings.
fn split_statements(data: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_string = false;
    let mut start = 0;
    for (i, ch) in data.char_indices() {
        match ch {
            '\'' => in_string = !in_string,
            ';' if !in_string => {
                out.push(&data[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&data[start..]);
    out
}

/// `#12 = TYPE_NAME ( ... )` -> `TYPE_NAME`.
fn entity_type(statement: &str) -> Option<String> {
    let rest = statement.strip_prefix('#')?;
    let (id, rhs) = rest.split_once('=')?;
    if id.trim().parse::<u64>().is_err() {
        return None;
    }
    let rhs = rhs.trim_start();
    let name_end = rhs.find('(')?;
    let name = rhs[..name_end].trim();
    if name.is_empty() {
        // complex instance: #1 = ( A() B() )
        return Some(String::from("COMPLEX"));
    }
    Some(name.to_ascii_uppercase())
}

fn file_schema(header: &str) -> Option<String> {
    let at = header.find("FILE_SCHEMA")?;
    let rest = &header[at..];
    let open = rest.find('\'')?;
    let rest = &rest[open + 1..];
    let close = rest.find('\'')?;
    Some(rest[..close].to_string())
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(40) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
