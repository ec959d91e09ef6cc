//! Parser for course catalog files.
//!
//! Two layouts are accepted:
//! - `.jsonl`: one course object per line, blank lines skipped
//! - `.json`: a single array of course objects
//!
//! Each record looks like:
//! `{"code": "EECS445", "title": "...", "description": "...", "level": 400,
//!   "department": "EECS", "embedding": [0.01, ...]}`

use crate::error::{CatalogError, Result};
use crate::types::{Course, Level, is_valid_level};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Record shape as it appears on disk, before validation
#[derive(Debug, Deserialize)]
struct RawCourse {
    code: String,
    title: String,
    #[serde(default)]
    description: String,
    level: i64,
    #[serde(default)]
    department: Option<String>,
    embedding: Vec<f32>,
}

/// Parse a catalog file, choosing the layout from its extension
pub fn parse_catalog_file(path: &Path) -> Result<Vec<Course>> {
    if !path.exists() {
        return Err(CatalogError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let content = fs::read_to_string(path)?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("jsonl") => parse_json_lines(&content, &file_name),
        Some("json") => parse_json_array(&content, &file_name),
        other => Err(CatalogError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// Parse JSON Lines content (one course per line)
pub fn parse_json_lines(content: &str, file_name: &str) -> Result<Vec<Course>> {
    let mut courses = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() {
            continue;
        }

        let raw: RawCourse =
            serde_json::from_str(line_trimmed).map_err(|e| CatalogError::ParseError {
                file: file_name.to_string(),
                line: line_no,
                reason: e.to_string(),
            })?;

        courses.push(into_course(raw, file_name, line_no)?);
    }

    Ok(courses)
}

/// Parse a JSON array of courses.
///
/// Line numbers in errors are the 1-based index of the record in the array.
pub fn parse_json_array(content: &str, file_name: &str) -> Result<Vec<Course>> {
    let raws: Vec<RawCourse> =
        serde_json::from_str(content).map_err(|e| CatalogError::ParseError {
            file: file_name.to_string(),
            line: e.line(),
            reason: e.to_string(),
        })?;

    raws.into_iter()
        .enumerate()
        .map(|(idx, raw)| into_course(raw, file_name, idx + 1))
        .collect()
}

fn into_course(raw: RawCourse, file_name: &str, line: usize) -> Result<Course> {
    let code = raw.code.trim().to_string();
    if code.is_empty() {
        return Err(CatalogError::ParseError {
            file: file_name.to_string(),
            line,
            reason: "Missing course code".to_string(),
        });
    }

    Ok(Course {
        level: parse_level(raw.level, &code)?,
        department: raw
            .department
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        code,
        title: raw.title.trim().to_string(),
        description: raw.description.trim().to_string(),
        embedding: raw.embedding,
    })
}

fn parse_level(level: i64, code: &str) -> Result<Level> {
    if !is_valid_level(level) {
        return Err(CatalogError::InvalidValue {
            field: format!("level of {}", code),
            value: level.to_string(),
        });
    }
    Ok(level as Level)
}
