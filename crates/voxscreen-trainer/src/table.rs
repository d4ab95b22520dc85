//! Minimal CSV tables.
//!
//! Comma separated, first line is the header. Fields may be wrapped in
//! double quotes, with `""` standing for a literal quote.

use std::fs;
use std::path::Path;

use voxscreen_core::{Error, Result};

/// A parsed CSV file with string cells
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a CSV file
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::dataset(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&text)
    }

    /// Parse CSV text. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| Error::dataset("CSV file is empty"))?;
        let headers: Vec<String> = split_line(header)?
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, line) in lines {
            let row = split_line(line)
                .map_err(|e| Error::dataset(format!("line {}: {e}", idx + 1)))?;
            if row.len() != headers.len() {
                return Err(Error::dataset(format!(
                    "line {} has {} fields, header has {}",
                    idx + 1,
                    row.len(),
                    headers.len()
                )));
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row[idx].as_str())
    }
}

fn split_line(line: &str) -> Result<Vec<String>> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::dataset("unterminated quoted field"));
    }
    fields.push(field);
    Ok(fields)
}

/// Write numeric rows under a header.
pub fn write_csv(path: &Path, headers: &[String], rows: &[Vec<f64>]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut out = headers.join(",");
    out.push('\n');
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    fs::write(path, out)?;
    Ok(())
}
