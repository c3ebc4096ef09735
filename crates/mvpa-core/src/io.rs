//! Dataset persistence and text import
//!
//! Two on-disk dataset formats are supported and chosen by file extension:
//!
//! - `.json`: the serde representation of [`Dataset`], pretty printed.
//! - anything else: a binary container made of the magic `MVDS`, a
//!   little-endian `u32` format version and a bincode payload.

use log::debug;
use std::fs;
use std::path::Path;

use crate::channels;
use crate::dataset::Dataset;
use crate::error::{MvpaError, Result};

/// Magic bytes of the binary dataset container
pub const MAGIC: [u8; 4] = *b"MVDS";

/// Current binary format version
pub const FORMAT_VERSION: u32 = 1;

/// On-disk dataset encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// Pretty JSON
    Json,
    /// Magic + version + bincode
    Binary,
}

impl DatasetFormat {
    /// Pick the format from a path's extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DatasetFormat::Json,
            _ => DatasetFormat::Binary,
        }
    }
}

/// Serialize a dataset in the given format
pub fn encode(ds: &Dataset, format: DatasetFormat) -> Result<Vec<u8>> {
    match format {
        DatasetFormat::Json => {
            // JSON has no representation for inf/NaN; serde_json would write null
            if ds.samples().iter().any(|v| !v.is_finite()) {
                return Err(MvpaError::format(
                    "samples contain inf or NaN, which JSON cannot store; use a binary dataset file",
                ));
            }
            Ok(serde_json::to_vec_pretty(ds)?)
        }
        DatasetFormat::Binary => {
            let mut out = Vec::with_capacity(8);
            out.extend_from_slice(&MAGIC);
            out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
            out.extend(bincode::serialize(ds)?);
            Ok(out)
        }
    }
}

/// Deserialize a dataset in the given format
pub fn decode(bytes: &[u8], format: DatasetFormat) -> Result<Dataset> {
    let ds: Dataset = match format {
        DatasetFormat::Json => serde_json::from_slice(bytes)?,
        DatasetFormat::Binary => {
            if bytes.len() < 8 {
                return Err(MvpaError::format("binary dataset is truncated"));
            }
            if bytes[..4] != MAGIC {
                return Err(MvpaError::format(format!(
                    "invalid magic number: expected {:?}, found {:?}",
                    MAGIC,
                    &bytes[..4]
                )));
            }
            let mut version = [0u8; 4];
            version.copy_from_slice(&bytes[4..8]);
            let version = u32::from_le_bytes(version);
            if version != FORMAT_VERSION {
                return Err(MvpaError::format(format!(
                    "unsupported dataset version {}, supported: {}",
                    version, FORMAT_VERSION
                )));
            }
            bincode::deserialize(&bytes[8..])?
        }
    };
    validate(&ds)?;
    Ok(ds)
}

// Deserialization bypasses the attribute setters.
fn validate(ds: &Dataset) -> Result<()> {
    for (name, attr) in ds.sa() {
        if attr.len() != ds.nsamples() {
            return Err(MvpaError::format(format!(
                "sample attribute '{}' has {} entries for {} samples",
                name,
                attr.len(),
                ds.nsamples()
            )));
        }
    }
    for (name, attr) in ds.fa() {
        if attr.len() != ds.nfeatures() {
            return Err(MvpaError::format(format!(
                "feature attribute '{}' has {} entries for {} features",
                name,
                attr.len(),
                ds.nfeatures()
            )));
        }
    }
    Ok(())
}

/// Load a dataset from disk
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| MvpaError::io(path, e))?;
    let ds = decode(&bytes, DatasetFormat::from_path(path))?;
    debug!(target: channels::IO, "loaded {} with shape {:?}", path.display(), ds.shape());
    Ok(ds)
}

/// Write a dataset to disk, creating parent directories
pub fn save_dataset(ds: &Dataset, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| MvpaError::io(parent, e))?;
        }
    }
    let bytes = encode(ds, DatasetFormat::from_path(path))?;
    fs::write(path, bytes).map_err(|e| MvpaError::io(path, e))?;
    debug!(target: channels::IO, "saved {:?} dataset to {}", ds.shape(), path.display());
    Ok(())
}

/// Meaningful lines of a text file: trimmed, without blanks and `#` comments
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| MvpaError::io(path, e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn split_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

/// Parse a text matrix: one row per line, whitespace or comma separated
pub fn parse_text_matrix(lines: &[String]) -> Result<Vec<Vec<f64>>> {
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(lines.len());
    for (lineno, line) in lines.iter().enumerate() {
        let row = split_tokens(line)
            .map(|t| {
                t.parse::<f64>().map_err(|_| {
                    MvpaError::format(format!("line {}: '{}' is not a number", lineno + 1, t))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(MvpaError::format(format!(
                    "line {}: {} columns, expected {}",
                    lineno + 1,
                    row.len(),
                    first.len()
                )));
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Read a dataset from a text matrix file (rows are samples)
pub fn read_text_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let rows = parse_text_matrix(&read_lines(path)?)?;
    if rows.is_empty() {
        return Err(MvpaError::format(format!("{} contains no samples", path.display())));
    }
    Dataset::from_rows(rows)
}

/// Column-oriented text table with a header line
#[derive(Debug, Clone, PartialEq)]
pub struct TextTable {
    /// Column names from the header
    pub columns: Vec<String>,
    /// Data rows, one token per column
    pub rows: Vec<Vec<String>>,
}

impl TextTable {
    /// Parse lines where the first one names the columns
    pub fn parse(lines: &[String]) -> Result<Self> {
        let (header, body) = lines
            .split_first()
            .ok_or_else(|| MvpaError::format("table has no header line"))?;
        let columns: Vec<String> = split_tokens(header).map(str::to_string).collect();
        let mut rows = Vec::with_capacity(body.len());
        for (i, line) in body.iter().enumerate() {
            let row: Vec<String> = split_tokens(line).map(str::to_string).collect();
            if row.len() != columns.len() {
                return Err(MvpaError::format(format!(
                    "row {} has {} fields, header names {}",
                    i + 1,
                    row.len(),
                    columns.len()
                )));
            }
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    /// Read a table file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&read_lines(path)?)
    }

    /// Index of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}
