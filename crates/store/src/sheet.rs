//! Workbook and worksheet handles.
//!
//! A workbook is a directory; a worksheet is one `<name>.csv` file inside
//! it. Worksheet names are restricted to a conservative character set so a
//! name can never escape the workbook directory.

use crate::{StoreError, StoreResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A workbook directory containing named worksheets.
///
/// Opening a workbook validates that the directory exists; individual
/// worksheets are resolved lazily so callers can decide whether a missing
/// sheet is fatal (startup configuration) or not.
#[derive(Debug, Clone)]
pub struct Workbook {
    dir: PathBuf,
}

impl Workbook {
    /// Opens the workbook at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WorkbookNotFound`] if `dir` does not exist or
    /// is not a directory.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(StoreError::WorkbookNotFound(dir.display().to_string()));
        }
        Ok(Self { dir })
    }

    /// Returns a handle to the named worksheet without touching the disk.
    ///
    /// The backing file may not exist yet; reads will then fail with
    /// [`StoreError::WorksheetNotFound`] while an append creates the file.
    pub fn worksheet(&self, name: &str) -> StoreResult<Worksheet> {
        validate_sheet_name(name)?;
        Ok(Worksheet {
            path: self.dir.join(format!("{name}.csv")),
            name: name.to_owned(),
        })
    }

    /// Returns a handle to the named worksheet, requiring that it exists.
    ///
    /// Used at startup so a misconfigured worksheet name fails fast instead
    /// of surfacing on the first request.
    pub fn existing_worksheet(&self, name: &str) -> StoreResult<Worksheet> {
        let sheet = self.worksheet(name)?;
        if !sheet.path.is_file() {
            return Err(StoreError::WorksheetNotFound(name.to_owned()));
        }
        Ok(sheet)
    }

    /// Creates the named worksheet as an empty sheet if it does not exist
    /// yet, and returns its handle. Existing content is left untouched.
    pub fn create_worksheet(&self, name: &str) -> StoreResult<Worksheet> {
        let sheet = self.worksheet(name)?;
        if !sheet.path.is_file() {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&sheet.path)
                .map_err(|source| StoreError::SheetWrite {
                    name: name.to_owned(),
                    source,
                })?;
        }
        Ok(sheet)
    }

    /// The workbook directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// One worksheet inside a workbook.
#[derive(Debug, Clone)]
pub struct Worksheet {
    path: PathBuf,
    name: String,
}

impl Worksheet {
    /// The worksheet name (without the `.csv` extension).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads the full sheet as rows of cells.
    ///
    /// Rows are returned in file order and may have differing lengths; the
    /// reference sheet in particular carries optional trailing columns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WorksheetNotFound`] if the backing file does
    /// not exist, or [`StoreError::SheetRead`] on a malformed file.
    pub fn get_all_values(&self) -> StoreResult<Vec<Vec<String>>> {
        if !self.path.is_file() {
            return Err(StoreError::WorksheetNotFound(self.name.clone()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|source| StoreError::SheetRead {
                name: self.name.clone(),
                source,
            })?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| StoreError::SheetRead {
                name: self.name.clone(),
                source,
            })?;
            rows.push(record.iter().map(str::to_owned).collect());
        }
        Ok(rows)
    }

    /// Reads a single zero-indexed column, top to bottom.
    ///
    /// Rows too short to reach the column contribute an empty string, so
    /// the result always has one entry per row.
    pub fn col_values(&self, index: usize) -> StoreResult<Vec<String>> {
        let rows = self.get_all_values()?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().nth(index).unwrap_or_default())
            .collect())
    }

    /// Whether the sheet currently holds no rows at all.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.get_all_values()?.is_empty())
    }

    /// Appends `rows` to the sheet in one batch.
    ///
    /// All rows are CSV-encoded into a buffer first and written with a
    /// single call, so either every row lands or none does. Creates the
    /// backing file when it does not exist yet.
    pub fn append_rows(&self, rows: &[Vec<String>]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut buffer = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(&mut buffer);
            for row in rows {
                writer
                    .write_record(row)
                    .map_err(|source| StoreError::SheetEncode {
                        name: self.name.clone(),
                        source,
                    })?;
            }
            writer.flush().map_err(|source| StoreError::SheetWrite {
                name: self.name.clone(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StoreError::SheetWrite {
                name: self.name.clone(),
                source,
            })?;
        file.write_all(&buffer)
            .map_err(|source| StoreError::SheetWrite {
                name: self.name.clone(),
                source,
            })?;

        tracing::debug!(sheet = %self.name, rows = rows.len(), "appended rows");
        Ok(())
    }
}

fn validate_sheet_name(name: &str) -> StoreResult<()> {
    let ok = !name.is_empty()
        && name
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidWorksheetName(name.to_owned()))
    }
}
