//! Workbook loading from a directory of CSV sheet files.

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

/// One named sheet: a header row plus data rows of string cells.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A workbook of named sheets, the input to normalization.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Stable source identifier used for event id derivation
    /// (e.g. the export directory or filename).
    pub source_id: String,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            sheets: Vec::new(),
        }
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Total number of data rows across all sheets.
    pub fn total_rows(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.rows.len()).sum()
    }
}

/// Load a workbook from a directory of CSV files.
///
/// Each `.csv` file becomes one sheet named after its file stem; files are
/// visited in filename order so sheet order is stable. Non-CSV entries are
/// skipped. An empty file yields an empty sheet, not an error.
pub fn load_workbook_dir(dir: &Path) -> Result<Workbook> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let source_id = dir.display().to_string();
    let mut workbook = Workbook::new(source_id);
    for path in files {
        workbook.sheets.push(load_sheet(&path)?);
    }
    Ok(workbook)
}

fn load_sheet(path: &Path) -> Result<Sheet> {
    let name = path
        .file_stem()
        .and_then(|v| v.to_str())
        .unwrap_or_default()
        .to_string();

    let file = std::fs::File::open(path).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(|h| h.trim().to_string()).collect(),
        // headers() fails only on a malformed first record; an empty file
        // yields an empty header set instead.
        Err(e) => {
            return Err(IngestError::CsvParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
    };

    let mut sheet = Sheet::new(name, headers);
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        sheet
            .rows
            .push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_sheets_sorted_by_filename() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b_worklist.csv"), "A,B\n1,2\n").unwrap();
        std::fs::write(dir.path().join("a_production.csv"), "X\nv\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let workbook = load_workbook_dir(dir.path()).unwrap();
        let names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a_production", "b_worklist"]);
        assert_eq!(workbook.total_rows(), 2);
    }

    #[test]
    fn empty_file_yields_empty_sheet() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("empty.csv"), "").unwrap();

        let workbook = load_workbook_dir(dir.path()).unwrap();
        assert_eq!(workbook.sheets.len(), 1);
        assert!(workbook.sheets[0].is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = load_workbook_dir(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, IngestError::DirectoryNotFound { .. }));
    }
}
