use crate::error::Error;
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Source of sheet names and string rows for a spreadsheet path.
///
/// Implementations report unreadable or unsupported files as
/// [`Error::Parse`].
pub trait WorkbookReader: Send + Sync {
    fn list_sheets(&self, path: &Path) -> Result<Vec<String>, Error>;

    fn read_rows(&self, path: &Path, sheet: &str) -> Result<Vec<Vec<String>>, Error>;

    /// Reads every sheet. A sheet that fails to read is logged and left out.
    fn read_workbook(&self, path: &Path) -> Result<Workbook, Error> {
        let mut workbook = Workbook::default();
        for name in self.list_sheets(path)? {
            match self.read_rows(path, &name) {
                Ok(rows) => workbook.sheets.push(WorkbookSheet { name, rows }),
                Err(err) => warn!(path = %path.display(), sheet = %name, "Failed to read sheet: {}", err),
            }
        }
        Ok(workbook)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<WorkbookSheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&WorkbookSheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookSheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl WorkbookSheet {
    /// Splits the sheet at a 1-based header row. Returns `None` when the sheet
    /// has fewer rows than the offset.
    pub fn table(&self, offset_header: usize) -> Option<SheetTable<'_>> {
        let offset = offset_header.max(1);
        if self.rows.len() < offset {
            return None;
        }
        let headers = self.rows[offset - 1]
            .iter()
            .map(|cell| cell.trim().to_string())
            .collect();
        Some(SheetTable {
            headers,
            rows: &self.rows[offset..],
        })
    }
}

/// Header row plus the data rows below it.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable<'a> {
    pub headers: Vec<String>,
    pub rows: &'a [Vec<String>],
}

impl SheetTable<'_> {
    /// Header name to column index. Blank headers are skipped; a repeated
    /// header resolves to its last column.
    pub fn header_index(&self) -> HashMap<String, usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(index, header)| (header.clone(), index))
            .collect()
    }

    pub fn has_headers(&self) -> bool {
        self.headers.iter().any(|header| !header.is_empty())
    }

    pub fn non_empty_row_count(&self) -> usize {
        self.rows.iter().filter(|row| !is_blank_row(row)).count()
    }
}

pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Reads `.xlsx`, `.xls`, `.xlsb` and `.ods` files with calamine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineReader;

impl CalamineReader {
    fn open(
        path: &Path,
    ) -> Result<calamine::Sheets<std::io::BufReader<std::fs::File>>, Error> {
        open_workbook_auto(path).map_err(|err| Error::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

impl WorkbookReader for CalamineReader {
    fn list_sheets(&self, path: &Path) -> Result<Vec<String>, Error> {
        Ok(Self::open(path)?.sheet_names())
    }

    fn read_rows(&self, path: &Path, sheet: &str) -> Result<Vec<Vec<String>>, Error> {
        let mut workbook = Self::open(path)?;
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|err| Error::Parse {
                path: path.to_path_buf(),
                message: format!("sheet '{}': {}", sheet, err),
            })?;
        Ok(range_to_rows(&range))
    }

    fn read_workbook(&self, path: &Path) -> Result<Workbook, Error> {
        let mut workbook = Self::open(path)?;
        let mut result = Workbook::default();

        for name in workbook.sheet_names() {
            match workbook.worksheet_range(&name) {
                Ok(range) => {
                    let rows = range_to_rows(&range);
                    debug!(path = %path.display(), sheet = %name, rows = rows.len(), "Read sheet");
                    result.sheets.push(WorkbookSheet { name, rows });
                }
                Err(err) => {
                    warn!(path = %path.display(), sheet = %name, "Failed to read sheet: {}", err);
                }
            }
        }

        Ok(result)
    }
}

/// calamine ranges start at the first used cell; pad back to A1 so header
/// offsets count from the top of the sheet.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };

    let mut rows: Vec<Vec<String>> = (0..start_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut cells = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(cell_to_string));
        rows.push(cells);
    }
    rows
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // Excel stores every number as a double; print whole ones as integers.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(value) if value.time() == NaiveTime::MIN => value.format("%Y-%m-%d").to_string(),
            Some(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => dt.to_string(),
        },
        Data::DateTimeIso(text) | Data::DurationIso(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Workbooks held in memory, keyed by the path they are requested under.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReader {
    workbooks: HashMap<PathBuf, Workbook>,
}

impl InMemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sheet(&mut self, path: impl Into<PathBuf>, sheet: &str, rows: Vec<Vec<String>>) {
        let workbook = self.workbooks.entry(path.into()).or_default();
        match workbook.sheets.iter_mut().find(|s| s.name == sheet) {
            Some(existing) => existing.rows = rows,
            None => workbook.sheets.push(WorkbookSheet {
                name: sheet.to_string(),
                rows,
            }),
        }
    }

    pub fn with_sheet(mut self, path: impl Into<PathBuf>, sheet: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        self.insert_sheet(path, sheet, rows);
        self
    }

    pub fn remove_workbook(&mut self, path: &Path) -> Option<Workbook> {
        self.workbooks.remove(path)
    }

    fn workbook(&self, path: &Path) -> Result<&Workbook, Error> {
        self.workbooks.get(path).ok_or_else(|| Error::Parse {
            path: path.to_path_buf(),
            message: "workbook is not loaded".to_string(),
        })
    }
}

impl WorkbookReader for InMemoryReader {
    fn list_sheets(&self, path: &Path) -> Result<Vec<String>, Error> {
        Ok(self
            .workbook(path)?
            .sheet_names()
            .into_iter()
            .map(String::from)
            .collect())
    }

    fn read_rows(&self, path: &Path, sheet: &str) -> Result<Vec<Vec<String>>, Error> {
        self.workbook(path)?
            .sheet(sheet)
            .map(|s| s.rows.clone())
            .ok_or_else(|| Error::SheetMissing {
                file: path.display().to_string(),
                sheet: sheet.to_string(),
            })
    }

    fn read_workbook(&self, path: &Path) -> Result<Workbook, Error> {
        self.workbook(path).cloned()
    }
}
