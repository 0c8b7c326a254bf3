use crate::records::value::Value;
use crate::spreadsheet::cell::Cell;
use std::collections::BTreeMap;
use std::iter::FusedIterator;

static NULL: Value = Value::Null;

/// A worksheet held in memory as a sparse grid of populated cells.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// Populated cells keyed by (row, col)
    cells: BTreeMap<(usize, usize), Value>,
    /// Actual data range (determined from cell data)
    row_upper_bound: Option<usize>,
    col_upper_bound: Option<usize>,
}

impl Sheet {
    pub fn new(file_name: &str, name: &str) -> Self {
        Sheet {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            ..Sheet::default()
        }
    }

    /// Builds a sheet from a dense grid; row and column indexes start at 0.
    pub fn from_rows<R, V>(name: &str, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut sheet = Sheet::new("", name);
        for (row, values) in rows.into_iter().enumerate() {
            for (col, value) in values.into_iter().enumerate() {
                sheet.push(Cell {
                    row,
                    col,
                    value: value.into(),
                });
            }
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Adds a cell; `Null` cells are not stored.
    pub fn push(&mut self, cell: Cell) {
        if cell.value.is_null() {
            return;
        }
        self.row_upper_bound = self.row_upper_bound.max(Some(cell.row));
        self.col_upper_bound = self.col_upper_bound.max(Some(cell.col));
        self.cells.insert((cell.row, cell.col), cell.value);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of rows up to and including the last populated one.
    pub fn row_count(&self) -> usize {
        self.row_upper_bound.map(|row| row + 1).unwrap_or(0)
    }

    /// Number of columns up to and including the last populated one.
    pub fn col_count(&self) -> usize {
        self.col_upper_bound.map(|col| col + 1).unwrap_or(0)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.cells.get(&(row, col))
    }

    /// Value at (row, col), `Null` when the cell is absent.
    pub fn value(&self, row: usize, col: usize) -> &Value {
        self.get(row, col).unwrap_or(&NULL)
    }

    /// A cursor over every row from the first to the last populated one,
    /// blank rows included.
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            sheet: self,
            next: 0,
            end: self.row_count(),
        }
    }
}

/// Row cursor over a [`Sheet`].
#[derive(Clone, Debug)]
pub struct Rows<'a> {
    sheet: &'a Sheet,
    next: usize,
    end: usize,
}

impl<'a> Rows<'a> {
    pub fn sheet(&self) -> &'a Sheet {
        self.sheet
    }
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next < self.end {
            let row = Row {
                sheet: self.sheet,
                index: self.next,
            };
            self.next += 1;
            Some(row)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}

impl FusedIterator for Rows<'_> {}

/// One worksheet row.
#[derive(Copy, Clone, Debug)]
pub struct Row<'a> {
    sheet: &'a Sheet,
    index: usize,
}

impl<'a> Row<'a> {
    /// Row index (0-based)
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self, col: usize) -> &'a Value {
        self.sheet.value(self.index, col)
    }

    /// Populated cells of the row in column order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, &'a Value)> + 'a {
        self.sheet
            .cells
            .range((self.index, 0)..=(self.index, usize::MAX))
            .map(|((_, col), value)| (*col, value))
    }

    /// The leftmost truthy cell of the row.
    pub fn first_truthy(&self) -> Option<(usize, &'a Value)> {
        self.cells().find(|(_, value)| value.is_truthy())
    }

    /// Values of columns `start_col..stop_col`, absent cells as `Null`.
    pub fn values(&self, start_col: usize, stop_col: usize) -> Vec<Value> {
        (start_col..stop_col).map(|col| self.value(col).to_owned()).collect()
    }
}
