use crate::records::value::Value;
use crate::spreadsheet::sheet::Rows;
use crate::table::TableExtent;
use std::iter::FusedIterator;

/// Raw value tuples of a located table, one per row below the header.
///
/// Ends at the first row that is blank across the table columns, or at the
/// end of the sheet.
pub struct RowStream<'a> {
    rows: Rows<'a>,
    start_col: usize,
    stop_col: usize,
    finished: bool,
}

impl<'a> RowStream<'a> {
    /// `rows` must be positioned on the first record row, as [`locate`](crate::table::locator::locate) leaves it.
    pub fn new(rows: Rows<'a>, extent: &TableExtent) -> Self {
        RowStream {
            rows,
            start_col: extent.start_col,
            stop_col: extent.stop_col,
            finished: false,
        }
    }
}

impl Iterator for RowStream<'_> {
    type Item = Vec<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let values = self
            .rows
            .next()
            .map(|row| row.values(self.start_col, self.stop_col))
            .filter(|values| !values.iter().all(Value::is_blank));
        self.finished = values.is_none();
        values
    }
}

impl FusedIterator for RowStream<'_> {}
