//! A1-style cell references

/// Converts a column letter sequence (`A`, `AB`) to a 0-based index.
pub(crate) fn col_to_index(col: &str) -> Option<usize> {
    if col.is_empty() {
        return None;
    }
    col.chars().try_fold(0usize, |index, character| {
        if character.is_ascii_alphabetic() {
            let digit = (character.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            index.checked_mul(26)?.checked_add(digit)
        } else {
            None
        }
    }).map(|index| index - 1)
}

/// Converts a 0-based column index to its letters (`0` is `A`).
pub(crate) fn index_to_col(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.iter().rev().map(|letter| *letter as char).collect()
}

/// Formats 0-based coordinates as a reference (`(0, 0)` is `A1`).
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}

/// Parses a reference such as `B3` to 0-based `(row, col)`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|character: char| character.is_ascii_digit())?;
    let (col, row) = reference.split_at(split);
    let row = row.parse::<usize>().ok()?.checked_sub(1)?;
    Some((row, col_to_index(col)?))
}
