//! Utilities for parsing A1-style cell references.
//!
//! Rows and columns come back 1-based, the way the worksheet numbers them.

/// Parse a raw reference like `B3` (or `$B$3`) into 1-based `(col, row)`.
///
/// Returns `None` when either the letters or the digits are missing, or the
/// value overflows.
pub fn parse_cell_ref(ref_bytes: &[u8]) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for &b in ref_bytes {
        if b == b'$' {
            continue;
        }
        if b.is_ascii_alphabetic() {
            if saw_row {
                return None;
            }
            let upper = b.to_ascii_uppercase();
            col = col.checked_mul(26)?.checked_add(u32::from(upper - b'A') + 1)?;
            saw_col = true;
        } else if b.is_ascii_digit() {
            row = row.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 {
        return None;
    }
    Some((col, row))
}

/// Column letters for a 1-based column index (`1` is `"A"`, `27` is `"AA"`).
#[must_use]
pub fn column_name(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        if let Some(letter) = char::from_u32(u32::from(b'A') + rem) {
            letters.push(letter);
        }
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}
