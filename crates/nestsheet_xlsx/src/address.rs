//! Grid address arithmetic.
//!
//! Addresses are `(col, row)` pairs: `col` is zero-based, `row` is one-based,
//! matching the `A1` text form. Column letters use the bijective base-26
//! scheme (`A`..`Z`, `AA`..`AZ`, `BA`..) and only appear at the text boundary.

use std::fmt;
use std::str::FromStr;

use crate::spec::{RenderError, Result};

/// Step direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumDirection {
    /// Next column.
    Right,
    /// Previous column.
    Left,
    /// Previous row.
    Up,
    /// Next row.
    Down,
}

/// One grid cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Zero-based column index (`A` is 0).
    pub col: u32,
    /// One-based row index.
    pub row: u32,
}

impl CellAddress {
    /// Top-left cell `A1`.
    pub const ORIGIN: CellAddress = CellAddress { col: 0, row: 1 };

    /// Build an address from a zero-based column and one-based row.
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Return the address `step` cells away in `direction`.
    ///
    /// Leaving the grid (row 0 or left of `A`) is a caller error and fails
    /// instead of wrapping.
    pub fn offset(self, direction: EnumDirection, step: u32) -> Result<CellAddress> {
        let err = || RenderError::AddressOutOfBounds {
            address: self.to_string(),
            direction,
            step,
        };
        let addr = match direction {
            EnumDirection::Right => {
                CellAddress::new(self.col.checked_add(step).ok_or_else(err)?, self.row)
            }
            EnumDirection::Left => {
                CellAddress::new(self.col.checked_sub(step).ok_or_else(err)?, self.row)
            }
            EnumDirection::Down => {
                CellAddress::new(self.col, self.row.checked_add(step).ok_or_else(err)?)
            }
            EnumDirection::Up => {
                let row = self.row.checked_sub(step).filter(|r| *r >= 1);
                CellAddress::new(self.col, row.ok_or_else(err)?)
            }
        };
        Ok(addr)
    }

    /// Same column, different row.
    pub const fn with_row(self, row: u32) -> Self {
        Self { col: self.col, row }
    }

    /// Column letters of this address.
    pub fn column_letters(&self) -> String {
        column_index_to_letters(self.col)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        let c_addr = s.trim();
        let n_split = c_addr
            .find(|chr: char| chr.is_ascii_digit())
            .ok_or_else(|| RenderError::InvalidAddress(s.to_string()))?;
        let (c_letters, c_digits) = c_addr.split_at(n_split);

        let col = column_letters_to_index(c_letters)
            .map_err(|_| RenderError::InvalidAddress(s.to_string()))?;
        let row = c_digits
            .parse::<u32>()
            .ok()
            .filter(|r| *r >= 1)
            .ok_or_else(|| RenderError::InvalidAddress(s.to_string()))?;

        Ok(CellAddress { col, row })
    }
}

/// Render `first:last` range text.
pub fn format_range(first: CellAddress, last: CellAddress) -> String {
    format!("{first}:{last}")
}

/// Convert column letters (`"A"`, `"AB"`) to a zero-based index.
pub fn column_letters_to_index(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(RenderError::InvalidAddress(letters.to_string()));
    }

    let mut n_col: u64 = 0;
    for chr in letters.chars() {
        if !chr.is_ascii_alphabetic() {
            return Err(RenderError::InvalidAddress(letters.to_string()));
        }
        let n_digit = u64::from(chr.to_ascii_uppercase() as u8 - b'A') + 1;
        n_col = n_col * 26 + n_digit;
        if n_col > u64::from(u32::MAX) {
            return Err(RenderError::InvalidAddress(letters.to_string()));
        }
    }

    u32::try_from(n_col - 1).map_err(|_| RenderError::InvalidAddress(letters.to_string()))
}

/// Convert a zero-based column index to letters.
pub fn column_index_to_letters(col: u32) -> String {
    let mut v_chars = Vec::new();
    let mut n_rest = u64::from(col) + 1;
    while n_rest > 0 {
        let n_digit = ((n_rest - 1) % 26) as u8;
        v_chars.push(char::from(b'A' + n_digit));
        n_rest = (n_rest - 1) / 26;
    }
    v_chars.iter().rev().collect()
}

/// Shift column letters by a signed number of columns (`"Z"` +1 is `"AA"`).
pub fn shift_column_letters(letters: &str, delta: i64) -> Result<String> {
    let n_col = i64::from(column_letters_to_index(letters)?);
    let n_target = n_col
        .checked_add(delta)
        .filter(|n| *n >= 0)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| RenderError::AddressOutOfBounds {
            address: letters.to_string(),
            direction: if delta < 0 {
                EnumDirection::Left
            } else {
                EnumDirection::Right
            },
            step: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
        })?;
    Ok(column_index_to_letters(n_target))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_column_letters_boundaries() {
        assert_eq!(column_index_to_letters(0), "A");
        assert_eq!(column_index_to_letters(25), "Z");
        assert_eq!(column_index_to_letters(26), "AA");
        assert_eq!(column_index_to_letters(51), "AZ");
        assert_eq!(column_index_to_letters(52), "BA");
        assert_eq!(column_index_to_letters(701), "ZZ");
        assert_eq!(column_index_to_letters(702), "AAA");
        assert_eq!(column_index_to_letters(16_383), "XFD");

        assert_eq!(column_letters_to_index("A").unwrap(), 0);
        assert_eq!(column_letters_to_index("xfd").unwrap(), 16_383);
        assert!(column_letters_to_index("").is_err());
        assert!(column_letters_to_index("A1").is_err());
    }

    #[test]
    fn test_shift_column_letters_carry_and_borrow() {
        assert_eq!(shift_column_letters("Z", 1).unwrap(), "AA");
        assert_eq!(shift_column_letters("AA", -1).unwrap(), "Z");
        assert_eq!(shift_column_letters("AZ", 1).unwrap(), "BA");
        assert_eq!(shift_column_letters("ZZ", 1).unwrap(), "AAA");
        assert_eq!(shift_column_letters("A", 702).unwrap(), "AAA");
        assert!(matches!(
            shift_column_letters("A", -1),
            Err(RenderError::AddressOutOfBounds {
                direction: EnumDirection::Left,
                ..
            })
        ));
    }

    #[test]
    fn test_address_text_round_trip() {
        let addr: CellAddress = "AB12".parse().unwrap();
        assert_eq!(addr, CellAddress::new(27, 12));
        assert_eq!(addr.to_string(), "AB12");
        assert_eq!(addr.column_letters(), "AB");
        assert_eq!(
            format_range(CellAddress::ORIGIN, CellAddress::new(2, 1)),
            "A1:C1"
        );

        for bad in ["", "12", "AB", "A0", "A-1", "1A"] {
            assert!(bad.parse::<CellAddress>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_offset_fails_fast_outside_grid() {
        let a1 = CellAddress::ORIGIN;
        assert!(a1.offset(EnumDirection::Up, 1).is_err());
        assert!(a1.offset(EnumDirection::Left, 1).is_err());
        assert_eq!(
            a1.offset(EnumDirection::Right, 26).unwrap().to_string(),
            "AA1"
        );
        assert_eq!(a1.offset(EnumDirection::Down, 4).unwrap().to_string(), "A5");
        assert_eq!(a1.offset(EnumDirection::Down, 0).unwrap(), a1);
    }

    proptest! {
        #[test]
        fn prop_horizontal_steps_cancel(col in 0u32..100_000, row in 1u32..1_000_000, n in 0u32..50_000) {
            let addr = CellAddress::new(col, row);
            let back = addr
                .offset(EnumDirection::Right, n)
                .and_then(|a| a.offset(EnumDirection::Left, n))
                .unwrap();
            prop_assert_eq!(back, addr);
        }

        #[test]
        fn prop_vertical_steps_cancel(col in 0u32..100_000, row in 1u32..1_000_000, n in 0u32..50_000) {
            let addr = CellAddress::new(col, row);
            let back = addr
                .offset(EnumDirection::Down, n)
                .and_then(|a| a.offset(EnumDirection::Up, n))
                .unwrap();
            prop_assert_eq!(back, addr);
        }

        #[test]
        fn prop_letters_round_trip(col in 0u32..5_000_000) {
            let letters = column_index_to_letters(col);
            prop_assert_eq!(column_letters_to_index(&letters).unwrap(), col);
            let next = shift_column_letters(&letters, 1).unwrap();
            prop_assert_eq!(shift_column_letters(&next, -1).unwrap(), letters);
        }

        #[test]
        fn prop_address_text_round_trip(col in 0u32..20_000, row in 1u32..2_000_000) {
            let addr = CellAddress::new(col, row);
            prop_assert_eq!(addr.to_string().parse::<CellAddress>().unwrap(), addr);
        }
    }
}
