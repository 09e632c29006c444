//! Plain-text board positions, one row per line:
//!
//! - `.` hidden safe cell
//! - `*` hidden mine
//! - `o` revealed safe cell
//! - `F` flagged mine
//! - `f` flagged safe cell
//!
//! Blank lines and lines starting with `#` are skipped.

use alloc::vec::Vec;
use core::str::FromStr;
use ndarray::Array2;

use crate::*;

impl FromStr for PlayEngine {
    type Err = GameError;

    fn from_str(text: &str) -> Result<Self> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        let width = rows.first().map_or(0, |row| row.chars().count());
        let size: Coord2 = (
            width.try_into().map_err(|_| GameError::InvalidBoardShape)?,
            rows.len().try_into().map_err(|_| GameError::InvalidBoardShape)?,
        );
        if size.0 == 0 || size.1 == 0 {
            return Err(GameError::InvalidBoardShape);
        }

        let mut mines = Array2::from_elem(size.to_nd_index(), false);
        let mut revealed = Array2::from_elem(size.to_nd_index(), false);
        let mut flagged = Array2::from_elem(size.to_nd_index(), false);

        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(GameError::InvalidBoardShape);
            }
            for (x, symbol) in row.chars().enumerate() {
                let index = [x, y];
                match symbol {
                    '.' => {}
                    '*' => mines[index] = true,
                    'o' => revealed[index] = true,
                    'F' => {
                        mines[index] = true;
                        flagged[index] = true;
                    }
                    'f' => flagged[index] = true,
                    _ => return Err(GameError::InvalidSymbol { row: y, symbol }),
                }
            }
        }

        PlayEngine::from_position(MineLayout::from_mine_mask(mines), &revealed, &flagged)
    }
}
