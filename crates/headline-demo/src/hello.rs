//! Data behind the hello page: a small two-column table

use rand::Rng;
use serde::Serialize;

/// Column names of the hello table
pub const HELLO_COLUMNS: [&str; 2] = ["A", "B"];

/// Rows shown until the data is shuffled
pub const SEED_ROWS: [[u32; 2]; 4] = [[1, 10], [2, 20], [3, 30], [4, 40]];

/// Upper bound (exclusive) of shuffled values
pub const SHUFFLE_MAX: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelloTable {
    pub columns: Vec<String>,
    pub rows: Vec<[u32; 2]>,
}

impl HelloTable {
    /// The fixed seed table
    pub fn seeded() -> Self {
        Self::with_rows(SEED_ROWS.to_vec())
    }

    /// Same shape as the seed table, filled with random integers in `[0, 100)`
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let rows = (0..SEED_ROWS.len())
            .map(|_| [rng.gen_range(0..SHUFFLE_MAX), rng.gen_range(0..SHUFFLE_MAX)])
            .collect();
        Self::with_rows(rows)
    }

    fn with_rows(rows: Vec<[u32; 2]>) -> Self {
        Self {
            columns: HELLO_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }
}
