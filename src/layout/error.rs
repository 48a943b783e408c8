use thiserror::Error;

/// Rejected layout input. The engine keeps its previous state whenever one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("distance matrix is not square: row {row} has {len} entries, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("condensed distances have {len} entries, expected {expected} for {items} items")]
    CondensedLength {
        len: usize,
        expected: usize,
        items: usize,
    },

    #[error("distance matrix is asymmetric at ({row}, {col}): {forward} vs {backward}")]
    Asymmetric {
        row: usize,
        col: usize,
        forward: f64,
        backward: f64,
    },

    #[error("invalid distance {value} at ({row}, {col})")]
    InvalidDistance { row: usize, col: usize, value: f64 },

    #[error("duplicate item id: {0}")]
    DuplicateId(String),

    #[error("distance matrix covers {matrix} items but {items} ids were supplied")]
    DimensionMismatch { matrix: usize, items: usize },
}
