use super::LayoutError;

const SYMMETRY_TOLERANCE: f64 = 1e-6;

/// Symmetric pairwise distances over the current item list, stored densely.
///
/// Row `i` belongs to the `i`-th item of the id list the matrix was fetched
/// for. The matrix is replaced wholesale whenever that list changes.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceMatrix {
    len: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    pub fn empty() -> Self {
        Self {
            len: 0,
            values: Vec::new(),
        }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, LayoutError> {
        let len = rows.len();
        let mut values = Vec::with_capacity(len * len);
        for (row, entries) in rows.into_iter().enumerate() {
            if entries.len() != len {
                return Err(LayoutError::NotSquare {
                    row,
                    len: entries.len(),
                    expected: len,
                });
            }
            values.extend(entries);
        }

        let matrix = Self { len, values };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Builds a matrix from the row-major upper triangle (diagonal excluded).
    pub fn from_condensed(items: usize, condensed: Vec<f64>) -> Result<Self, LayoutError> {
        let expected = items * items.saturating_sub(1) / 2;
        if condensed.len() != expected {
            return Err(LayoutError::CondensedLength {
                len: condensed.len(),
                expected,
                items,
            });
        }

        let mut values = vec![0.0; items * items];
        let mut cursor = 0usize;
        for row in 0..items {
            for col in (row + 1)..items {
                let value = condensed[cursor];
                values[row * items + col] = value;
                values[col * items + row] = value;
                cursor += 1;
            }
        }

        let matrix = Self { len: items, values };
        matrix.validate()?;
        Ok(matrix)
    }

    fn validate(&self) -> Result<(), LayoutError> {
        let n = self.len;
        for row in 0..n {
            for col in 0..n {
                let value = self.values[row * n + col];
                if !value.is_finite() || value < 0.0 {
                    return Err(LayoutError::InvalidDistance { row, col, value });
                }
                if row == col {
                    if value > SYMMETRY_TOLERANCE {
                        return Err(LayoutError::InvalidDistance { row, col, value });
                    }
                    continue;
                }
                if col < row {
                    continue;
                }

                let backward = self.values[col * n + row];
                if (value - backward).abs() > SYMMETRY_TOLERANCE * value.abs().max(1.0) {
                    return Err(LayoutError::Asymmetric {
                        row,
                        col,
                        forward: value,
                        backward,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.len + col]
    }

    /// Restricts the matrix to `indices`, in that order.
    pub fn submatrix(&self, indices: &[usize]) -> Self {
        let len = indices.len();
        let mut values = Vec::with_capacity(len * len);
        for &row in indices {
            for &col in indices {
                values.push(self.get(row, col));
            }
        }
        Self { len, values }
    }
}
