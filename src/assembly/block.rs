//! Dense element arrays partitioned into per-field blocks.
use nalgebra::{DMatrix, DMatrixView, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use std::ops::{Index, IndexMut};

/// Sizes and offsets of consecutive field blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BlockLayout {
    sizes: Vec<usize>,
    offsets: Vec<usize>,
}

impl BlockLayout {
    fn new(sizes: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(sizes.len());
        let mut offset = 0;
        for size in sizes {
            offsets.push(offset);
            offset += size;
        }
        Self {
            sizes: sizes.to_vec(),
            offsets,
        }
    }

    fn total(&self) -> usize {
        self.sizes.iter().sum()
    }

    fn flat(&self, field: usize, local: usize) -> usize {
        debug_assert!(local < self.sizes[field], "Local index out of bounds for field block");
        self.offsets[field] + local
    }
}

/// Element vector split into one block per field.
///
/// Indexed by `(field, local)`, where `field` is the position of the field in system order.
#[derive(Debug, Clone)]
pub struct FieldBlockVector {
    layout: BlockLayout,
    data: DVector<f64>,
}

impl Default for FieldBlockVector {
    fn default() -> Self {
        Self {
            layout: BlockLayout::default(),
            data: DVector::zeros(0),
        }
    }
}

impl FieldBlockVector {
    pub fn zeros(sizes: &[usize]) -> Self {
        let layout = BlockLayout::new(sizes);
        let data = DVector::zeros(layout.total());
        Self { layout, data }
    }

    /// Resizes to the given block sizes and sets all entries to zero.
    pub fn reset(&mut self, sizes: &[usize]) {
        if self.layout.sizes != sizes {
            *self = Self::zeros(sizes);
        } else {
            self.data.fill(0.0);
        }
    }

    pub fn num_fields(&self) -> usize {
        self.layout.sizes.len()
    }

    pub fn block(&self, field: usize) -> DVectorView<f64> {
        self.data.rows(self.layout.offsets[field], self.layout.sizes[field])
    }

    pub fn block_mut(&mut self, field: usize) -> DVectorViewMut<f64> {
        self.data
            .rows_mut(self.layout.offsets[field], self.layout.sizes[field])
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data.as_slice()
    }
}

impl Index<(usize, usize)> for FieldBlockVector {
    type Output = f64;

    fn index(&self, (field, local): (usize, usize)) -> &f64 {
        &self.data[self.layout.flat(field, local)]
    }
}

impl IndexMut<(usize, usize)> for FieldBlockVector {
    fn index_mut(&mut self, (field, local): (usize, usize)) -> &mut f64 {
        let idx = self.layout.flat(field, local);
        &mut self.data[idx]
    }
}

/// Element matrix split into a grid of per-field blocks.
///
/// Indexed by `(field_row, field_col, local_row, local_col)`.
#[derive(Debug, Clone)]
pub struct FieldBlockMatrix {
    layout: BlockLayout,
    data: DMatrix<f64>,
}

impl Default for FieldBlockMatrix {
    fn default() -> Self {
        Self {
            layout: BlockLayout::default(),
            data: DMatrix::zeros(0, 0),
        }
    }
}

impl FieldBlockMatrix {
    pub fn zeros(sizes: &[usize]) -> Self {
        let layout = BlockLayout::new(sizes);
        let n = layout.total();
        Self {
            layout,
            data: DMatrix::zeros(n, n),
        }
    }

    /// Resizes to the given block sizes and sets all entries to zero.
    pub fn reset(&mut self, sizes: &[usize]) {
        if self.layout.sizes != sizes {
            *self = Self::zeros(sizes);
        } else {
            self.data.fill(0.0);
        }
    }

    pub fn block(&self, field_row: usize, field_col: usize) -> DMatrixView<f64> {
        let l = &self.layout;
        self.data.view(
            (l.offsets[field_row], l.offsets[field_col]),
            (l.sizes[field_row], l.sizes[field_col]),
        )
    }

    pub fn block_mut(&mut self, field_row: usize, field_col: usize) -> DMatrixViewMut<f64> {
        let l = &self.layout;
        self.data.view_mut(
            (l.offsets[field_row], l.offsets[field_col]),
            (l.sizes[field_row], l.sizes[field_col]),
        )
    }

    /// The full element matrix.
    pub fn as_matrix(&self) -> DMatrixView<f64> {
        self.data.as_view()
    }

    pub fn as_matrix_mut(&mut self) -> DMatrixViewMut<f64> {
        self.data.as_view_mut()
    }
}

impl Index<(usize, usize, usize, usize)> for FieldBlockMatrix {
    type Output = f64;

    fn index(&self, (fr, fc, i, j): (usize, usize, usize, usize)) -> &f64 {
        &self.data[(self.layout.flat(fr, i), self.layout.flat(fc, j))]
    }
}

impl IndexMut<(usize, usize, usize, usize)> for FieldBlockMatrix {
    fn index_mut(&mut self, (fr, fc, i, j): (usize, usize, usize, usize)) -> &mut f64 {
        let idx = (self.layout.flat(fr, i), self.layout.flat(fc, j));
        &mut self.data[idx]
    }
}
