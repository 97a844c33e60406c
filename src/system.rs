//! Partitioned global vectors and sparse matrices with additive assembly.
//!
//! Global rows are split into contiguous blocks, one per partition. During assembly a
//! partition adds into its own rows directly and stashes contributions to rows owned by other
//! partitions. [`DistributedVector::close`] and [`DistributedMatrix::close`] fold the stashes
//! into their owners in partition order, which makes the result independent of the order in
//! which partitions are processed.
use crate::error::AssemblyError;
use eyre::eyre;
use log::debug;
use nalgebra::{DMatrixView, DVector};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Contiguous ownership of global rows by partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    offsets: Vec<usize>,
}

impl RowLayout {
    /// Creates a layout from partition offsets, which must start at zero and be non-decreasing.
    pub fn from_offsets(offsets: Vec<usize>) -> Self {
        assert!(offsets.len() >= 2, "Layout needs at least one partition");
        assert_eq!(offsets[0], 0, "Offsets must start at zero");
        assert!(
            offsets.windows(2).all(|w| w[0] <= w[1]),
            "Offsets must be non-decreasing"
        );
        Self { offsets }
    }

    /// A layout where a single partition owns all rows.
    pub fn serial(num_rows: usize) -> Self {
        Self::from_offsets(vec![0, num_rows])
    }

    pub fn num_partitions(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn num_rows(&self) -> usize {
        self.offsets[self.num_partitions()]
    }

    pub fn owned_rows(&self, partition: usize) -> Range<usize> {
        self.offsets[partition]..self.offsets[partition + 1]
    }

    /// The partition owning the given row, if the row exists.
    pub fn owner(&self, row: usize) -> Option<usize> {
        if row >= self.num_rows() {
            return None;
        }
        // Largest p with offsets[p] <= row. Empty partitions are skipped automatically.
        Some(self.offsets.partition_point(|&offset| offset <= row) - 1)
    }

    /// Two-stage translation of a global row to `(owner, owner-local slot)`.
    pub fn locate(&self, row: usize) -> Option<(usize, usize)> {
        self.owner(row).map(|p| (p, row - self.offsets[p]))
    }
}

#[derive(Debug, Clone, Default)]
struct VectorBlock {
    owned: Vec<f64>,
    stash: FxHashMap<usize, f64>,
}

/// A vector whose rows are distributed over partitions.
#[derive(Debug)]
pub struct DistributedVector {
    layout: Arc<RowLayout>,
    blocks: Vec<Mutex<VectorBlock>>,
    closed: AtomicBool,
}

impl DistributedVector {
    /// Creates a closed vector of zeros.
    pub fn zeros(layout: Arc<RowLayout>) -> Self {
        let blocks = (0..layout.num_partitions())
            .map(|p| {
                Mutex::new(VectorBlock {
                    owned: vec![0.0; layout.owned_rows(p).len()],
                    stash: FxHashMap::default(),
                })
            })
            .collect();
        Self {
            layout,
            blocks,
            closed: AtomicBool::new(true),
        }
    }

    pub fn layout(&self) -> &Arc<RowLayout> {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.layout.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sets all entries to zero and opens the vector for assembly.
    pub fn zero(&mut self) {
        for block in &mut self.blocks {
            let block = block.get_mut();
            block.owned.fill(0.0);
            block.stash.clear();
        }
        *self.closed.get_mut() = false;
    }

    /// Adds `values[i]` to row `rows[i]` on behalf of the given partition.
    ///
    /// Rows owned by the partition are updated directly, other rows are stashed until
    /// [`close`](Self::close).
    pub fn add_vector_blocked(
        &self,
        partition: usize,
        values: &[f64],
        rows: &[usize],
    ) -> Result<(), AssemblyError> {
        assert_eq!(values.len(), rows.len());
        self.closed.store(false, Ordering::Release);
        let owned_range = self.layout.owned_rows(partition);
        let mut block = self.blocks[partition].lock();
        for (&row, &value) in rows.iter().zip(values) {
            if owned_range.contains(&row) {
                block.owned[row - owned_range.start] += value;
            } else if row < self.len() {
                *block.stash.entry(row).or_insert(0.0) += value;
            } else {
                return Err(AssemblyError::EntryOutsidePattern { row, col: 0 });
            }
        }
        Ok(())
    }

    /// Combines stashed off-partition contributions with their owners.
    pub fn close(&mut self) {
        let num_partitions = self.blocks.len();
        for p in 0..num_partitions {
            let stash = std::mem::take(&mut self.blocks[p].get_mut().stash);
            // Sorting makes the folding order independent of hashing
            let mut entries: Vec<_> = stash.into_iter().collect();
            entries.sort_unstable_by_key(|&(row, _)| row);
            for (row, value) in entries {
                if let Some((owner, slot)) = self.layout.locate(row) {
                    self.blocks[owner].get_mut().owned[slot] += value;
                }
            }
        }
        *self.closed.get_mut() = true;
        debug!("Closed distributed vector with {} rows", self.len());
    }

    /// Reads a single entry of a closed vector.
    pub fn get(&self, row: usize) -> Result<f64, AssemblyError> {
        if !self.is_closed() {
            return Err(AssemblyError::NotFinalized);
        }
        let (owner, slot) = self.layout.locate(row).ok_or(AssemblyError::EntryOutsidePattern { row, col: 0 })?;
        Ok(self.blocks[owner].lock().owned[slot])
    }

    /// Overwrites a single entry of a closed vector.
    pub fn set(&mut self, row: usize, value: f64) -> Result<(), AssemblyError> {
        if !self.is_closed() {
            return Err(AssemblyError::NotFinalized);
        }
        let (owner, slot) = self.layout.locate(row).ok_or(AssemblyError::EntryOutsidePattern { row, col: 0 })?;
        self.blocks[owner].get_mut().owned[slot] = value;
        Ok(())
    }

    /// Gathers the closed vector into a single dense vector.
    pub fn to_dvector(&self) -> Result<DVector<f64>, AssemblyError> {
        if !self.is_closed() {
            return Err(AssemblyError::NotFinalized);
        }
        let mut result = Vec::with_capacity(self.len());
        for block in &self.blocks {
            result.extend_from_slice(&block.lock().owned);
        }
        Ok(DVector::from_vec(result))
    }
}

#[derive(Debug, Clone, Default)]
struct MatrixBlock {
    // Values of the owned rows, laid out as in the global pattern
    values: Vec<f64>,
    stash: Vec<(usize, usize, f64)>,
}

/// A sparse matrix with a fixed pattern whose rows are distributed over partitions.
#[derive(Debug)]
pub struct DistributedMatrix {
    layout: Arc<RowLayout>,
    pattern: Arc<SparsityPattern>,
    blocks: Vec<Mutex<MatrixBlock>>,
    closed: AtomicBool,
}

impl DistributedMatrix {
    /// Creates a closed matrix of explicit zeros in the given pattern.
    pub fn new(layout: Arc<RowLayout>, pattern: Arc<SparsityPattern>) -> Self {
        assert_eq!(pattern.major_dim(), layout.num_rows(), "Pattern must have one row per layout row");
        let offsets = pattern.major_offsets();
        let blocks = (0..layout.num_partitions())
            .map(|p| {
                let rows = layout.owned_rows(p);
                let nnz = offsets[rows.end] - offsets[rows.start];
                Mutex::new(MatrixBlock {
                    values: vec![0.0; nnz],
                    stash: Vec::new(),
                })
            })
            .collect();
        Self {
            layout,
            pattern,
            blocks,
            closed: AtomicBool::new(true),
        }
    }

    pub fn layout(&self) -> &Arc<RowLayout> {
        &self.layout
    }

    pub fn pattern(&self) -> &Arc<SparsityPattern> {
        &self.pattern
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sets all stored values to zero and opens the matrix for assembly.
    pub fn zero(&mut self) {
        for block in &mut self.blocks {
            let block = block.get_mut();
            block.values.fill(0.0);
            block.stash.clear();
        }
        *self.closed.get_mut() = false;
    }

    /// Adds the dense block `block[(i, j)]` to the entries `(rows[i], cols[j])`.
    ///
    /// Fails if an entry of an owned row is not in the pattern. Entries of foreign rows are
    /// stashed and checked on [`close`](Self::close).
    pub fn add_matrix_blocked(
        &self,
        partition: usize,
        block: DMatrixView<f64>,
        rows: &[usize],
        cols: &[usize],
    ) -> Result<(), AssemblyError> {
        assert_eq!(block.nrows(), rows.len());
        assert_eq!(block.ncols(), cols.len());
        self.closed.store(false, Ordering::Release);
        let owned_range = self.layout.owned_rows(partition);
        let block_offset = self.pattern.major_offsets()[owned_range.start];
        let mut storage = self.blocks[partition].lock();
        for (i, &row) in rows.iter().enumerate() {
            if owned_range.contains(&row) {
                for (j, &col) in cols.iter().enumerate() {
                    let idx = self.entry_index(row, col)? - block_offset;
                    storage.values[idx] += block[(i, j)];
                }
            } else {
                for (j, &col) in cols.iter().enumerate() {
                    storage.stash.push((row, col, block[(i, j)]));
                }
            }
        }
        Ok(())
    }

    /// Index of the entry `(row, col)` in the global value array of the pattern.
    fn entry_index(&self, row: usize, col: usize) -> Result<usize, AssemblyError> {
        if row >= self.pattern.major_dim() {
            return Err(AssemblyError::EntryOutsidePattern { row, col });
        }
        let offset = self.pattern.major_offsets()[row];
        self.pattern
            .lane(row)
            .binary_search(&col)
            .map(|local| offset + local)
            .map_err(|_| AssemblyError::EntryOutsidePattern { row, col })
    }

    /// Combines stashed off-partition contributions with their owners.
    pub fn close(&mut self) -> Result<(), AssemblyError> {
        let offsets = self.pattern.major_offsets().to_vec();
        for p in 0..self.blocks.len() {
            let stash = std::mem::take(&mut self.blocks[p].get_mut().stash);
            for (row, col, value) in stash {
                let global_idx = self.entry_index(row, col)?;
                let owner = self
                    .layout
                    .owner(row)
                    .ok_or(AssemblyError::EntryOutsidePattern { row, col })?;
                let block_offset = offsets[self.layout.owned_rows(owner).start];
                self.blocks[owner].get_mut().values[global_idx - block_offset] += value;
            }
        }
        *self.closed.get_mut() = true;
        debug!(
            "Closed distributed matrix with {} rows and {} stored entries",
            self.layout.num_rows(),
            self.pattern.nnz()
        );
        Ok(())
    }

    /// Gathers the closed matrix into a single CSR matrix.
    pub fn to_csr(&self) -> eyre::Result<CsrMatrix<f64>> {
        if !self.is_closed() {
            return Err(AssemblyError::NotFinalized.into());
        }
        let mut values = Vec::with_capacity(self.pattern.nnz());
        for block in &self.blocks {
            values.extend_from_slice(&block.lock().values);
        }
        CsrMatrix::try_from_pattern_and_values(SparsityPattern::clone(&self.pattern), values)
            .map_err(|err| eyre!("Failed to construct CSR matrix: {}", err))
    }
}

/// Computes the sparsity pattern of a square system from the global rows of each element.
///
/// Every element couples all of its rows with each other.
pub fn assemble_pattern<I, R>(num_rows: usize, element_rows: I) -> eyre::Result<SparsityPattern>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[usize]>,
{
    // Collecting into a BTreeSet stores each entry exactly once, shared entries of
    // neighboring elements are common
    let mut matrix_entries = BTreeSet::new();
    for rows in element_rows {
        let rows = rows.as_ref();
        for &i in rows {
            for &j in rows {
                matrix_entries.insert((i, j));
            }
        }
    }

    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(matrix_entries.len());
    offsets.push(0);
    for (i, j) in matrix_entries {
        // Consecutive empty rows need a while loop
        while i + 1 > offsets.len() {
            offsets.push(column_indices.len());
        }
        column_indices.push(j);
    }
    while offsets.len() < num_rows + 1 {
        offsets.push(column_indices.len());
    }

    SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, offsets, column_indices)
        .map_err(|err| eyre!("Invalid sparsity pattern: {}", err))
}
