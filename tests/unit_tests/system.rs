use fenris_fluid::error::AssemblyError;
use fenris_fluid::system::{assemble_pattern, DistributedMatrix, DistributedVector, RowLayout};
use matrixcompare::assert_matrix_eq;
use nalgebra::{dvector, DMatrix};
use std::sync::Arc;

#[test]
fn row_layout_ownership() {
    let layout = RowLayout::from_offsets(vec![0, 3, 3, 7]);
    assert_eq!(layout.num_partitions(), 3);
    assert_eq!(layout.num_rows(), 7);
    assert_eq!(layout.owned_rows(1), 3..3);
    assert_eq!(layout.owner(0), Some(0));
    assert_eq!(layout.owner(2), Some(0));
    // The empty partition 1 owns nothing
    assert_eq!(layout.owner(3), Some(2));
    assert_eq!(layout.owner(7), None);
    assert_eq!(layout.locate(5), Some((2, 2)));
    assert_eq!(layout.locate(1), Some((0, 1)));

    let serial = RowLayout::serial(4);
    assert_eq!(serial.num_partitions(), 1);
    assert_eq!(serial.locate(3), Some((0, 3)));
}

#[test]
fn distributed_vector_combines_foreign_contributions_on_close() {
    let layout = Arc::new(RowLayout::from_offsets(vec![0, 2, 4]));
    let mut vector = DistributedVector::zeros(layout);
    assert!(vector.is_closed());
    vector.zero();
    assert!(!vector.is_closed());

    vector.add_vector_blocked(0, &[1.0, 2.0, 3.0], &[0, 1, 2]).unwrap();
    vector.add_vector_blocked(1, &[10.0, 20.0, 30.0], &[1, 2, 3]).unwrap();
    vector.add_vector_blocked(1, &[5.0], &[1]).unwrap();
    assert_eq!(vector.get(1), Err(AssemblyError::NotFinalized));
    assert_eq!(vector.to_dvector(), Err(AssemblyError::NotFinalized));

    vector.close();
    assert_eq!(vector.to_dvector().unwrap(), dvector![1.0, 17.0, 23.0, 30.0]);
    assert_eq!(vector.get(2), Ok(23.0));

    vector.set(0, -1.0).unwrap();
    assert_eq!(vector.get(0), Ok(-1.0));
    assert!(vector.get(4).is_err());

    // Zeroing discards all values and stashes
    vector.zero();
    vector.add_vector_blocked(0, &[1.0], &[3]).unwrap();
    vector.close();
    assert_eq!(vector.to_dvector().unwrap(), dvector![0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn distributed_vector_rejects_rows_outside_layout() {
    let mut vector = DistributedVector::zeros(Arc::new(RowLayout::serial(3)));
    vector.zero();
    assert_eq!(
        vector.add_vector_blocked(0, &[1.0], &[3]),
        Err(AssemblyError::EntryOutsidePattern { row: 3, col: 0 })
    );
}

#[test]
fn pattern_couples_all_rows_of_an_element() {
    let pattern = assemble_pattern(5, [vec![0, 1], vec![3, 1]]).unwrap();
    assert_eq!(pattern.major_dim(), 5);
    assert_eq!(pattern.nnz(), 7);
    assert_eq!(pattern.lane(0), &[0, 1]);
    assert_eq!(pattern.lane(1), &[0, 1, 3]);
    assert!(pattern.lane(2).is_empty());
    assert_eq!(pattern.lane(3), &[1, 3]);
    assert!(pattern.lane(4).is_empty());
}

fn two_element_matrix() -> DistributedMatrix {
    let pattern = assemble_pattern(4, [vec![0, 1, 2], vec![2, 3]]).unwrap();
    let layout = Arc::new(RowLayout::from_offsets(vec![0, 2, 4]));
    DistributedMatrix::new(layout, Arc::new(pattern))
}

#[test]
fn distributed_matrix_assembles_element_blocks() {
    let mut matrix = two_element_matrix();
    matrix.zero();

    let block_a = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    let block_b = DMatrix::from_row_slice(2, 2, &[10.0, 20.0, 30.0, 40.0]);
    // Partition 0 owns rows 0 and 1, row 2 is stashed
    matrix
        .add_matrix_blocked(0, block_a.as_view(), &[0, 1, 2], &[0, 1, 2])
        .unwrap();
    matrix
        .add_matrix_blocked(1, block_b.as_view(), &[2, 3], &[2, 3])
        .unwrap();
    assert!(matrix.to_csr().is_err());

    matrix.close().unwrap();
    let dense = DMatrix::from(&matrix.to_csr().unwrap());
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(4, 4, &[
        1.0, 2.0,  3.0,  0.0,
        4.0, 5.0,  6.0,  0.0,
        7.0, 8.0, 19.0, 20.0,
        0.0, 0.0, 30.0, 40.0,
    ]);
    assert_matrix_eq!(dense, expected);
}

#[test]
fn distributed_matrix_rejects_entries_outside_pattern() {
    let mut matrix = two_element_matrix();
    matrix.zero();
    let block = DMatrix::from_element(1, 1, 1.0);

    // Owned row: rejected immediately
    assert_eq!(
        matrix.add_matrix_blocked(0, block.as_view(), &[0], &[3]),
        Err(AssemblyError::EntryOutsidePattern { row: 0, col: 3 })
    );

    // Foreign row: rejected when the stash is folded
    matrix.zero();
    matrix.add_matrix_blocked(0, block.as_view(), &[3], &[0]).unwrap();
    assert_eq!(matrix.close(), Err(AssemblyError::EntryOutsidePattern { row: 3, col: 0 }));
}
