//! Error types for assembly and its collaborators.
use crate::field::Field;
use fenris_autodiff::TapeError;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Library-wide error type.
///
/// None of these errors are recoverable during assembly: they either indicate a configuration
/// error (unknown field, dimension mismatch, malformed dof mapping), degenerate input geometry or
/// a violated usage protocol (tape misuse, reading an unfinalized global object).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AssemblyError {
    /// A field name that is not part of the problem was requested.
    UnknownField { name: String },
    /// The declared spatial dimension does not match the actual dimension of some input.
    DimensionMismatch { expected: usize, actual: usize },
    /// A node or degree of freedom could not be translated to storage.
    MalformedDofMapping { field: Field, index: usize },
    /// A matrix contribution was added outside the sparsity pattern of the global system.
    EntryOutsidePattern { row: usize, col: usize },
    /// The element map has a non-positive Jacobian determinant at a quadrature point.
    DegenerateElement { point: usize, determinant: f64 },
    /// A global object was read before it was closed.
    NotFinalized,
    /// The requested partitioning cannot be realized for the given mesh.
    InvalidPartitioning {
        num_partitions: usize,
        num_elements: usize,
    },
    /// A numerical parameter is outside of its admissible range.
    InvalidParameter { name: &'static str, value: f64 },
    /// The automatic differentiation tape was misused.
    Tape(TapeError),
}

impl Display for AssemblyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { name } => write!(f, "Unknown field \"{}\"", name),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            Self::MalformedDofMapping { field, index } => {
                write!(f, "No valid degree of freedom for index {} of field {}", index, field)
            }
            Self::EntryOutsidePattern { row, col } => {
                write!(f, "Entry ({}, {}) is not part of the sparsity pattern", row, col)
            }
            Self::DegenerateElement { point, determinant } => {
                write!(
                    f,
                    "Degenerate element: Jacobian determinant {} at quadrature point {}",
                    determinant, point
                )
            }
            Self::NotFinalized => write!(f, "Global object must be closed before it can be read"),
            Self::InvalidPartitioning {
                num_partitions,
                num_elements,
            } => {
                write!(
                    f,
                    "Cannot split {} elements into {} partitions",
                    num_elements, num_partitions
                )
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "Invalid value {} for parameter {}", value, name)
            }
            Self::Tape(err) => write!(f, "Tape error: {}", err),
        }
    }
}

impl std::error::Error for AssemblyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tape(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TapeError> for AssemblyError {
    fn from(err: TapeError) -> Self {
        Self::Tape(err)
    }
}
