//! Reverse-mode automatic differentiation with an explicit recording tape.
//!
//! The crate is built around the needs of finite element residual assembly: for every element,
//! a fresh recording is started, the local degrees of freedom are registered as *independent*
//! variables, the residual is evaluated with the [`AReal`] number type, the residual entries are
//! registered as *dependent* variables and the dense local Jacobian is extracted by a sequence of
//! reverse sweeps over the recorded statements.
//!
//! ```
//! use fenris_autodiff::Tape;
//!
//! let mut tape = Tape::new();
//! let recording = tape.new_recording().unwrap();
//! let x = recording.variables(&[2.0, 3.0]);
//! let f = x[0] * x[1] + 2.0 * x[0];
//! recording.independent(&x).unwrap();
//! recording.dependent(&[f]);
//! let jacobian = recording.jacobian();
//! assert_eq!(jacobian[(0, 0)], 5.0);
//! assert_eq!(jacobian[(0, 1)], 2.0);
//! recording.clear_independents();
//! recording.clear_dependents();
//! ```
//!
//! A tape only ever has a single open recording (enforced by the borrow checker), and at most a
//! single recording may be open on any given thread (enforced at runtime). Registrations survive
//! the end of a recording, so that forgetting to clear them is detected when the next recording
//! is started.

use std::fmt;
use std::fmt::{Display, Formatter};

mod areal;
mod tape;

pub use areal::AReal;
pub use tape::{is_recording_active, Recording, Tape};

/// Errors produced by misuse of a [`Tape`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TapeError {
    /// A recording is already open on the current thread.
    RecordingAlreadyActive,
    /// The previous recording left independent or dependent registrations behind.
    PendingRegistrations { independents: usize, dependents: usize },
    /// A passive value (constant) was registered as an independent variable.
    PassiveIndependent { position: usize },
    /// The output buffer does not match the number of registered variables.
    UnbalancedRegistration {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

impl Display for TapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordingAlreadyActive => {
                write!(f, "a recording is already active on this thread")
            }
            Self::PendingRegistrations {
                independents,
                dependents,
            } => {
                write!(
                    f,
                    "cannot start a new recording: {} independent and {} dependent registrations are still pending",
                    independents, dependents
                )
            }
            Self::PassiveIndependent { position } => {
                write!(
                    f,
                    "value at position {} is passive and cannot be registered as independent",
                    position
                )
            }
            Self::UnbalancedRegistration { expected, actual } => {
                write!(
                    f,
                    "Jacobian output has shape {}x{}, but {} dependents and {} independents are registered",
                    actual.0, actual.1, expected.0, expected.1
                )
            }
        }
    }
}

impl std::error::Error for TapeError {}
