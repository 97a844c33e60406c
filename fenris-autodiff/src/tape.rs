use crate::{AReal, TapeError};
use log::trace;
use nalgebra::{DMatrix, DMatrixViewMut};
use std::cell::{Cell, RefCell};

/// A single recorded operand: the index of an active variable and the partial derivative of the
/// statement's left-hand side with respect to it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Operand {
    pub index: usize,
    pub partial: f64,
}

/// A recorded assignment `lhs = f(operands)` in single-assignment form.
#[derive(Debug, Clone, Copy)]
struct Statement {
    lhs: usize,
    operands_begin: usize,
    operands_end: usize,
}

/// Linearized record of all operations on active values in the current recording.
#[derive(Debug, Default)]
pub(crate) struct Stack {
    num_variables: usize,
    statements: Vec<Statement>,
    operands: Vec<Operand>,
}

impl Stack {
    fn clear(&mut self) {
        self.num_variables = 0;
        self.statements.clear();
        self.operands.clear();
    }

    pub(crate) fn new_variable(&mut self) -> usize {
        let index = self.num_variables;
        self.num_variables += 1;
        index
    }

    /// Records a statement and returns the index of its (new) left-hand side variable.
    pub(crate) fn push_statement(&mut self, operands: &[Operand]) -> usize {
        let lhs = self.new_variable();
        let operands_begin = self.operands.len();
        self.operands.extend_from_slice(operands);
        self.statements.push(Statement {
            lhs,
            operands_begin,
            operands_end: self.operands.len(),
        });
        lhs
    }

    /// Propagates adjoints from left-hand sides to operands, last statement first.
    ///
    /// Every statement introduces a fresh variable that is only referenced by later
    /// statements, so a single backward pass is exact.
    fn reverse_sweep(&self, adjoints: &mut [f64]) {
        for statement in self.statements.iter().rev() {
            let adjoint = adjoints[statement.lhs];
            if adjoint == 0.0 {
                continue;
            }
            for operand in &self.operands[statement.operands_begin..statement.operands_end] {
                adjoints[operand.index] += adjoint * operand.partial;
            }
        }
    }
}

thread_local! {
    static RECORDING_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Clears the thread-local recording flag when the recording ends, including on panic.
#[derive(Debug)]
struct RecordingGuard;

impl Drop for RecordingGuard {
    fn drop(&mut self) {
        RECORDING_ACTIVE.with(|flag| flag.set(false));
    }
}

/// Returns `true` while a [`Recording`] is open on the current thread.
pub fn is_recording_active() -> bool {
    RECORDING_ACTIVE.with(|flag| flag.get())
}

/// Storage for recorded operations and variable registrations.
///
/// The tape itself is long-lived and reused for many recordings so that its buffers are only
/// allocated once. Independent and dependent registrations belong to the tape rather than
/// to the recording: they must be cleared explicitly before the next recording can start.
#[derive(Debug, Default)]
pub struct Tape {
    stack: RefCell<Stack>,
    independents: RefCell<Vec<usize>>,
    // Passive dependents are stored as `None` and produce zero rows in the Jacobian
    dependents: RefCell<Vec<Option<usize>>>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether independent or dependent variables from a previous recording are still registered.
    pub fn has_pending_registrations(&self) -> bool {
        !self.independents.borrow().is_empty() || !self.dependents.borrow().is_empty()
    }

    /// Starts a new recording, discarding any previously recorded statements.
    ///
    /// # Errors
    ///
    /// Fails if another recording is open on the current thread, or if the registrations of
    /// the previous recording have not been cleared.
    pub fn new_recording(&mut self) -> Result<Recording<'_>, TapeError> {
        if is_recording_active() {
            return Err(TapeError::RecordingAlreadyActive);
        }
        if self.has_pending_registrations() {
            return Err(TapeError::PendingRegistrations {
                independents: self.independents.borrow().len(),
                dependents: self.dependents.borrow().len(),
            });
        }

        self.stack.get_mut().clear();
        RECORDING_ACTIVE.with(|flag| flag.set(true));
        Ok(Recording {
            tape: self,
            _guard: RecordingGuard,
        })
    }
}

/// An open recording session on a [`Tape`].
///
/// All [`AReal`] values created through the session borrow it, so they cannot outlive it.
#[derive(Debug)]
pub struct Recording<'t> {
    tape: &'t Tape,
    _guard: RecordingGuard,
}

impl<'t> Recording<'t> {
    /// Creates a new active variable with the given value.
    pub fn variable(&self, value: f64) -> AReal<'t> {
        let index = self.tape.stack.borrow_mut().new_variable();
        AReal::active(value, index, &self.tape.stack)
    }

    /// Creates one active variable for each value.
    pub fn variables(&self, values: &[f64]) -> Vec<AReal<'t>> {
        values.iter().map(|&v| self.variable(v)).collect()
    }

    /// Creates a passive value, i.e. a value that is not differentiated with respect to.
    pub fn constant(&self, value: f64) -> AReal<'t> {
        AReal::passive(value, &self.tape.stack)
    }

    pub fn zero(&self) -> AReal<'t> {
        self.constant(0.0)
    }

    /// Registers the given variables as independent, in order, after any already registered.
    pub fn independent(&self, variables: &[AReal<'t>]) -> Result<(), TapeError> {
        let mut independents = self.tape.independents.borrow_mut();
        for (position, variable) in variables.iter().enumerate() {
            let index = variable
                .index()
                .ok_or(TapeError::PassiveIndependent { position })?;
            independents.push(index);
        }
        Ok(())
    }

    /// Registers the given values as dependent, in order, after any already registered.
    pub fn dependent(&self, values: &[AReal<'t>]) {
        self.tape
            .dependents
            .borrow_mut()
            .extend(values.iter().map(AReal::index));
    }

    pub fn num_independents(&self) -> usize {
        self.tape.independents.borrow().len()
    }

    pub fn num_dependents(&self) -> usize {
        self.tape.dependents.borrow().len()
    }

    pub fn num_statements(&self) -> usize {
        self.tape.stack.borrow().statements.len()
    }

    /// Computes the Jacobian of the dependents with respect to the independents.
    ///
    /// Row `i` holds the derivatives of dependent `i`, column `j` the derivatives with respect
    /// to independent `j`.
    pub fn jacobian(&self) -> DMatrix<f64> {
        let mut jacobian = DMatrix::zeros(self.num_dependents(), self.num_independents());
        self.jacobian_into(DMatrixViewMut::from(&mut jacobian))
            .expect("Output is sized from the registrations");
        jacobian
    }

    /// Computes the Jacobian into the provided output, which must have exactly one row per
    /// dependent and one column per independent.
    pub fn jacobian_into(&self, mut output: DMatrixViewMut<f64>) -> Result<(), TapeError> {
        let independents = self.tape.independents.borrow();
        let dependents = self.tape.dependents.borrow();
        let expected = (dependents.len(), independents.len());
        let actual = (output.nrows(), output.ncols());
        if expected != actual {
            return Err(TapeError::UnbalancedRegistration { expected, actual });
        }

        let stack = self.tape.stack.borrow();
        trace!(
            "Extracting {}x{} Jacobian from {} statements",
            expected.0,
            expected.1,
            stack.statements.len()
        );

        output.fill(0.0);
        let mut adjoints = vec![0.0; stack.num_variables];
        for (row, dependent) in dependents.iter().enumerate() {
            let Some(dependent) = *dependent else {
                continue;
            };
            adjoints.fill(0.0);
            adjoints[dependent] = 1.0;
            stack.reverse_sweep(&mut adjoints);
            for (col, &independent) in independents.iter().enumerate() {
                output[(row, col)] = adjoints[independent];
            }
        }

        Ok(())
    }

    pub fn clear_independents(&self) {
        self.tape.independents.borrow_mut().clear();
    }

    pub fn clear_dependents(&self) {
        self.tape.dependents.borrow_mut().clear();
    }
}
