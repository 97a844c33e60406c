use crate::tape::{Operand, Stack};
use std::cell::RefCell;
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// A real number whose arithmetic is recorded on the tape of a [`Recording`](crate::Recording).
///
/// Values are either *active* (they carry an index into the recording and take part in
/// differentiation) or *passive* (constants). Operations that only involve passive values are
/// not recorded.
#[derive(Clone, Copy)]
pub struct AReal<'r> {
    value: f64,
    index: Option<usize>,
    stack: &'r RefCell<Stack>,
}

impl<'r> fmt::Debug for AReal<'r> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AReal")
            .field("value", &self.value)
            .field("index", &self.index)
            .finish()
    }
}

impl<'r> AReal<'r> {
    pub(crate) fn active(value: f64, index: usize, stack: &'r RefCell<Stack>) -> Self {
        Self {
            value,
            index: Some(index),
            stack,
        }
    }

    pub(crate) fn passive(value: f64, stack: &'r RefCell<Stack>) -> Self {
        Self {
            value,
            index: None,
            stack,
        }
    }

    /// The primal value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Index of the variable in the recording, or `None` for passive values.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn is_active(&self) -> bool {
        self.index.is_some()
    }

    fn unary(self, value: f64, partial: f64) -> Self {
        match self.index {
            None => Self::passive(value, self.stack),
            Some(index) => {
                let lhs = self
                    .stack
                    .borrow_mut()
                    .push_statement(&[Operand { index, partial }]);
                Self::active(value, lhs, self.stack)
            }
        }
    }

    fn binary(self, rhs: Self, value: f64, partial_lhs: f64, partial_rhs: f64) -> Self {
        debug_assert!(
            std::ptr::eq(self.stack, rhs.stack),
            "Operands must belong to the same recording"
        );
        let operands = match (self.index, rhs.index) {
            (None, None) => return Self::passive(value, self.stack),
            (Some(a), None) => vec![Operand { index: a, partial: partial_lhs }],
            (None, Some(b)) => vec![Operand { index: b, partial: partial_rhs }],
            (Some(a), Some(b)) => vec![
                Operand { index: a, partial: partial_lhs },
                Operand { index: b, partial: partial_rhs },
            ],
        };
        let lhs = self.stack.borrow_mut().push_statement(&operands);
        Self::active(value, lhs, self.stack)
    }
}

impl<'r> Neg for AReal<'r> {
    type Output = Self;

    fn neg(self) -> Self {
        self.unary(-self.value, -1.0)
    }
}

impl<'r> Add for AReal<'r> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.binary(rhs, self.value + rhs.value, 1.0, 1.0)
    }
}

impl<'r> Sub for AReal<'r> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.binary(rhs, self.value - rhs.value, 1.0, -1.0)
    }
}

impl<'r> Mul for AReal<'r> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.binary(rhs, self.value * rhs.value, rhs.value, self.value)
    }
}

impl<'r> Div for AReal<'r> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        let inv = 1.0 / rhs.value;
        self.binary(rhs, self.value * inv, inv, -self.value * inv * inv)
    }
}

impl<'r> Add<f64> for AReal<'r> {
    type Output = Self;

    fn add(self, rhs: f64) -> Self {
        self.unary(self.value + rhs, 1.0)
    }
}

impl<'r> Sub<f64> for AReal<'r> {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self {
        self.unary(self.value - rhs, 1.0)
    }
}

impl<'r> Mul<f64> for AReal<'r> {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.unary(self.value * rhs, rhs)
    }
}

impl<'r> Div<f64> for AReal<'r> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self.unary(self.value / rhs, 1.0 / rhs)
    }
}

impl<'r> Add<AReal<'r>> for f64 {
    type Output = AReal<'r>;

    fn add(self, rhs: AReal<'r>) -> AReal<'r> {
        rhs + self
    }
}

impl<'r> Sub<AReal<'r>> for f64 {
    type Output = AReal<'r>;

    fn sub(self, rhs: AReal<'r>) -> AReal<'r> {
        rhs.unary(self - rhs.value, -1.0)
    }
}

impl<'r> Mul<AReal<'r>> for f64 {
    type Output = AReal<'r>;

    fn mul(self, rhs: AReal<'r>) -> AReal<'r> {
        rhs * self
    }
}

impl<'r> Div<AReal<'r>> for f64 {
    type Output = AReal<'r>;

    fn div(self, rhs: AReal<'r>) -> AReal<'r> {
        let inv = 1.0 / rhs.value;
        rhs.unary(self * inv, -self * inv * inv)
    }
}

macro_rules! impl_assign_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<'r> $trait for AReal<'r> {
            fn $method(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }

        impl<'r> $trait<f64> for AReal<'r> {
            fn $method(&mut self, rhs: f64) {
                *self = *self $op rhs;
            }
        }
    };
}

impl_assign_op!(AddAssign, add_assign, +);
impl_assign_op!(SubAssign, sub_assign, -);
impl_assign_op!(MulAssign, mul_assign, *);
impl_assign_op!(DivAssign, div_assign, /);
