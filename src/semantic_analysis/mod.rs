mod typecheck;
#[cfg(test)]
mod typecheck_tests;

use crate::lexer::LinedToken;
use crate::symbols::Identifier;
use std::fmt;

pub use typecheck::validate;

pub type Result<T> = std::result::Result<T, SemAnalysisError>;

#[derive(Clone, Debug, PartialEq)]
pub enum InnerSemError {
    AssignLhsNotScalar,
    AssignRhsNotScalar,
    AssignTypeMismatch,
    AssignToConstant(Identifier),
    OperandNotIntegral,
    OperandNotBoolean,
    OperandNotScalar,
    OperandsMismatch,
    ConditionNotBoolean,
    SuperfluousReturnValue,
    ReturnValueExpected,
    ReturnTypeMismatch,
    ArgumentCountMismatch(usize, usize, Identifier),
    ArgumentTypeMismatch(usize, Identifier),
    IndexNotIntegral,
    NotAnArray(Identifier),
    TooManyIndices(Identifier),
    InvalidDesignator(Identifier),
    InvalidConstant,
    DerefNonPointer,
}

/// First semantic error, anchored on the offending token.
#[derive(Clone, Debug, PartialEq)]
pub struct SemAnalysisError {
    pub inner: InnerSemError,
    token: LinedToken,
}

impl SemAnalysisError {
    pub fn get_token(&self) -> &LinedToken {
        &self.token
    }
}

impl InnerSemError {
    pub(super) fn at(self, token: &LinedToken) -> SemAnalysisError {
        SemAnalysisError {
            inner: self,
            token: token.clone(),
        }
    }
}

impl fmt::Display for SemAnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.token.get_ln(),
            self.token.get_col(),
            self.inner
        )
    }
}

impl fmt::Display for InnerSemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AssignLhsNotScalar => write!(f, "assignment target is not scalar"),
            Self::AssignRhsNotScalar => write!(f, "assigned value is not scalar"),
            Self::AssignTypeMismatch => write!(f, "assignment types do not match"),
            Self::AssignToConstant(name) => write!(f, "assignment to constant {name}"),
            Self::OperandNotIntegral => write!(f, "operand must be integer or longint"),
            Self::OperandNotBoolean => write!(f, "operand must be boolean"),
            Self::OperandNotScalar => write!(f, "operand must be scalar"),
            Self::OperandsMismatch => write!(f, "operand types do not match"),
            Self::ConditionNotBoolean => write!(f, "condition must be boolean"),
            Self::SuperfluousReturnValue => write!(f, "superfluous expression after return"),
            Self::ReturnValueExpected => write!(f, "expression expected after return"),
            Self::ReturnTypeMismatch => write!(f, "return type mismatch"),
            Self::ArgumentCountMismatch(expected, got, name) => write!(
                f,
                "subroutine {name} called with {got} arguments, but expected {expected}"
            ),
            Self::ArgumentTypeMismatch(index, name) => {
                write!(f, "argument {index} of {name} does not match the parameter")
            }
            Self::IndexNotIntegral => write!(f, "array index must be integer or longint"),
            Self::NotAnArray(name) => write!(f, "{name} is not an array"),
            Self::TooManyIndices(name) => write!(f, "too many indices for array {name}"),
            Self::InvalidDesignator(name) => write!(f, "{name} has no usable type"),
            Self::InvalidConstant => write!(f, "constant has no usable type"),
            Self::DerefNonPointer => write!(f, "dereference of a non-pointer"),
        }
    }
}

impl std::error::Error for SemAnalysisError {}
