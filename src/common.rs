mod assignment;
mod formula;
mod literal;

pub use assignment::*;
pub use formula::*;
pub use literal::*;

/// The result of a search from some partial assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every clause has a true literal under the contained assignment. Variables the search
    /// never had to decide stay unassigned.
    Satisfiable(Assignment),
    /// No extension of the starting assignment satisfies the formula.
    Unsatisfiable,
}

impl Outcome {
    pub fn is_sat(&self) -> bool {
        matches!(self, Outcome::Satisfiable(_))
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            Outcome::Satisfiable(assignment) => Some(assignment),
            Outcome::Unsatisfiable => None,
        }
    }
}

/// Reasons a formula or a starting assignment is rejected before any search happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidFormula {
    #[error("literal 0 is not allowed (clause {clause})")]
    ZeroLiteral { clause: usize },
    #[error("literal {literal} in clause {clause} exceeds the declared {num_vars} variables")]
    VariableOutOfRange {
        literal: i32,
        clause: usize,
        num_vars: usize,
    },
    #[error("{num_vars} variables declared but literals only reach {}", i32::MAX)]
    TooManyVariables { num_vars: usize },
    #[error("variable {variable} is assigned both true and false")]
    ConflictingAssignment { variable: usize },
}
