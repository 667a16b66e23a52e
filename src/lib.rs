//! A DPLL satisfiability solver that memoizes the outcome of every partial assignment it visits.

pub mod cache;
pub mod common;
pub mod parser;
pub mod solver;

pub use cache::{Cache, CacheCapacity, CacheStats};
pub use common::{Assignment, CacheKey, Formula, InvalidFormula, Literal, Outcome, Variable};
pub use solver::{solve, Config, SolveError, Solver, Stats};
