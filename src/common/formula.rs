use std::{fmt::Display, ops::Range};

use itertools::Itertools;

use super::{Assignment, InvalidFormula, Literal};

/// A formula in conjunctive normal form.
///
/// All literals live in one buffer and every clause is a range into it. The formula is never
/// modified once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formula {
    num_vars: usize,
    literals: Vec<Literal>,
    ranges: Vec<Range<usize>>,
}

/// A single clause borrowed from a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clause<'a> {
    literals: &'a [Literal],
}

/// The state of a clause under a partial assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// At least one literal is true.
    True,
    /// Every literal is false. The empty clause is always false.
    False,
    /// Exactly one literal is unassigned and all others are false.
    Unit(Literal),
    Unknown,
}

/// Convert a raw integer into a literal, checking it against the declared number of variables.
pub(crate) fn checked_literal(
    raw: i32,
    clause: usize,
    num_vars: Option<usize>,
) -> Result<Literal, InvalidFormula> {
    let out_of_range = |num_vars| InvalidFormula::VariableOutOfRange {
        literal: raw,
        clause,
        num_vars,
    };
    let literal = Literal::try_from(raw).map_err(|_| {
        if raw == 0 {
            InvalidFormula::ZeroLiteral { clause }
        } else {
            out_of_range(num_vars.unwrap_or(i32::MAX as usize))
        }
    })?;
    match num_vars {
        Some(n) if literal.variable().index() > n => Err(out_of_range(n)),
        _ => Ok(literal),
    }
}

/// Literals are `i32`, so no variable beyond `i32::MAX` can ever occur.
pub(crate) fn check_variable_count(num_vars: usize) -> Result<(), InvalidFormula> {
    if num_vars > i32::MAX as usize {
        Err(InvalidFormula::TooManyVariables { num_vars })
    } else {
        Ok(())
    }
}

impl Formula {
    /// Build a formula from raw clauses. The number of variables is the largest variable that
    /// occurs in any clause.
    pub fn new<C, L>(clauses: C) -> Result<Self, InvalidFormula>
    where
        C: IntoIterator<Item = L>,
        L: IntoIterator<Item = i32>,
    {
        Formula::build(None, clauses)
    }

    /// Build a formula whose literals must all stay within `1..=num_vars`.
    pub fn with_variables<C, L>(num_vars: usize, clauses: C) -> Result<Self, InvalidFormula>
    where
        C: IntoIterator<Item = L>,
        L: IntoIterator<Item = i32>,
    {
        Formula::build(Some(num_vars), clauses)
    }

    fn build<C, L>(declared: Option<usize>, clauses: C) -> Result<Self, InvalidFormula>
    where
        C: IntoIterator<Item = L>,
        L: IntoIterator<Item = i32>,
    {
        if let Some(num_vars) = declared {
            check_variable_count(num_vars)?;
        }
        let mut formula = Formula::default();
        for (index, clause) in clauses.into_iter().enumerate() {
            let literals: Vec<Literal> = clause
                .into_iter()
                .map(|raw| checked_literal(raw, index, declared))
                .collect::<Result<_, _>>()?;
            let start = formula.literals.len();
            // duplicates would hide a unit clause from propagation
            formula.literals.extend(literals.into_iter().unique());
            formula.ranges.push(start..formula.literals.len());
        }
        formula.num_vars = declared.unwrap_or_else(|| {
            formula
                .literals
                .iter()
                .map(|lit| lit.variable().index())
                .max()
                .unwrap_or(0)
        });
        Ok(formula)
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn num_clauses(&self) -> usize {
        self.ranges.len()
    }

    pub fn clauses(&self) -> impl Iterator<Item = Clause<'_>> + '_ {
        self.ranges.iter().map(|range| Clause {
            literals: &self.literals[range.clone()],
        })
    }

    /// All literals of all clauses, in clause order.
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn has_empty_clause(&self) -> bool {
        self.ranges.iter().any(|range| range.is_empty())
    }

    /// Check whether every clause contains a literal that is true under the assignment.
    /// Unassigned variables never satisfy a clause.
    pub fn is_satisfied_by(&self, assignment: &Assignment) -> bool {
        self.clauses()
            .all(|clause| clause.eval(assignment) == Evaluation::True)
    }
}

impl<'a> Clause<'a> {
    pub fn literals(&self) -> &'a [Literal] {
        self.literals
    }

    /// Given an assignment, give an evaluation of the clause. If a unit is encountered, return
    /// the unassigned literal.
    pub fn eval(&self, assignment: &Assignment) -> Evaluation {
        let mut unassigned = None;
        let mut open = 0;
        for &lit in self.literals {
            match assignment.value(lit.variable()) {
                Some(value) if value == lit.is_positive() => return Evaluation::True,
                Some(_) => (),
                None => {
                    open += 1;
                    unassigned = Some(lit);
                }
            }
        }

        match (open, unassigned) {
            (0, _) => Evaluation::False,
            (1, Some(lit)) => Evaluation::Unit(lit),
            _ => Evaluation::Unknown,
        }
    }
}

impl Display for Clause<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.literals.iter().join(" | "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lit(raw: i32) -> Literal {
        Literal::try_from(raw).unwrap()
    }

    #[test]
    fn builds_flat_storage() {
        let formula = Formula::new(vec![vec![1, -3, 4], vec![-1, 2], vec![]]).unwrap();
        assert_eq!(formula.num_vars(), 4);
        assert_eq!(formula.num_clauses(), 3);
        assert!(formula.has_empty_clause());
        assert_eq!(formula.literals().len(), 5);
        let clauses = formula.clauses().map(|c| c.to_string()).collect_vec();
        assert_eq!(clauses, vec!["(1 | -3 | 4)", "(-1 | 2)", "()"]);
    }

    #[test]
    fn duplicate_literals_are_collapsed() {
        let formula = Formula::new([[2, 1, 2, 1]]).unwrap();
        assert_eq!(formula.literals(), &[lit(2), lit(1)]);
    }

    #[test]
    fn rejects_invalid_literals() {
        assert_eq!(
            Formula::new(vec![vec![1], vec![2, 0]]),
            Err(InvalidFormula::ZeroLiteral { clause: 1 })
        );
        assert_eq!(
            Formula::with_variables(2, vec![vec![1, -3]]),
            Err(InvalidFormula::VariableOutOfRange {
                literal: -3,
                clause: 0,
                num_vars: 2
            })
        );
        assert_eq!(Formula::with_variables(5, [[1]]).unwrap().num_vars(), 5);
    }

    #[test]
    fn rejects_variable_counts_beyond_literals() {
        assert_eq!(
            Formula::with_variables(usize::MAX, [[1]]),
            Err(InvalidFormula::TooManyVariables {
                num_vars: usize::MAX
            })
        );
        let limit = i32::MAX as usize;
        assert_eq!(
            Formula::with_variables(limit + 1, [[1]]),
            Err(InvalidFormula::TooManyVariables { num_vars: limit + 1 })
        );
        assert_eq!(Formula::with_variables(limit, [[1]]).unwrap().num_vars(), limit);
    }

    #[test]
    fn clause_evaluation() {
        let formula = Formula::new([[1, -2, 3]]).unwrap();
        let clause = formula.clauses().next().unwrap();
        let empty = Assignment::new(3);

        assert_eq!(clause.eval(&empty), Evaluation::Unknown);
        let a = empty.extended(lit(-1)).extended(lit(2));
        assert_eq!(clause.eval(&a), Evaluation::Unit(lit(3)));
        assert_eq!(clause.eval(&a.extended(lit(-3))), Evaluation::False);
        assert_eq!(clause.eval(&a.extended(lit(3))), Evaluation::True);
        assert_eq!(clause.eval(&empty.extended(lit(-2))), Evaluation::True);
    }

    #[test]
    fn unassigned_does_not_satisfy() {
        let formula = Formula::new([[-1]]).unwrap();
        assert!(!formula.is_satisfied_by(&Assignment::new(1)));
        assert!(formula.is_satisfied_by(&Assignment::from_literals(1, [-1]).unwrap()));
    }
}
