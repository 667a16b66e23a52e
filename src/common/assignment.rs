use std::fmt::Display;

use itertools::Itertools;

use super::{
    formula::{check_variable_count, checked_literal},
    InvalidFormula, Literal, Variable,
};

const WORD_BITS: usize = u64::BITS as usize;

/// Canonical encoding of a partial assignment, independent of the order in which the bindings
/// were made. Every variable is encoded with two bits: whether it is assigned and, if so, its
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    assigned: Box<[u64]>,
    truth: Box<[u64]>,
}

/// A partial mapping from variables to truth values.
///
/// Search branches never share an assignment: extending one produces a new copy through
/// [`Assignment::extended`] and leaves the original untouched.
#[derive(Debug, Clone)]
pub struct Assignment {
    num_vars: usize,
    assigned: Vec<u64>,
    truth: Vec<u64>,
    trace: Vec<Literal>,
}

fn slot(var: Variable) -> (usize, u64) {
    let index = var.index();
    (index / WORD_BITS, 1 << (index % WORD_BITS))
}

impl Assignment {
    /// Create an empty assignment able to hold the variables `1..=num_vars`.
    pub fn new(num_vars: usize) -> Self {
        let words = num_vars / WORD_BITS + 1;
        Assignment {
            num_vars,
            assigned: vec![0; words],
            truth: vec![0; words],
            trace: vec![],
        }
    }

    /// Build an assignment from raw literals, each one being made true.
    pub fn from_literals(
        num_vars: usize,
        literals: impl IntoIterator<Item = i32>,
    ) -> Result<Self, InvalidFormula> {
        check_variable_count(num_vars)?;
        let mut assignment = Assignment::new(num_vars);
        for raw in literals {
            let lit = checked_literal(raw, 0, Some(num_vars))?;
            if assignment.is_false(lit) {
                return Err(InvalidFormula::ConflictingAssignment {
                    variable: lit.variable().index(),
                });
            }
            if !assignment.is_true(lit) {
                assignment.assign(lit);
            }
        }
        Ok(assignment)
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn value(&self, var: Variable) -> Option<bool> {
        let (word, bit) = slot(var);
        match self.assigned.get(word) {
            Some(mask) if mask & bit != 0 => Some(self.truth[word] & bit != 0),
            _ => None,
        }
    }

    pub fn is_assigned(&self, var: Variable) -> bool {
        self.value(var).is_some()
    }

    pub fn is_true(&self, literal: Literal) -> bool {
        self.value(literal.variable()) == Some(literal.is_positive())
    }

    pub fn is_false(&self, literal: Literal) -> bool {
        self.value(literal.variable()) == Some(!literal.is_positive())
    }

    /// Return a copy of this assignment in which `literal` is additionally true.
    /// The variable of `literal` must be within `1..=num_vars` and not assigned yet.
    pub fn extended(&self, literal: Literal) -> Assignment {
        debug_assert!(literal.variable().index() <= self.num_vars);
        debug_assert!(!self.is_assigned(literal.variable()));
        let mut next = self.clone();
        next.assign(literal);
        next
    }

    fn assign(&mut self, literal: Literal) {
        let (word, bit) = slot(literal.variable());
        self.assigned[word] |= bit;
        if literal.is_positive() {
            self.truth[word] |= bit;
        }
        self.trace.push(literal);
    }

    pub fn len(&self) -> usize {
        self.trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }

    /// The true literals in the order they were assigned.
    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.trace.iter().copied()
    }

    /// All bindings sorted by variable.
    pub fn iter(&self) -> impl Iterator<Item = (Variable, bool)> + '_ {
        self.trace
            .iter()
            .map(|lit| (lit.variable(), lit.is_positive()))
            .sorted_by_key(|&(var, _)| var)
    }

    pub fn key(&self) -> CacheKey {
        CacheKey {
            assigned: self.assigned.clone().into_boxed_slice(),
            truth: self.truth.clone().into_boxed_slice(),
        }
    }
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        self.assigned == other.assigned && self.truth == other.truth
    }
}

impl Eq for Assignment {}

impl Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.iter().map(|(var, value)| var.literal(value)).join(" ")
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lit(raw: i32) -> Literal {
        Literal::try_from(raw).unwrap()
    }

    #[test]
    fn extending_forks() {
        let root = Assignment::new(4);
        let left = root.extended(lit(2));
        let right = root.extended(lit(-2));

        assert!(root.is_empty());
        assert_eq!(left.value(lit(2).variable()), Some(true));
        assert_eq!(right.value(lit(2).variable()), Some(false));
        assert!(left.is_true(lit(2)) && left.is_false(lit(-2)));
        assert!(!root.is_true(lit(2)) && !root.is_false(lit(2)));
    }

    #[test]
    fn key_ignores_assignment_order() {
        let a = Assignment::new(70).extended(lit(1)).extended(lit(-65));
        let b = Assignment::new(70).extended(lit(-65)).extended(lit(1));
        assert_eq!(a.key(), b.key());
        assert_eq!(a, b);
        assert_ne!(a.key(), Assignment::new(70).extended(lit(1)).key());
        assert_ne!(a.key(), Assignment::new(70).extended(lit(1)).extended(lit(65)).key());
    }

    #[test]
    fn from_literals_validates() {
        assert_eq!(
            Assignment::from_literals(3, [1, 4]),
            Err(InvalidFormula::VariableOutOfRange {
                literal: 4,
                clause: 0,
                num_vars: 3
            })
        );
        assert_eq!(
            Assignment::from_literals(usize::MAX, [1]),
            Err(InvalidFormula::TooManyVariables {
                num_vars: usize::MAX
            })
        );
        assert_eq!(
            Assignment::from_literals(3, [2, -2]),
            Err(InvalidFormula::ConflictingAssignment { variable: 2 })
        );
        let assignment = Assignment::from_literals(3, [-3, 1, 1]).unwrap();
        assert_eq!(assignment.len(), 2);
        assert_eq!(assignment.to_string(), "1 -3");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn extending_beyond_declared_variables() {
        let _ = Assignment::new(2).extended(lit(3));
    }

    #[test]
    fn unknown_variables_are_unassigned() {
        let assignment = Assignment::new(2);
        assert_eq!(assignment.value(lit(500).variable()), None);
    }
}
