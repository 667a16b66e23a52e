use std::{fmt::Display, num::NonZeroI32, ops::Neg};

/// A literal represented by a signed integer
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Literal {
    // We choose a nonzeroi32 to optimize nullable data structures
    inner: NonZeroI32,
}

/// A variable, i.e. the absolute value of a literal. Always positive.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Variable {
    inner: NonZeroI32,
}

impl Literal {
    pub fn variable(self) -> Variable {
        Variable {
            inner: self.inner.abs(),
        }
    }

    pub fn is_positive(self) -> bool {
        self.inner.get() > 0
    }

    pub fn raw(&self) -> i32 {
        i32::from(self.inner)
    }
}

impl Variable {
    pub fn index(self) -> usize {
        self.inner.get() as usize
    }

    /// The literal that is true exactly when this variable takes `value`.
    pub fn literal(self, value: bool) -> Literal {
        Literal {
            inner: if value { self.inner } else { -self.inner },
        }
    }
}

impl Neg for Literal {
    type Output = Self;

    fn neg(mut self) -> Self::Output {
        self.inner = -self.inner;
        self
    }
}

/// Fails on 0 and on `i32::MIN`, whose negation does not fit.
impl TryFrom<i32> for Literal {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match NonZeroI32::new(value) {
            Some(inner) if value != i32::MIN => Ok(Literal { inner }),
            _ => Err(()),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lit(raw: i32) -> Literal {
        Literal::try_from(raw).unwrap()
    }

    #[test]
    fn zero_is_rejected() {
        assert!(Literal::try_from(0).is_err());
        assert!(Literal::try_from(i32::MIN).is_err());
    }

    #[test]
    fn polarity_and_variable() {
        assert!(lit(3).is_positive());
        assert!(!lit(-3).is_positive());
        assert_eq!(lit(-3).variable(), lit(3).variable());
        assert_eq!(lit(-3).variable().index(), 3);
    }

    #[test]
    fn variable_to_literal() {
        let var = lit(7).variable();
        assert_eq!(var.literal(true), lit(7));
        assert_eq!(var.literal(false), lit(-7));
        assert_eq!(-var.literal(false), lit(7));
        assert_eq!(lit(-7).to_string(), "-7");
    }
}
