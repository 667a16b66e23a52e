use super::{parse_i32, parse_usize};
use crate::common::Formula;
use anyhow::{anyhow, bail, Context, Result};
use itertools::Itertools;
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1},
    multi::many0,
    sequence::{preceded, terminated, tuple},
    IResult, Parser,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub vars: usize,
    pub clauses: usize,
}

fn parse_header(input: &str) -> IResult<&str, Header> {
    let (input, _) =
        tuple((multispace0, tag("p"), multispace1, tag("cnf"), multispace1)).parse(input)?;
    let (input, (vars, _, clauses)) =
        tuple((parse_usize, multispace1, parse_usize)).parse(input)?;
    Ok((input, Header { vars, clauses }))
}

fn parse_numbers(input: &str) -> IResult<&str, Vec<i32>> {
    terminated(many0(preceded(multispace0, parse_i32)), multispace0).parse(input)
}

/// Parse a formula in DIMACS CNF format. Clauses are terminated by `0` and may span several
/// lines. Literals outside of the variable range declared in the header are rejected.
pub fn parse(input: &str) -> Result<Formula> {
    info!("parsing cnf");
    let mut lines = input
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with('c'));
    let header = {
        let (rest, header) = parse_header(lines.next().ok_or(anyhow!("empty input"))?)
            .map_err(|_| anyhow!("invalid dimacs header"))?;
        if !rest.trim().is_empty() {
            bail!("unexpected '{}' after dimacs header", rest.trim());
        }
        info!("{} variables and {} clauses", header.vars, header.clauses);
        header
    };

    // a lone '%' ends the clause section in SATLIB benchmarks
    let body = lines.take_while(|&line| line != "%").join("\n");
    let (rest, numbers) = parse_numbers(&body).map_err(|_| anyhow!("invalid clause data"))?;
    if let Some(line) = rest.lines().next() {
        bail!("invalid clause '{}'", line);
    }

    let mut clauses = vec![];
    let mut current = vec![];
    for number in numbers {
        if number == 0 {
            clauses.push(std::mem::take(&mut current));
        } else {
            current.push(number);
        }
    }
    if !current.is_empty() {
        bail!("last clause is not terminated by 0");
    }
    if clauses.len() != header.clauses {
        warn!(
            "header declares {} clauses but {} were found",
            header.clauses,
            clauses.len()
        );
    }

    Formula::with_variables(header.vars, clauses).context("invalid formula")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::InvalidFormula;

    #[test]
    fn header() {
        assert_eq!(
            parse_header("p cnf 4 12").unwrap().1,
            Header {
                vars: 4,
                clauses: 12
            }
        );
        assert!(parse_header("p dnf 4 12").is_err());
        assert!(parse_header("p cnf -4 12").is_err());
    }

    #[test]
    fn clauses_across_lines() {
        let input = "c example\np cnf 4 4\n1 -3 4 0\n-1 2 0 -2\n3 0\nc inline comment\n-4 0\n";
        let formula = parse(input).unwrap();
        assert_eq!(formula.num_vars(), 4);
        let clauses = formula.clauses().map(|c| c.to_string()).collect_vec();
        assert_eq!(clauses, vec!["(1 | -3 | 4)", "(-1 | 2)", "(-2 | 3)", "(-4)"]);
    }

    #[test]
    fn empty_clause_and_terminator() {
        let formula = parse("p cnf 2 2\n1 2 0\n0\n%\n0\n").unwrap();
        assert_eq!(formula.num_clauses(), 2);
        assert!(formula.has_empty_clause());
    }

    #[test]
    fn declared_variables_are_enforced() {
        let err = parse("p cnf 2 1\n1 3 0\n").unwrap_err();
        assert_eq!(
            err.downcast_ref::<InvalidFormula>(),
            Some(&InvalidFormula::VariableOutOfRange {
                literal: 3,
                clause: 0,
                num_vars: 2
            })
        );
        // unused variables still count
        assert_eq!(parse("p cnf 9 1\n1 0\n").unwrap().num_vars(), 9);
    }

    #[test]
    fn variable_count_beyond_literal_range() {
        let err = parse("p cnf 18446744073709551615 1\n1 0\n").unwrap_err();
        assert_eq!(
            err.downcast_ref::<InvalidFormula>(),
            Some(&InvalidFormula::TooManyVariables {
                num_vars: usize::MAX
            })
        );
    }

    #[test]
    fn malformed_input() {
        assert!(parse("").is_err());
        assert!(parse("1 2 0\n").is_err());
        assert!(parse("p cnf 2 1\n1 x 0\n").is_err());
        assert!(parse("p cnf 2 1\n1 2\n").is_err());
    }
}
