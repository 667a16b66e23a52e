use std::time::{Duration, Instant};

use fxhash::FxHashSet;
use indicatif::ProgressBar;
use itertools::Itertools;
use tracing::{debug, info, trace};

use crate::{
    cache::{Cache, CacheCapacity, CacheStats},
    common::{
        Assignment, CacheKey, Evaluation, Formula, InvalidFormula, Literal, Outcome, Variable,
    },
};

/// Settings of a single solver instance. There is no global configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub cache: CacheCapacity,
    /// Assign literals whose negation occurs in no open clause before branching.
    pub pure_literals: bool,
    /// Abort the search with [`SolveError::TimedOut`] once this much time has passed.
    pub timeout: Option<Duration>,
    /// Show a spinner counting the visited search nodes.
    pub progress: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error(transparent)]
    Invalid(#[from] InvalidFormula),
    #[error("no verdict within {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Search states that were evaluated, i.e. not answered by the cache.
    pub nodes: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub pure_literals: u64,
    pub conflicts: u64,
    pub cache: CacheStats,
}

/// What the formula says about one search state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Satisfied,
    Conflict,
    Unit(Literal),
    Open,
}

/// Where the forced part of a search step ended.
enum Step {
    Done(Outcome),
    Branch(Assignment, Variable),
}

/// A decision whose true branch is being explored or whose false branch is pending.
struct Frame {
    /// Keys of every state from the start of the step up to the decision.
    chain: Vec<CacheKey>,
    assignment: Assignment,
    variable: Variable,
    tried_false: bool,
}

/// Solve a formula from the empty assignment with the default configuration.
pub fn solve(formula: &Formula) -> Result<Outcome, SolveError> {
    Solver::new(formula, Config::default()).solve()
}

/// DPLL search with memoization of every visited partial assignment.
///
/// The cache belongs to the solver and lives exactly as long as it does, so outcomes of
/// different formulas can never mix.
pub struct Solver<'a> {
    formula: &'a Formula,
    config: Config,
    cache: Cache,
    stats: Stats,
    deadline: Option<Instant>,
    progress: ProgressBar,
}

impl<'a> Solver<'a> {
    pub fn new(formula: &'a Formula, config: Config) -> Self {
        let progress = if config.progress {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        Solver {
            formula,
            cache: Cache::new(config.cache),
            config,
            stats: Stats::default(),
            deadline: None,
            progress,
        }
    }

    pub fn solve(&mut self) -> Result<Outcome, SolveError> {
        self.solve_from(Assignment::new(self.formula.num_vars()))
    }

    /// Search for a satisfying extension of `assignment`.
    pub fn solve_from(&mut self, assignment: Assignment) -> Result<Outcome, SolveError> {
        // rebuild against the formula so every key has the same shape
        let assignment = Assignment::from_literals(
            self.formula.num_vars(),
            assignment.literals().map(|lit| lit.raw()),
        )?;
        info!(
            "solving {} clauses over {} variables from {} assigned",
            self.formula.num_clauses(),
            self.formula.num_vars(),
            assignment.len()
        );
        // a deadline beyond what `Instant` can represent never expires
        self.deadline = self
            .config
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));

        let result = self.search(assignment);
        self.progress.finish_and_clear();
        match &result {
            Ok(outcome) => info!(
                "finished with {} after {} nodes, {} decisions, {} propagations, {} conflicts",
                if outcome.is_sat() { "SAT" } else { "UNSAT" },
                self.stats.nodes,
                self.stats.decisions,
                self.stats.propagations,
                self.stats.conflicts
            ),
            Err(e) => info!("aborted after {} nodes: {}", self.stats.nodes, e),
        }
        result
    }

    pub fn stats(&self) -> Stats {
        Stats {
            cache: self.cache.stats(),
            ..self.stats
        }
    }

    /// Depth first search over decisions. The call stack is replaced by `frames` so that the
    /// depth is not limited by the thread's stack size.
    fn search(&mut self, root: Assignment) -> Result<Outcome, SolveError> {
        let mut frames: Vec<Frame> = vec![];
        let mut assignment = root;

        loop {
            let mut chain = vec![];
            let outcome = match self.forced_step(assignment, &mut chain)? {
                Step::Branch(at, variable) => {
                    self.stats.decisions += 1;
                    debug!("deciding {} at depth {}", variable, frames.len());
                    assignment = at.extended(variable.literal(true));
                    frames.push(Frame {
                        chain,
                        assignment: at,
                        variable,
                        tried_false: false,
                    });
                    continue;
                }
                Step::Done(outcome) => {
                    self.memoize(chain, &outcome);
                    outcome
                }
            };

            // unwind until a frame still has its false branch to explore
            assignment = loop {
                let Some(mut frame) = frames.pop() else {
                    return Ok(outcome);
                };
                if !outcome.is_sat() && !frame.tried_false {
                    frame.tried_false = true;
                    let next = frame.assignment.extended(frame.variable.literal(false));
                    frames.push(frame);
                    break next;
                }
                self.memoize(frame.chain, &outcome);
            };
        }
    }

    /// Run the cache lookup, the checks and propagation from one state until either an outcome
    /// is known or a decision is necessary. Every state visited on the way is pushed to `chain`.
    fn forced_step(
        &mut self,
        mut assignment: Assignment,
        chain: &mut Vec<CacheKey>,
    ) -> Result<Step, SolveError> {
        loop {
            let key = assignment.key();
            if let Some(outcome) = self.cache.get(&key) {
                trace!("cache hit with {} assigned", assignment.len());
                return Ok(Step::Done(outcome));
            }
            chain.push(key);
            self.check_deadline()?;
            self.stats.nodes += 1;
            self.progress.inc(1);

            match self.examine(&assignment) {
                State::Satisfied => return Ok(Step::Done(Outcome::Satisfiable(assignment))),
                State::Conflict => {
                    self.stats.conflicts += 1;
                    debug!("conflict with {} assigned", assignment.len());
                    return Ok(Step::Done(Outcome::Unsatisfiable));
                }
                State::Unit(lit) => {
                    self.stats.propagations += 1;
                    trace!("propagating unit {}", lit);
                    assignment = assignment.extended(lit);
                    continue;
                }
                State::Open => (),
            }

            if self.config.pure_literals {
                if let Some(lit) = self.pure_literal(&assignment) {
                    self.stats.pure_literals += 1;
                    trace!("assigning pure literal {}", lit);
                    assignment = assignment.extended(lit);
                    continue;
                }
            }

            return Ok(match self.branch_variable(&assignment) {
                Some(variable) => Step::Branch(assignment, variable),
                // an open formula always has an unassigned variable left
                None => Step::Done(Outcome::Unsatisfiable),
            });
        }
    }

    fn memoize(&mut self, chain: Vec<CacheKey>, outcome: &Outcome) {
        for key in chain {
            self.cache.insert(key, outcome.clone());
        }
    }

    fn check_deadline(&self) -> Result<(), SolveError> {
        match (self.deadline, self.config.timeout) {
            (Some(deadline), Some(timeout)) if Instant::now() >= deadline => {
                Err(SolveError::TimedOut(timeout))
            }
            _ => Ok(()),
        }
    }

    /// Evaluate all clauses in one pass. The formula is satisfied if every clause is, it is in
    /// conflict if any clause is falsified, otherwise the first unit clause is reported.
    fn examine(&self, assignment: &Assignment) -> State {
        let mut satisfied = true;
        let mut unit = None;
        for clause in self.formula.clauses() {
            match clause.eval(assignment) {
                Evaluation::True => (),
                Evaluation::False => return State::Conflict,
                Evaluation::Unit(lit) => {
                    satisfied = false;
                    unit.get_or_insert(lit);
                }
                Evaluation::Unknown => satisfied = false,
            }
        }

        match unit {
            _ if satisfied => State::Satisfied,
            Some(lit) => State::Unit(lit),
            None => State::Open,
        }
    }

    /// Find an unassigned literal occurring in an open clause whose negation occurs in none.
    fn pure_literal(&self, assignment: &Assignment) -> Option<Literal> {
        let open = self
            .formula
            .clauses()
            .filter(|clause| clause.eval(assignment) != Evaluation::True)
            .flat_map(|clause| clause.literals().iter().copied())
            .filter(|lit| !assignment.is_assigned(lit.variable()))
            .collect_vec();
        let occurring: FxHashSet<Literal> = open.iter().copied().collect();
        open.into_iter().find(|&lit| !occurring.contains(&-lit))
    }

    /// The first unassigned variable when reading the clauses from left to right.
    fn branch_variable(&self, assignment: &Assignment) -> Option<Variable> {
        self.formula
            .literals()
            .iter()
            .map(|lit| lit.variable())
            .find(|&var| !assignment.is_assigned(var))
    }
}
