use std::{process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use memosat::{parser, CacheCapacity, Config, Outcome, SolveError, Solver, Stats};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
pub struct Flags {
    #[arg(long)]
    /// Maximum number of search states to memoize. The least recently used state is evicted
    /// once the limit is reached. 0 disables memoization, no value keeps every state.
    cache_capacity: Option<usize>,
    #[arg(long)]
    /// Assign pure literals before branching.
    pure_literals: bool,
    #[arg(short, long)]
    /// Give up after this many seconds and report UNKNOWN.
    timeout: Option<u64>,
    #[arg(short, long)]
    /// Show a spinner counting the visited search states.
    progress: bool,
    #[arg(short, long)]
    /// Print search statistics as comment lines.
    stats: bool,
    cnf: String,
}

impl From<&Flags> for Config {
    fn from(flags: &Flags) -> Self {
        Config {
            cache: CacheCapacity::from(flags.cache_capacity),
            pure_literals: flags.pure_literals,
            timeout: flags.timeout.map(Duration::from_secs),
            progress: flags.progress,
        }
    }
}

fn print_stats(stats: &Stats) {
    println!("c nodes          {}", stats.nodes);
    println!("c decisions      {}", stats.decisions);
    println!("c propagations   {}", stats.propagations);
    println!("c pure literals  {}", stats.pure_literals);
    println!("c conflicts      {}", stats.conflicts);
    println!("c cache hits     {}", stats.cache.hits);
    println!("c cache misses   {}", stats.cache.misses);
    println!("c cache inserts  {}", stats.cache.inserts);
    println!("c cache evicted  {}", stats.cache.evictions);
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();
    let flags = Flags::parse();

    let input = std::fs::read_to_string(&flags.cnf)
        .with_context(|| format!("could not read {}", flags.cnf))?;
    let formula = parser::cnf::parse(&input)?;

    let mut solver = Solver::new(&formula, Config::from(&flags));
    let result = solver.solve();
    if flags.stats {
        print_stats(&solver.stats());
    }

    let (lines, code) = report(result)?;
    for line in lines {
        println!("{}", line);
    }
    Ok(ExitCode::from(code))
}

/// Render a search result as SAT competition output lines together with the matching exit code.
fn report(result: Result<Outcome, SolveError>) -> Result<(Vec<String>, u8)> {
    match result {
        Ok(Outcome::Satisfiable(assignment)) => {
            let values = if assignment.is_empty() {
                "v 0".to_string()
            } else {
                format!("v {} 0", assignment)
            };
            Ok((vec!["s SATISFIABLE".to_string(), values], 10))
        }
        Ok(Outcome::Unsatisfiable) => Ok((vec!["s UNSATISFIABLE".to_string()], 20)),
        Err(e @ SolveError::TimedOut(_)) => {
            tracing::warn!("{}", e);
            Ok((vec!["s UNKNOWN".to_string()], 0))
        }
        Err(e) => Err(e.into()),
    }
}
