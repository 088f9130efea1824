//! `lockcell run`: start a search and follow it to completion.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapters::oracles::{CommandOracle, MockOracle};
use crate::cli::output::progress::{create_spinner, ProgressBarExt};
use crate::cli::output::table::format_subsets;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, Delta, JobKind, JobStatus, SearchMode};
use crate::domain::ports::Oracle;
use crate::services::Lockcell;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job to run: ddmin (one round) or rddmin (rounds until the rest passes)
    #[arg(long, default_value = "rddmin")]
    pub job: JobKind,

    /// Search mode: default or analyse (overrides configuration)
    #[arg(long)]
    pub mode: Option<SearchMode>,

    /// Poll interval in milliseconds (overrides configuration)
    #[arg(long)]
    pub poll_ms: Option<u64>,

    #[command(subcommand)]
    pub oracle: OracleCommands,
}

#[derive(Subcommand, Debug)]
pub enum OracleCommands {
    /// Combinatorial oracle: a subset fails when it holds every atom of a cause
    Mock {
        /// Number of atoms in the universe
        #[arg(long)]
        size: u32,

        /// A cause as comma-separated atom ids; repeat for several causes
        #[arg(long = "cause", required = true)]
        causes: Vec<CauseArg>,
    },

    /// Run an external program on every subset; exit status 0 passes
    Command {
        /// File with one atom label per line (defaults to oracle.atoms_file)
        #[arg(long)]
        atoms: Option<PathBuf>,

        /// Per-run timeout in seconds (defaults to oracle.timeout_secs)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Program and arguments (defaults to oracle.program and oracle.args)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        program: Vec<String>,
    },
}

/// Atom ids of one mock cause, written `0,32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CauseArg(pub Vec<u32>);

impl FromStr for CauseArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let atoms = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u32>()
                    .map_err(|_| format!("invalid atom id '{}' in cause '{s}'", part.trim()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if atoms.is_empty() {
            return Err("a cause needs at least one atom".to_string());
        }
        Ok(Self(atoms))
    }
}

/// Summary of a finished search.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub job: JobKind,
    pub mode: SearchMode,
    pub oracle: String,
    pub atoms: usize,
    pub steps: usize,
    pub elapsed_ms: u128,
    pub subsets: Vec<Delta>,
    #[serde(skip)]
    pub labels: Option<Vec<String>>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        if self.subsets.is_empty() {
            return format!(
                "No failing subset found over {} atoms ({} job, {} ms).",
                self.atoms, self.job, self.elapsed_ms
            );
        }

        format!(
            "{}\nFound {} minimal failing subset(s) over {} atoms ({} job, {} mode, {} step(s), {} ms).",
            format_subsets(&self.subsets, self.labels.as_deref()),
            self.subsets.len(),
            self.atoms,
            self.job,
            self.mode,
            self.steps,
            self.elapsed_ms
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

async fn build_oracle(
    oracle: OracleCommands,
    config: &Config,
) -> Result<(Arc<dyn Oracle>, Option<Vec<String>>)> {
    match oracle {
        OracleCommands::Mock { size, causes } => {
            let mock = causes
                .into_iter()
                .fold(MockOracle::new(size), |mock, cause| mock.with_cause(cause.0));
            Ok((Arc::new(mock), None))
        }
        OracleCommands::Command {
            atoms,
            timeout_secs,
            program,
        } => {
            let mut oracle_config = config.oracle.clone();
            if let Some(atoms) = atoms {
                oracle_config.atoms_file = Some(atoms.display().to_string());
            }
            if let Some(timeout_secs) = timeout_secs {
                oracle_config.timeout_secs = timeout_secs;
            }
            if let Some((program, args)) = program.split_first() {
                oracle_config.program = Some(program.clone());
                oracle_config.args = args.to_vec();
            }

            let oracle = CommandOracle::from_config(&oracle_config)
                .await
                .context("Failed to set up command oracle")?;
            let labels = oracle.labels().to_vec();
            Ok((Arc::new(oracle), Some(labels)))
        }
    }
}

/// Run one job to completion, streaming subsets as they are found.
///
/// # Errors
/// Returns an error if the oracle cannot be built or the job fails.
pub async fn execute(args: RunArgs, mut config: Config, json_mode: bool) -> Result<()> {
    if let Some(mode) = args.mode {
        config.search.mode = mode;
    }
    let poll = Duration::from_millis(args.poll_ms.unwrap_or(config.poll_interval_ms).max(1));
    let mode = config.search.mode;

    let (oracle, labels) = build_oracle(args.oracle, &config).await?;
    let oracle_name = oracle.name().to_string();
    let started = Instant::now();

    let mut lockcell = Lockcell::new(config, oracle);
    let atoms = lockcell.search_space().len();
    lockcell.open();
    lockcell.set_job(args.job)?;
    lockcell.run().await.context("Failed to start job")?;

    let spinner = create_spinner(format!("{} over {atoms} atoms", args.job), json_mode);
    loop {
        if lockcell.update().await? {
            for subset in lockcell.get_update()? {
                spinner.found(subset.to_string());
            }
        }

        match lockcell.status() {
            JobStatus::Completed => break,
            JobStatus::Failed => {
                spinner.finish_error("search failed");
                let err = lockcell
                    .last_error()
                    .map_or_else(|| "job failed".to_string(), ToString::to_string);
                lockcell.close();
                anyhow::bail!("Search failed: {err}");
            }
            status => spinner.set_message(format!(
                "{} {status}: step {}, {} atoms left",
                args.job,
                lockcell.step(),
                lockcell.search_space().len()
            )),
        }

        tokio::time::sleep(poll).await;
    }

    let subsets = lockcell.get_result()?;
    spinner.finish_success(format!("{} subset(s) found", subsets.len()));

    let out = RunOutput {
        job: args.job,
        mode,
        oracle: oracle_name,
        atoms,
        steps: lockcell.step(),
        elapsed_ms: started.elapsed().as_millis(),
        subsets,
        labels,
    };
    lockcell.close();

    output(&out, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        run: RunArgs,
    }

    #[test]
    fn test_cause_arg_parsing() {
        assert_eq!("0,32".parse::<CauseArg>(), Ok(CauseArg(vec![0, 32])));
        assert_eq!(" 7 ".parse::<CauseArg>(), Ok(CauseArg(vec![7])));
        assert!("1,x".parse::<CauseArg>().is_err());
    }

    #[test]
    fn test_parse_mock_run() {
        let harness = Harness::try_parse_from([
            "lockcell", "--job", "ddmin", "--mode", "analyse", "mock", "--size", "64", "--cause",
            "2", "--cause", "0,32",
        ])
        .expect("arguments should parse");

        assert_eq!(harness.run.job, JobKind::DdMin);
        assert_eq!(harness.run.mode, Some(SearchMode::Analyse));
        match harness.run.oracle {
            OracleCommands::Mock { size, causes } => {
                assert_eq!(size, 64);
                assert_eq!(causes, vec![CauseArg(vec![2]), CauseArg(vec![0, 32])]);
            }
            OracleCommands::Command { .. } => panic!("expected mock oracle"),
        }
    }

    #[test]
    fn test_parse_command_run_keeps_program_flags() {
        let harness = Harness::try_parse_from([
            "lockcell", "command", "--atoms", "atoms.txt", "--", "./check.sh", "--strict",
        ])
        .expect("arguments should parse");

        match harness.run.oracle {
            OracleCommands::Command { atoms, program, .. } => {
                assert_eq!(atoms, Some(PathBuf::from("atoms.txt")));
                assert_eq!(program, vec!["./check.sh".to_string(), "--strict".to_string()]);
            }
            OracleCommands::Mock { .. } => panic!("expected command oracle"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_execute_mock_search() {
        let args = RunArgs {
            job: JobKind::RddMin,
            mode: None,
            poll_ms: Some(5),
            oracle: OracleCommands::Mock {
                size: 32,
                causes: vec![CauseArg(vec![3]), CauseArg(vec![10, 20])],
            },
        };
        execute(args, Config::default(), true)
            .await
            .expect("search should complete");
    }

    #[test]
    fn test_run_output_human() {
        let out = RunOutput {
            job: JobKind::DdMin,
            mode: SearchMode::Default,
            oracle: "mock".to_string(),
            atoms: 16,
            steps: 0,
            elapsed_ms: 3,
            subsets: vec![Delta::from_ids([2]), Delta::from_ids([9])],
            labels: None,
        };
        let human = out.to_human();
        assert!(human.contains("Found 2 minimal failing subset(s)"));
        assert_eq!(out.to_json()["subsets"][1], serde_json::json!([9]));
    }
}
