//! Oracle that runs an external program on every subset.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Atom, Delta, OracleConfig};
use crate::domain::ports::Oracle;

/// Environment variable holding the number of selected atoms.
pub const SUBSET_SIZE_ENV: &str = "LOCKCELL_SUBSET_SIZE";

/// Runs `program args...` with the labels of the selected atoms on stdin,
/// one per line.
///
/// Exit status 0 is a PASS and any other exit code a FAIL. A program that
/// cannot be spawned, is killed by a signal or exceeds the timeout is an
/// invocation error, not a verdict.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    labels: Vec<String>,
    timeout: Duration,
    workdir: Option<PathBuf>,
}

impl CommandOracle {
    /// Run `program` with one label per atom, a 300 second timeout and no
    /// extra arguments.
    pub fn new(program: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            labels,
            timeout: Duration::from_secs(300),
            workdir: None,
        }
    }

    /// Build from configuration, reading atom labels from `atoms_file`.
    ///
    /// # Arguments
    /// * `config` - Oracle section of the configuration
    ///
    /// # Errors
    /// Returns `Precondition` when `program` or `atoms_file` is missing, and
    /// `OracleInvocation` when the atoms file cannot be read.
    pub async fn from_config(config: &OracleConfig) -> DomainResult<Self> {
        let program = config.program.clone().ok_or_else(|| {
            DomainError::Precondition("oracle.program is not configured".to_string())
        })?;
        let atoms_file = config.atoms_file.as_deref().ok_or_else(|| {
            DomainError::Precondition("oracle.atoms_file is not configured".to_string())
        })?;
        let labels = read_labels(Path::new(atoms_file)).await?;

        Ok(Self::new(program, labels)
            .with_args(config.args.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs)))
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Kill the program once a run exceeds `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Working directory of every run.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn render(&self, subset: &Delta) -> DomainResult<String> {
        let mut input = String::new();
        for atom in subset.atoms() {
            let label = self.labels.get(atom.index()).ok_or_else(|| {
                DomainError::StructuralInvariant(format!(
                    "atom {atom} is outside the {} labelled atoms",
                    self.labels.len()
                ))
            })?;
            input.push_str(label);
            input.push('\n');
        }
        Ok(input)
    }
}

/// Read one label per non-empty line.
pub async fn read_labels(path: &Path) -> DomainResult<Vec<String>> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|err| {
        DomainError::OracleInvocation(format!("cannot read atoms file {}: {err}", path.display()))
    })?;
    Ok(contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

#[async_trait]
impl Oracle for CommandOracle {
    fn name(&self) -> &'static str {
        "command"
    }

    fn search_space(&self) -> Delta {
        (0..self.labels.len())
            .map_while(|index| u32::try_from(index).ok())
            .map(Atom)
            .collect()
    }

    async fn test(&self, subset: &Delta) -> DomainResult<bool> {
        let input = self.render(subset)?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(SUBSET_SIZE_ENV, subset.len().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(workdir) = &self.workdir {
            command.current_dir(workdir);
        }

        let mut child = command.spawn().map_err(|err| {
            DomainError::OracleInvocation(format!("cannot spawn {}: {err}", self.program))
        })?;

        // Stdin is fed while the child is awaited; both sit under the timeout.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                if let Err(err) = stdin.write_all(input.as_bytes()).await {
                    debug!(error = %err, "oracle program closed stdin early");
                }
            }
        };
        let run = async move {
            let ((), output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                DomainError::OracleInvocation(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                ))
            })?
            .map_err(|err| {
                DomainError::OracleInvocation(format!("cannot wait for {}: {err}", self.program))
            })?;

        match output.status.code() {
            Some(0) => Ok(true),
            Some(code) => {
                debug!(code, size = subset.len(), "oracle program reported a failure");
                Ok(false)
            }
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(program = %self.program, "oracle program terminated by a signal");
                Err(DomainError::OracleInvocation(format!(
                    "{} terminated by a signal: {}",
                    self.program,
                    stderr.trim()
                )))
            }
        }
    }
}
