//! Smoke-run the example programs.
//!
//! Each pair starts a server, gives it a moment to bind, runs the client for
//! a bounded time and then stops whatever is still running. Processes stopped
//! by the runner do not count as failures.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};

/// One server, optionally with a client talking to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamplePair {
    pub server: &'static str,
    pub client: Option<&'static str>,
    pub server_args: &'static [&'static str],
    pub client_args: &'static [&'static str],
}

impl ExamplePair {
    pub const fn server(server: &'static str) -> Self {
        Self {
            server,
            client: None,
            server_args: &[],
            client_args: &[],
        }
    }

    pub const fn with_client(mut self, client: &'static str) -> Self {
        self.client = Some(client);
        self
    }

    pub const fn with_client_args(mut self, args: &'static [&'static str]) -> Self {
        self.client_args = args;
        self
    }
}

pub const EXAMPLE_PAIRS: &[ExamplePair] = &[
    ExamplePair::server("typeconversion"),
    ExamplePair::server("server"),
    ExamplePair::server("server_instantiation"),
    ExamplePair::server("server_valuecallback"),
    ExamplePair::server("server_datasource"),
    ExamplePair::server("server_events"),
    ExamplePair::server("server_minimal").with_client("client_find_servers"),
    ExamplePair::server("server_minimal").with_client("client_browse"),
    ExamplePair::server("server_minimal").with_client("client_subscription"),
    ExamplePair::server("server_method").with_client("client_method"),
    ExamplePair::server("server_method").with_client("client_method_async"),
    ExamplePair::server("server_custom_datatypes").with_client("client_custom_datatypes"),
    ExamplePair::server("server_accesscontrol")
        .with_client("client_connect")
        .with_client_args(&["--username", "user", "--password", "user", "opc.tcp://localhost:4840"]),
    ExamplePair::server("server_accesscontrol")
        .with_client("client_connect")
        .with_client_args(&["--username", "admin", "--password", "admin", "opc.tcp://localhost:4840"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerTimings {
    /// Delay between starting the server and starting the client.
    pub wait_server: Duration,
    /// How long the client may run before it is terminated.
    pub wait_client: Duration,
    /// How long the server may keep running after the client is done.
    pub wait_server_exit: Duration,
}

impl Default for RunnerTimings {
    fn default() -> Self {
        Self {
            wait_server: Duration::from_secs(1),
            wait_client: Duration::from_secs(3),
            wait_server_exit: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub name: String,
    pub status: ExitStatus,
    /// Stopped by the runner after its time ran out.
    pub terminated: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn failed(&self) -> bool {
        !self.terminated && !self.status.success()
    }

    /// Stdout without the stack's `[timestamp] level` log lines.
    pub fn stdout_without_logs(&self) -> String {
        self.stdout
            .split('\n')
            .filter(|line| !line.starts_with('['))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    Skipped { missing: PathBuf },
    Ran {
        server: ProcessOutcome,
        client: Option<ProcessOutcome>,
    },
}

impl PairOutcome {
    pub fn failed(&self) -> bool {
        match self {
            PairOutcome::Skipped { .. } => false,
            PairOutcome::Ran { server, client } => {
                server.failed() || client.as_ref().is_some_and(ProcessOutcome::failed)
            }
        }
    }
}

fn executable(bin_dir: &Path, name: &str) -> PathBuf {
    bin_dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX))
}

fn spawn(path: &Path, args: &[&str]) -> Result<Child> {
    Command::new(path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to start {:?}", path))
}

/// Wait up to `timeout`, then terminate, and collect the output.
async fn finish(name: &str, mut child: Child, timeout: Duration) -> Result<ProcessOutcome> {
    let terminated = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => {
            status.with_context(|| format!("failed to wait for {name}"))?;
            false
        }
        Err(_) => {
            child
                .start_kill()
                .with_context(|| format!("failed to terminate {name}"))?;
            true
        }
    };
    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("failed to collect output of {name}"))?;

    Ok(ProcessOutcome {
        name: name.to_string(),
        status: output.status,
        terminated,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run one pair. Missing executables skip the pair.
pub async fn run_pair(
    bin_dir: &Path,
    pair: &ExamplePair,
    timings: &RunnerTimings,
) -> Result<PairOutcome> {
    let server_exe = executable(bin_dir, pair.server);
    let client_exe = pair.client.map(|client| executable(bin_dir, client));

    for exe in std::iter::once(&server_exe).chain(client_exe.as_ref()) {
        if !exe.exists() {
            tracing::warn!(path = %exe.display(), "example not found, skipping");
            return Ok(PairOutcome::Skipped {
                missing: exe.clone(),
            });
        }
    }

    let server = spawn(&server_exe, pair.server_args)?;
    tokio::time::sleep(timings.wait_server).await;

    let client = match (&client_exe, pair.client) {
        (Some(exe), Some(name)) => {
            let child = spawn(exe, pair.client_args)?;
            Some(finish(name, child, timings.wait_client).await?)
        }
        _ => None,
    };
    let server = finish(pair.server, server, timings.wait_server_exit).await?;

    Ok(PairOutcome::Ran { server, client })
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn echo_process(out: &mut dyn Write, outcome: &ProcessOutcome) -> Result<()> {
    let captured = outcome.stdout_without_logs();
    if !captured.trim().is_empty() {
        writeln!(out, "Captured output {}:", outcome.name)?;
        writeln!(out, "{}", indent(&captured))?;
    }
    if outcome.failed() {
        writeln!(out, "Error {} ({}):", outcome.name, outcome.status)?;
        writeln!(out, "{}", indent(&outcome.stderr))?;
    }
    Ok(())
}

/// Run `pairs` in order, echoing captured output to `out`.
///
/// Stops after the first failing pair; the returned outcomes end with it.
pub async fn run_examples(
    bin_dir: &Path,
    pairs: &[ExamplePair],
    timings: &RunnerTimings,
    out: &mut dyn Write,
) -> Result<Vec<PairOutcome>> {
    let mut outcomes = Vec::with_capacity(pairs.len());
    for pair in pairs {
        writeln!(
            out,
            "[RUN] {} {:?} / {} {:?}",
            pair.server,
            pair.server_args,
            pair.client.unwrap_or("None"),
            pair.client_args
        )?;

        let outcome = run_pair(bin_dir, pair, timings).await?;
        match &outcome {
            PairOutcome::Skipped { missing } => writeln!(out, "Skip: {} not found", missing.display())?,
            PairOutcome::Ran { server, client } => {
                echo_process(out, server)?;
                if let Some(client) = client {
                    echo_process(out, client)?;
                }
            }
        }

        let failed = outcome.failed();
        outcomes.push(outcome);
        if failed {
            break;
        }
    }
    Ok(outcomes)
}
