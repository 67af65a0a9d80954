//! External process execution
//!
//! This module provides:
//! - `CommandRunner`, the seam every `dotnet` invocation goes through
//! - `DotNetRunner`, which runs a program while draining stdout and stderr
//!   on two threads and kills it once it stays silent for too long
//! - `DotNetCli`, the argument builders for graph generation, restore and
//!   add-package

mod dotnet;

pub use dotnet::{AddPackageRequest, DotNetCli};

use crate::error::BuildToolError;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default inactivity timeout for external commands
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(20_000);

/// How often the watchdog checks for exit and inactivity
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit code reported for a process killed by the watchdog
pub const KILLED_EXIT_CODE: i32 = -1;

/// Captured result of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatus {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl RunStatus {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Returns true if the command exited with code zero
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns true if the watchdog killed the command
    pub fn was_killed(&self) -> bool {
        self.exit_code == KILLED_EXIT_CODE
    }

    /// Convert a non-zero exit into a `CommandFailed` error
    pub fn into_result(self, command: impl Into<String>) -> Result<RunStatus, BuildToolError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(BuildToolError::CommandFailed {
                command: command.into(),
                stdout: self.stdout,
                stderr: self.stderr,
                exit_code: self.exit_code,
            })
        }
    }
}

/// Trait for running external commands
pub trait CommandRunner: Send + Sync {
    /// Run the program with `args` in `working_dir`, killing it after
    /// `idle_timeout` without any output
    fn run(
        &self,
        working_dir: &Path,
        args: &[String],
        idle_timeout: Duration,
    ) -> Result<RunStatus, BuildToolError>;
}

/// Runner that executes a real program, `dotnet` by default
#[derive(Debug, Clone)]
pub struct DotNetRunner {
    program: String,
}

impl Default for DotNetRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl DotNetRunner {
    pub fn new() -> Self {
        Self {
            program: "dotnet".to_string(),
        }
    }

    /// Run a different program with the same supervision
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

fn touch(activity: &Mutex<Instant>) {
    if let Ok(mut last) = activity.lock() {
        *last = Instant::now();
    }
}

fn snapshot(buffer: &Mutex<String>) -> String {
    buffer.lock().map(|b| b.clone()).unwrap_or_default()
}

/// Drain `stream` line by line into `buffer`, resetting the activity clock per line
fn drain<R>(stream: R, buffer: Arc<Mutex<String>>, activity: Arc<Mutex<Instant>>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if let Ok(mut out) = buffer.lock() {
                        out.push_str(&String::from_utf8_lossy(&line));
                    }
                    touch(&activity);
                }
            }
        }
    })
}

/// Join the reader threads once the pipes close. A grandchild holding the
/// pipes open leaves them detached after `idle_timeout` without output.
fn finish_readers(readers: [JoinHandle<()>; 2], activity: &Mutex<Instant>, idle_timeout: Duration) {
    loop {
        if readers.iter().all(JoinHandle::is_finished) {
            for reader in readers {
                let _ = reader.join();
            }
            return;
        }
        let idle = activity
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default();
        if idle > idle_timeout {
            tracing::debug!("Output pipes still open after exit, not waiting for them");
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl CommandRunner for DotNetRunner {
    fn run(
        &self,
        working_dir: &Path,
        args: &[String],
        idle_timeout: Duration,
    ) -> Result<RunStatus, BuildToolError> {
        tracing::debug!(
            "Running {} {} (in {})",
            self.program,
            args.join(" "),
            working_dir.display()
        );

        let spawn_error = |source: std::io::Error| BuildToolError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            return Err(spawn_error(std::io::Error::other("output streams not captured")));
        };

        let activity = Arc::new(Mutex::new(Instant::now()));
        let out_buffer = Arc::new(Mutex::new(String::new()));
        let err_buffer = Arc::new(Mutex::new(String::new()));
        let out_reader = drain(stdout, Arc::clone(&out_buffer), Arc::clone(&activity));
        let err_reader = drain(stderr, Arc::clone(&err_buffer), Arc::clone(&activity));

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    finish_readers([out_reader, err_reader], &activity, idle_timeout);
                    let exit_code = status.code().unwrap_or(KILLED_EXIT_CODE);
                    tracing::debug!("{} exited with code {}", self.program, exit_code);
                    return Ok(RunStatus::new(
                        snapshot(&out_buffer),
                        snapshot(&err_buffer),
                        exit_code,
                    ));
                }
                Ok(None) => {}
                Err(source) => {
                    let _ = child.kill();
                    return Err(spawn_error(source));
                }
            }

            let idle = activity
                .lock()
                .map(|last| last.elapsed())
                .unwrap_or_default();
            if idle > idle_timeout {
                tracing::warn!(
                    "{} produced no output for {}ms, killing it",
                    self.program,
                    idle.as_millis()
                );
                let _ = child.kill();
                let _ = child.wait();
                // Readers are left detached: a grandchild may still hold the pipes
                return Ok(RunStatus::new(
                    snapshot(&out_buffer),
                    snapshot(&err_buffer),
                    KILLED_EXIT_CODE,
                ));
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}
