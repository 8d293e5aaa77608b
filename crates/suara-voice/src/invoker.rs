//! Runs external engines as subprocesses and classifies how they ended.
//!
//! Every engine in the pipeline is a command-line program. The invoker
//! checks that the executable and any model or config files it needs are
//! present before spawning, so a missing artifact is reported as such
//! rather than as an opaque engine failure. A spawned process runs to
//! completion with its output captured, bounded by a wall-clock timeout.
//! The child is killed if the timeout fires or if the caller drops the
//! invocation future.

use crate::error::VoiceError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Role of a file an engine needs in order to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Model,
    Config,
}

/// One external engine run: what to execute and what must exist first.
#[derive(Debug, Clone)]
pub struct Invocation {
    tool: String,
    executable: PathBuf,
    args: Vec<OsString>,
    working_dir: Option<PathBuf>,
    required: Vec<(Artifact, PathBuf)>,
}

impl Invocation {
    /// `tool` names the engine in errors and log fields.
    pub fn new(tool: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            executable: executable.into(),
            args: Vec::new(),
            working_dir: None,
            required: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Declares a file that must exist before the engine is spawned.
    pub fn require(mut self, artifact: Artifact, path: impl Into<PathBuf>) -> Self {
        self.required.push((artifact, path.into()));
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }
}

/// Captured output of an engine that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Spawns engines with a fixed wall-clock bound. Does not retry.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    timeout: Duration,
}

impl ProcessInvoker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Verifies the executable and required artifacts without spawning.
    ///
    /// Returns the resolved executable path.
    pub fn check(&self, invocation: &Invocation) -> Result<PathBuf, VoiceError> {
        let executable = resolve_executable(&invocation.executable).ok_or_else(|| {
            VoiceError::ToolMissing {
                tool: invocation.tool.clone(),
                path: invocation.executable.clone(),
            }
        })?;

        for (artifact, path) in &invocation.required {
            if path.exists() {
                continue;
            }
            let tool = invocation.tool.clone();
            let path = path.clone();
            return Err(match artifact {
                Artifact::Model => VoiceError::ModelMissing { tool, path },
                Artifact::Config => VoiceError::ConfigMissing { tool, path },
            });
        }

        Ok(executable)
    }

    /// Runs the engine to completion.
    ///
    /// # Errors
    ///
    /// - [`VoiceError::ToolMissing`] / [`VoiceError::ModelMissing`] /
    ///   [`VoiceError::ConfigMissing`] when a precondition fails or the
    ///   process cannot be started.
    /// - [`VoiceError::ToolFailure`] on a non-zero exit.
    /// - [`VoiceError::ToolTimeout`] when the bound is exceeded.
    pub async fn invoke(&self, invocation: &Invocation) -> Result<InvokeOutput, VoiceError> {
        let tool = invocation.tool.as_str();
        let executable = match self.check(invocation) {
            Ok(path) => path,
            Err(e) => {
                warn!(tool, error = %e, "engine precondition failed, not spawning");
                return Err(e);
            }
        };

        let mut command = Command::new(&executable);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        debug!(tool, executable = ?executable, args = ?invocation.args, "spawning engine");

        let child = command.spawn().map_err(|e| {
            warn!(tool, error = %e, "failed to spawn engine");
            VoiceError::ToolMissing {
                tool: tool.to_string(),
                path: executable.clone(),
            }
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(
                    tool,
                    timeout_secs = self.timeout.as_secs_f32(),
                    "engine timed out, killing process"
                );
                VoiceError::ToolTimeout {
                    tool: tool.to_string(),
                    timeout: self.timeout,
                }
            })?
            .map_err(|e| VoiceError::ToolFailure {
                tool: tool.to_string(),
                exit_code: None,
                stderr: format!("failed to collect engine output: {}", e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let exit_code = output.status.code();
            warn!(tool, ?exit_code, stderr = %stderr.trim_end(), "engine exited with failure");
            return Err(VoiceError::ToolFailure {
                tool: tool.to_string(),
                exit_code,
                stderr: stderr.trim_end().to_string(),
            });
        }

        debug!(
            tool,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "engine finished"
        );
        if !stderr.trim().is_empty() {
            debug!(tool, stderr = %stderr.trim_end(), "engine stderr");
        }

        Ok(InvokeOutput { stdout, stderr })
    }
}

/// Resolves an executable path.
///
/// Paths with more than one component are canonicalized, so a relative path
/// keeps pointing at the same file when the child runs in another working
/// directory. Bare names are looked up on `PATH`. Returns `None` if no
/// executable file is found.
pub fn resolve_executable(executable: &Path) -> Option<PathBuf> {
    if executable.as_os_str().is_empty() {
        return None;
    }

    if executable.components().count() > 1 || executable.is_absolute() {
        return executable
            .canonicalize()
            .ok()
            .filter(|path| is_executable(path));
    }

    let search_path = std::env::var_os("PATH")?;
    std::env::split_paths(&search_path)
        .map(|dir| dir.join(executable))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
