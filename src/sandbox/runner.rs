//! Interpreter process management.
//!
//! Each run gets its own child process, pipes and scratch directory, so no
//! output stream is shared between runs. Limits are enforced by the host:
//! - address space and CPU seconds via `setrlimit` before exec (unix)
//! - wall-clock deadline via `tokio::time::timeout`, killing the child
//! - captured output, read through a bounded buffer per stream

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::bootstrap::{NamespaceSpec, script};
use crate::config::SandboxSection;
use crate::errors::SandboxError;

/// Raw result of running code in an interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Exit status, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Something that can evaluate a code string and report its output.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Run already-validated code.
    async fn run(&self, code: &str) -> Result<RunOutput, SandboxError>;
}

/// Resource ceilings applied to each interpreter process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLimits {
    /// Wall-clock and CPU ceiling
    pub time: Duration,
    /// Address space ceiling in bytes, `None` for unlimited
    pub memory_bytes: Option<u64>,
    /// Per-stream capture ceiling in bytes
    pub max_output_bytes: usize,
}

impl ProcessLimits {
    pub fn from_config(section: &SandboxSection) -> Self {
        Self {
            time: Duration::from_secs(section.max_execution_time.max(1)),
            memory_bytes: (section.max_memory_mb > 0)
                .then(|| section.max_memory_mb.saturating_mul(1024 * 1024)),
            max_output_bytes: section.max_output_bytes,
        }
    }
}

/// Runs Python code through the sandbox bootstrap in a fresh `python -I` process.
#[derive(Debug, Clone)]
pub struct PythonRunner {
    interpreter: String,
    namespace: NamespaceSpec,
    limits: ProcessLimits,
}

impl PythonRunner {
    pub fn from_config(section: &SandboxSection) -> Self {
        Self {
            interpreter: section.interpreter.clone(),
            namespace: NamespaceSpec::from_config(section),
            limits: ProcessLimits::from_config(section),
        }
    }

    fn command(&self, scratch: &Path, spec_json: &str) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-I")
            .arg("-c")
            .arg(script())
            .arg(spec_json)
            .current_dir(scratch)
            .env_clear()
            .env("PATH", std::env::var_os("PATH").unwrap_or_default())
            .env("HOME", scratch)
            .env("MPLBACKEND", "Agg")
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            let limits = self.limits;
            // SAFETY: the closure only issues setrlimit syscalls, which are
            // async-signal-safe and allocate nothing.
            unsafe {
                cmd.pre_exec(move || apply_rlimits(&limits));
            }
        }

        cmd
    }
}

#[async_trait]
impl CodeRunner for PythonRunner {
    fn name(&self) -> &str {
        "python"
    }

    async fn run(&self, code: &str) -> Result<RunOutput, SandboxError> {
        let scratch = tempfile::Builder::new()
            .prefix("forgechat-run-")
            .tempdir()?;
        let spec_json = self
            .namespace
            .to_json()
            .map_err(|e| SandboxError::Io(std::io::Error::other(e)))?;

        debug!(
            interpreter = %self.interpreter,
            timeout_secs = self.limits.time.as_secs(),
            code_len = code.len(),
            "starting sandboxed run"
        );

        let mut child = self
            .command(scratch.path(), &spec_json)
            .spawn()
            .map_err(|source| SandboxError::SpawnFailed {
                interpreter: self.interpreter.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(code.as_bytes()).await?;
            // stdin is dropped here, closing the pipe
        }

        let max = self.limits.max_output_bytes;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let finished = async {
            let (stdout, stderr, status) =
                tokio::join!(capture(stdout, max), capture(stderr, max), child.wait());
            Ok::<_, std::io::Error>((stdout?, stderr?, status?))
        };

        let (stdout, stderr, status) = match timeout(self.limits.time, finished).await {
            Ok(result) => result?,
            Err(_) => {
                // kill_on_drop reaps the child once it goes out of scope.
                return Err(SandboxError::Timeout {
                    secs: self.limits.time.as_secs(),
                });
            }
        };

        let run = RunOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        };

        debug!(exit_code = ?run.exit_code, stdout_len = run.stdout.len(), "sandboxed run finished");
        Ok(run)
    }
}

/// Read a child stream, keeping at most `max` bytes in memory.
///
/// Anything past the cap is drained and discarded so the child never blocks
/// on a full pipe.
async fn capture<R>(stream: Option<R>, max: usize) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return Ok(String::new());
    };

    let mut bytes = Vec::new();
    (&mut stream)
        .take(max as u64 + 1)
        .read_to_end(&mut bytes)
        .await?;
    if bytes.len() > max {
        let discarded = tokio::io::copy(&mut stream, &mut tokio::io::sink()).await?;
        debug!(kept = max, discarded = discarded + 1, "output over capture limit");
    }
    Ok(capped(&bytes, max))
}

/// Decode captured bytes, truncating to `max` bytes with a marker.
fn capped(bytes: &[u8], max: usize) -> String {
    if bytes.len() <= max {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let mut text = String::from_utf8_lossy(&bytes[..max]).into_owned();
    text.push_str(&format!("\n[output truncated at {} bytes]\n", max));
    text
}

#[cfg(unix)]
fn apply_rlimits(limits: &ProcessLimits) -> std::io::Result<()> {
    use nix::sys::resource::{Resource, setrlimit};

    // CPU ceiling sits just above the wall-clock deadline so the deadline fires first.
    let cpu_secs = limits.time.as_secs().max(1) + 1;
    setrlimit(Resource::RLIMIT_CPU, cpu_secs, cpu_secs + 1)?;
    setrlimit(Resource::RLIMIT_CORE, 0, 0)?;
    setrlimit(Resource::RLIMIT_NOFILE, 64, 64)?;
    if let Some(bytes) = limits.memory_bytes {
        setrlimit(Resource::RLIMIT_AS, bytes, bytes)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Whether a `python3` interpreter can be started on this machine.
    pub(crate) fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn runner() -> PythonRunner {
        PythonRunner::from_config(&SandboxSection::default())
    }

    #[test]
    fn test_limits_from_config() {
        let limits = ProcessLimits::from_config(&SandboxSection::default());
        assert_eq!(limits.time, Duration::from_secs(15));
        assert_eq!(limits.memory_bytes, Some(150 * 1024 * 1024));
        assert_eq!(limits.max_output_bytes, 1_000_000);
    }

    #[test]
    fn test_zero_memory_disables_limit() {
        let section = SandboxSection {
            max_memory_mb: 0,
            ..Default::default()
        };
        assert_eq!(ProcessLimits::from_config(&section).memory_bytes, None);
    }

    #[test]
    fn test_capped_output() {
        assert_eq!(capped(b"short", 10), "short");
        let text = capped(b"0123456789abcdef", 10);
        assert!(text.starts_with("0123456789\n"));
        assert!(text.contains("truncated at 10 bytes"));
    }

    #[tokio::test]
    async fn test_capture_keeps_only_the_cap() {
        // Ten megabytes in, a bounded buffer out; the rest is drained.
        let flood = tokio::io::repeat(b'x').take(10 * 1024 * 1024);
        let text = capture(Some(flood), 1000).await.unwrap();
        assert!(text.starts_with(&"x".repeat(1000)));
        assert!(text.len() < 1100);
        assert!(text.contains("truncated at 1000 bytes"));
    }

    #[tokio::test]
    async fn test_capture_short_stream_untouched() {
        let text = capture(Some(&b"hello\n"[..]), 1000).await.unwrap();
        assert_eq!(text, "hello\n");
        assert_eq!(capture(None::<&[u8]>, 10).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_python_flood_is_capped() {
        if !python_available() {
            return;
        }
        let section = SandboxSection {
            max_output_bytes: 1000,
            ..Default::default()
        };
        let out = PythonRunner::from_config(&section)
            .run("for i in range(200):\n    print('x' * 100000)")
            .await
            .unwrap();
        assert!(out.success());
        assert!(out.stdout.len() < 1100);
        assert!(out.stdout.contains("truncated at 1000 bytes"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_python_memory_limit_applies() {
        if !python_available() {
            return;
        }
        let out = runner().run("x = 'x' * 400_000_000\nprint(len(x))").await.unwrap();
        assert!(!out.success());
        assert!(out.stderr.contains("MemoryError"));
    }

    #[tokio::test]
    async fn test_python_private_module_attributes_hidden() {
        if !python_available() {
            return;
        }
        let out = runner()
            .run("import random\nprint(random._os.listdir('/'))")
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(crate::sandbox::bootstrap::FAULT_EXIT_CODE));
        assert!(out.stderr.contains("AttributeError"));
        assert_eq!(out.stdout, "");
    }

    #[tokio::test]
    async fn test_python_disallowed_submodules_hidden() {
        if !python_available() {
            return;
        }
        let code = "import re\ntry:\n    re.enum\n    print('visible')\nexcept Exception:\n    print('hidden')\nprint(re.sub('a', 'b', 'aa'))";
        let out = runner().run(code).await.unwrap();
        assert!(out.success(), "{}", out.stderr);
        assert_eq!(out.stdout, "hidden\nbb\n");
    }

    #[tokio::test]
    async fn test_python_allowed_submodule_reachable() {
        if !python_available() {
            return;
        }
        let out = runner()
            .run("from json import decoder\nprint(decoder.JSONDecodeError.__name__)")
            .await
            .unwrap();
        assert_eq!(out.stdout, "JSONDecodeError\n");
    }

    #[tokio::test]
    async fn test_python_prints() {
        if !python_available() {
            return;
        }
        let out = runner().run("print('hello')").await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "");
    }

    #[tokio::test]
    async fn test_python_allowed_import() {
        if !python_available() {
            return;
        }
        let out = runner().run("import math\nprint(math.sqrt(16))").await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "4.0\n");
    }

    #[tokio::test]
    async fn test_python_module_bound_without_import() {
        if !python_available() {
            return;
        }
        let out = runner().run("print(math.floor(2.7))").await.unwrap();
        assert_eq!(out.stdout, "2\n");
    }

    #[tokio::test]
    async fn test_python_disallowed_import_faults() {
        if !python_available() {
            return;
        }
        let out = runner().run("import socket").await.unwrap();
        assert_eq!(out.exit_code, Some(crate::sandbox::bootstrap::FAULT_EXIT_CODE));
        assert!(out.stderr.contains("not available in the sandbox"));
    }

    #[tokio::test]
    async fn test_python_builtins_are_restricted() {
        if !python_available() {
            return;
        }
        let out = runner().run("print(open)").await.unwrap();
        assert!(!out.success());
        assert!(out.stderr.contains("NameError"));
    }

    #[tokio::test]
    async fn test_python_timeout_kills_process() {
        if !python_available() {
            return;
        }
        let section = SandboxSection {
            max_execution_time: 1,
            ..Default::default()
        };
        let err = PythonRunner::from_config(&section)
            .run("while True:\n    pass")
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Timeout { secs: 1 }));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_failure() {
        let section = SandboxSection {
            interpreter: "forgechat-no-such-python".to_string(),
            ..Default::default()
        };
        let err = PythonRunner::from_config(&section)
            .run("print(1)")
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::SpawnFailed { .. }));
    }
}
