//! External tool execution with streamed output.

use super::tool_detection::resolve_program;
use crate::packager::{error::ToolError, settings::ProgressSink};
use std::{
    collections::VecDeque,
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};

/// Number of trailing stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// A tool invocation: program, arguments, working directory and extra environment.
#[derive(Clone, Debug)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
    current_dir: PathBuf,
    envs: Vec<(OsString, OsString)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<OsString>, current_dir: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: current_dir.as_ref().to_path_buf(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Command line for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the command to completion.
    ///
    /// stdout and stderr are drained concurrently and forwarded line by line to
    /// `sink` and the debug log. A non-zero exit becomes [`ToolError::Failed`]
    /// carrying the last stderr lines. Exceeding `timeout` kills the process.
    pub async fn run(&self, sink: Option<&ProgressSink>, timeout: Duration) -> Result<(), ToolError> {
        let program = resolve_program(&self.program)?;
        let command = self.display();
        log::info!("Running {command}");

        let mut child = Command::new(&program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .current_dir(&self.current_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = tokio::time::timeout(timeout, async {
            // Both streams must be drained before waiting, or a chatty tool can
            // block on a full pipe.
            let (_, stderr_tail) = tokio::join!(
                forward_lines(stdout, sink, 0),
                forward_lines(stderr, sink, STDERR_TAIL_LINES),
            );
            (child.wait().await, stderr_tail)
        })
        .await;

        match outcome {
            Ok((Ok(status), _)) if status.success() => {
                log::debug!("{command} finished successfully");
                Ok(())
            }
            Ok((Ok(status), stderr_tail)) => Err(ToolError::failed(command, status, stderr_tail)),
            Ok((Err(source), _)) => Err(ToolError::Spawn { command, source }),
            Err(_elapsed) => {
                log::warn!("{command} timed out after {}s, terminating", timeout.as_secs());
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill {command}: {e}");
                }
                Err(ToolError::TimedOut {
                    command,
                    seconds: timeout.as_secs(),
                })
            }
        }
    }
}

/// Forwards each line of `stream` to the sink and log; returns the last `keep` lines.
///
/// Lines are decoded lossily so output in a non-UTF-8 locale never stops the
/// drain before EOF.
async fn forward_lines<R>(stream: Option<R>, sink: Option<&ProgressSink>, keep: usize) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Vec::new();
    };
    let mut segments = BufReader::new(stream).split(b'\n');
    let mut tail = VecDeque::with_capacity(keep);

    loop {
        let raw = match segments.next_segment().await {
            Ok(Some(raw)) => raw,
            Ok(None) => break,
            Err(e) => {
                log::warn!("Failed to read tool output: {e}");
                break;
            }
        };
        let line = String::from_utf8_lossy(raw.strip_suffix(b"\r").unwrap_or(&raw)).into_owned();
        log::debug!("  {line}");
        if let Some(sink) = sink {
            sink.write_line(&line);
        }
        if keep > 0 {
            if tail.len() == keep {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }

    tail.into()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::{
        io::Write,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn forwards_output_to_sink() {
        let capture = Capture::default();
        let sink = ProgressSink::new(capture.clone());
        let dir = tempfile::tempdir().unwrap();

        ToolCommand::new("sh", dir.path())
            .args(["-c", "echo out-line; echo err-line 1>&2"])
            .run(Some(&sink), Duration::from_secs(30))
            .await
            .unwrap();

        let text = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("out-line"));
        assert!(text.contains("err-line"));
    }

    #[tokio::test]
    async fn non_zero_exit_keeps_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let err = ToolCommand::new("sh", dir.path())
            .args(["-c", "echo 'E404 left-padd not found' 1>&2; exit 3"])
            .run(None, Duration::from_secs(30))
            .await
            .unwrap_err();

        match err {
            ToolError::Failed { code, stderr_tail, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr_tail, vec!["E404 left-padd not found".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn runs_in_working_directory_with_env() {
        let dir = tempfile::tempdir().unwrap();
        ToolCommand::new("sh", dir.path())
            .args(["-c", "printf %s \"$MARK\" > marker.txt"])
            .env("MARK", "staged")
            .run(None, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("marker.txt")).unwrap(), "staged");
    }

    #[tokio::test]
    async fn invalid_utf8_output_is_drained_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let script = "printf 'caf\\351\\n'; sleep 0.2; \
                      i=0; while [ $i -lt 2000 ]; do echo \"line $i\"; i=$((i+1)); done; \
                      printf 'bad \\377 byte\\n' 1>&2; \
                      echo done > marker.txt";
        let err = ToolCommand::new("sh", dir.path())
            .args(["-c", &format!("{script}; exit 4")])
            .run(None, Duration::from_secs(30))
            .await
            .unwrap_err();

        assert_eq!(std::fs::read_to_string(dir.path().join("marker.txt")).unwrap(), "done\n");
        match err {
            ToolError::Failed { code, stderr_tail, .. } => {
                assert_eq!(code, Some(4));
                assert_eq!(stderr_tail, vec!["bad \u{FFFD} byte".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let err = ToolCommand::new("sh", dir.path())
            .args(["-c", "sleep 5"])
            .run(None, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::TimedOut { .. }));
    }
}
