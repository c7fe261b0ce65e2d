//! `std::process::Command`-backed [`ProcessRunner`]. Timeouts are enforced
//! by a watchdog thread communicating over `std::sync::mpsc`, since the
//! pipeline is sequential and carries no async runtime.

use scout_core::vcs::{ProcessOutput, ProcessRunner, TimedOutcome};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

/// Map a finished child's exit status to scout's convention: a normal exit
/// code where available, or `128 + signal` (the shell convention, matching
/// spec.md's exit-137-means-SIGKILL example) when the process was killed by
/// a signal rather than exiting on its own.
fn exit_status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

pub struct SubprocessRunner;

impl SubprocessRunner {
    pub fn new() -> Self {
        Self
    }

    fn build_command(program: &str, args: &[&str], cwd: Option<&Path>, env: &[(&str, &str)]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        for (k, v) in env {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for SubprocessRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        env: &[(&str, &str)],
    ) -> std::io::Result<ProcessOutput> {
        let output = Self::build_command(program, args, cwd, env).output()?;
        Ok(ProcessOutput {
            status: exit_status_code(output.status),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Spawns `program`, then blocks the calling thread on a bounded
    /// `mpsc::recv_timeout` while a watchdog thread waits on the child.
    /// The `Child` is shared behind a mutex so that on timeout the calling
    /// thread can kill it directly; the watchdog thread's `wait()` then
    /// completes on the now-dead process and its sender drops silently.
    fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        env: &[(&str, &str)],
        timeout: Duration,
    ) -> std::io::Result<TimedOutcome> {
        let mut child = Self::build_command(program, args, cwd, env).spawn()?;
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let shared: Arc<Mutex<Child>> = Arc::new(Mutex::new(child));
        let watchdog_handle = Arc::clone(&shared);
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            if let Some(mut pipe) = stdout_pipe {
                let _ = pipe.read_to_end(&mut stdout);
            }
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut stderr);
            }
            let status = watchdog_handle.lock().unwrap().wait();
            let _ = tx.send((status, stdout, stderr));
        });

        match rx.recv_timeout(timeout) {
            Ok((Ok(status), stdout, stderr)) => Ok(TimedOutcome::Completed(ProcessOutput {
                status: exit_status_code(status),
                stdout,
                stderr,
            })),
            Ok((Err(e), _, _)) => Err(e),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let _ = shared.lock().unwrap().kill();
                Ok(TimedOutcome::TimedOut)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(std::io::Error::other("subprocess watchdog channel disconnected"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_captures_exit_code_and_stdout() {
        let runner = SubprocessRunner::new();
        let out = runner.run("echo", &["hello"], None, &[]).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout_str().trim(), "hello");
    }

    #[test]
    fn run_with_timeout_completes_fast_commands() {
        let runner = SubprocessRunner::new();
        let outcome = runner
            .run_with_timeout("echo", &["fast"], None, &[], Duration::from_secs(5))
            .unwrap();
        match outcome {
            TimedOutcome::Completed(out) => assert!(out.success()),
            TimedOutcome::TimedOut => panic!("echo should not time out"),
        }
    }

    #[test]
    fn run_with_timeout_reports_timeout_for_slow_commands() {
        let runner = SubprocessRunner::new();
        let outcome = runner
            .run_with_timeout("sleep", &["5"], None, &[], Duration::from_millis(100))
            .unwrap();
        assert!(matches!(outcome, TimedOutcome::TimedOut));
    }

    #[test]
    fn signal_killed_process_reports_128_plus_signal() {
        let runner = SubprocessRunner::new();
        // `sh -c 'kill -9 $$'` sends SIGKILL to itself.
        let out = runner.run("sh", &["-c", "kill -9 $$"], None, &[]).unwrap();
        assert_eq!(out.status, 128 + 9);
    }
}
