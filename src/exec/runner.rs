use std::fs::File;
use std::path::Path;
use std::time::Duration;

use subprocess::{Exec, ExitStatus, NullFile, Popen, Redirection};

use crate::suite::target::{Invocation, StdinSource};


/// Wall-clock limit for a single external process invocation.
pub const TEST_CASE_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit code valgrind is told to reserve for memory-safety violations.
pub const VALGRIND_ERROR_EXIT_CODE: i32 = 88;

const KILL_GRACE: Duration = Duration::from_secs(2);
const SIGSEGV: u8 = 11;

/// Outcome of one external process invocation, consumed uniformly by the
/// scoring logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecStatus {
    Exited(i32),
    Signaled(u8),
    TimedOut,
    LaunchFailed,
}

impl ExecStatus {
    pub fn exited_nonzero(&self) -> bool {
        match self {
            ExecStatus::Exited(0) => false,
            _ => true,
        }
    }

    pub fn is_segfault(&self) -> bool {
        match self {
            ExecStatus::Signaled(signal) => *signal == SIGSEGV,
            _ => false,
        }
    }
}

/// Where the captured output of a process run goes.
pub enum OutputTarget<'a> {
    /// stdout and stderr merged into the given file.
    File(&'a Path),
    /// stdout discarded, stderr left on the console.
    Discard,
}

/// Runs an external command with a bounded wall-clock time.
///
/// A submission that cannot be launched at all must not bring down the
/// grading run, so every failure on the way to a started process collapses
/// into `ExecStatus::LaunchFailed`.
pub fn run_process(invocation: &Invocation, output: OutputTarget) -> ExecStatus {
    let mut exec = Exec::cmd(&invocation.command).args(&invocation.args);

    exec = match output {
        OutputTarget::File(path) => {
            let capture = match File::create(path) {
                Ok(file) => file,
                Err(err) => {
                    eprintln!("Warning: cannot create output file {}: {}", path.display(), err);
                    return ExecStatus::LaunchFailed;
                }
            };
            exec.stdout(Redirection::File(capture)).stderr(Redirection::Merge)
        }
        OutputTarget::Discard => exec.stdout(NullFile),
    };

    if let StdinSource::File(path) = &invocation.stdin {
        match File::open(path) {
            Ok(file) => {
                exec = exec.stdin(Redirection::File(file));
            }
            Err(err) => {
                eprintln!("Warning: cannot open stdin file {}: {}", path.display(), err);
                return ExecStatus::LaunchFailed;
            }
        }
    }

    let mut child = match exec.popen() {
        Ok(child) => child,
        Err(_) => return ExecStatus::LaunchFailed,
    };

    match child.wait_timeout(TEST_CASE_TIMEOUT) {
        Ok(Some(status)) => classify(status),
        Ok(None) => {
            kill_stubborn(&mut child);
            ExecStatus::TimedOut
        }
        Err(_) => ExecStatus::LaunchFailed,
    }
}

fn classify(status: ExitStatus) -> ExecStatus {
    match status {
        ExitStatus::Exited(code) => ExecStatus::Exited(code as i32),
        ExitStatus::Signaled(signal) => ExecStatus::Signaled(signal),
        ExitStatus::Other(code) => ExecStatus::Exited(code),
        ExitStatus::Undetermined => ExecStatus::LaunchFailed,
    }
}

fn kill_stubborn(child: &mut Popen) {
    if child.kill().is_err() {
        eprintln!("Warning: could not kill timed out process!");
        return;
    }
    match child.wait_timeout(KILL_GRACE) {
        Ok(Some(_)) => {}
        _ => eprintln!("Warning: process is still running after kill! Moving on regardless..."),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(command: &str, args: Vec<String>) -> Invocation {
        Invocation {
            command: command.to_owned(),
            args,
            stdin: StdinSource::Inherit,
        }
    }

    #[test]
    #[cfg(unix)]
    fn successful_exit_is_classified_as_zero() {
        let status = run_process(&invocation("true", vec![]), OutputTarget::Discard);
        assert_eq!(status, ExecStatus::Exited(0));
        assert!(!status.exited_nonzero());
        assert!(!status.is_segfault());
    }

    #[test]
    #[cfg(unix)]
    fn failing_exit_keeps_its_code() {
        let status = run_process(&invocation("false", vec![]), OutputTarget::Discard);
        assert_eq!(status, ExecStatus::Exited(1));
        assert!(status.exited_nonzero());
    }

    #[test]
    fn missing_binary_reports_launch_failure() {
        let status = run_process(
            &invocation("./definitely-not-a-real-binary", vec![]),
            OutputTarget::Discard,
        );
        assert_eq!(status, ExecStatus::LaunchFailed);
        assert!(status.exited_nonzero());
    }

    #[test]
    #[cfg(unix)]
    fn output_is_captured_into_the_target_file() {
        let path = std::env::temp_dir().join(format!("autograder-capture-{}.txt", std::process::id()));
        let status = run_process(
            &invocation("echo", vec!["hello".to_owned()]),
            OutputTarget::File(&path),
        );
        assert_eq!(status, ExecStatus::Exited(0));
        let captured = std::fs::read_to_string(&path).unwrap();
        assert_eq!(captured, "hello\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn stdin_source_is_redirected() {
        let dir = std::env::temp_dir();
        let in_path = dir.join(format!("autograder-stdin-{}.txt", std::process::id()));
        let out_path = dir.join(format!("autograder-stdout-{}.txt", std::process::id()));
        std::fs::write(&in_path, "piped through\n").unwrap();

        let inv = Invocation {
            command: "cat".to_owned(),
            args: vec![],
            stdin: StdinSource::File(in_path.clone()),
        };
        let status = run_process(&inv, OutputTarget::File(&out_path));
        assert_eq!(status, ExecStatus::Exited(0));
        assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "piped through\n");

        std::fs::remove_file(&in_path).unwrap();
        std::fs::remove_file(&out_path).unwrap();
    }

    #[test]
    fn missing_stdin_file_reports_launch_failure() {
        let inv = Invocation {
            command: "cat".to_owned(),
            args: vec![],
            stdin: StdinSource::File("no-such-input-file.txt".into()),
        };
        assert_eq!(run_process(&inv, OutputTarget::Discard), ExecStatus::LaunchFailed);
    }

    #[test]
    fn segfault_classification_only_matches_sigsegv() {
        assert!(ExecStatus::Signaled(11).is_segfault());
        assert!(!ExecStatus::Signaled(9).is_segfault());
        assert!(!ExecStatus::Exited(11).is_segfault());
        assert!(!ExecStatus::TimedOut.is_segfault());
    }
}
