use std::path::PathBuf;

use crate::exec::runner::VALGRIND_ERROR_EXIT_CODE;
use super::definition::Mode;


/// Launcher jar of the circuit-simulator CLI.
pub const CIRCUIT_LAUNCHER: &str = "logisim_cli.jar";

/// A fully resolved external command: what to run, with which arguments, and
/// where its stdin comes from.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
    pub stdin: StdinSource,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StdinSource {
    Inherit,
    File(PathBuf),
}

impl Mode {
    /// Target artifact for a suite: the suite name plus the mode's extension,
    /// unless an explicit override is configured.
    pub fn target_name(&self, suite_name: &str, force_filename: Option<&str>) -> String {
        if let Some(forced) = force_filename {
            return forced.to_owned();
        }
        match self {
            Mode::Exe => suite_name.to_owned(),
            Mode::Spim => format!("{}.s", suite_name),
            Mode::Logisim => format!("{}.circ", suite_name),
        }
    }
}

/// Mode-specific command construction for one test case.
///
/// In simulator mode the test case's first argument names the file fed to the
/// simulated program's stdin.
pub fn build_invocation(mode: Mode, target: &str, args: &[String]) -> Invocation {
    match mode {
        Mode::Exe => Invocation {
            command: format!("./{}", target),
            args: args.to_vec(),
            stdin: StdinSource::Inherit,
        },
        Mode::Spim => {
            let stdin = match args.first() {
                Some(input_file) => StdinSource::File(PathBuf::from(input_file)),
                None => {
                    eprintln!("Warning: simulator test case without an input file argument");
                    StdinSource::Inherit
                }
            };
            Invocation {
                command: "spim".to_owned(),
                args: vec!["-f".to_owned(), target.to_owned()],
                stdin,
            }
        }
        Mode::Logisim => {
            let mut launcher_args = vec![
                "-jar".to_owned(),
                CIRCUIT_LAUNCHER.to_owned(),
                "-f".to_owned(),
                target.to_owned(),
            ];
            launcher_args.extend_from_slice(args);
            Invocation {
                command: "java".to_owned(),
                args: launcher_args,
                stdin: StdinSource::Inherit,
            }
        }
    }
}

/// The memory-check wrapper: quiet, full leak detection, still-reachable
/// allocations reported, and a reserved exit code for violations.
pub fn build_valgrind_invocation(target: &str, args: &[String]) -> Invocation {
    let mut valgrind_args = vec![
        "-q".to_owned(),
        format!("--error-exitcode={}", VALGRIND_ERROR_EXIT_CODE),
        "--show-reachable=yes".to_owned(),
        "--leak-check=full".to_owned(),
        format!("./{}", target),
    ];
    valgrind_args.extend_from_slice(args);
    Invocation {
        command: "valgrind".to_owned(),
        args: valgrind_args,
        stdin: StdinSource::Inherit,
    }
}
