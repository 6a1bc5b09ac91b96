use std::fs::{read_dir, read_to_string, remove_file, write};
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use thiserror::Error;

use crate::check::components::{check_circuit, ComponentCheckError, ComponentUsage};
use crate::exec::runner::{run_process, ExecStatus, OutputTarget, VALGRIND_ERROR_EXIT_CODE};
use crate::exec::sanitizer::sanitize_file;
use crate::report::ReportRecord;
use crate::scoring::{final_score, penalty_annotations, PenaltyFactors};
use crate::suite::definition::{GradingConfig, Mode, TestCase, TestSuite};
use crate::suite::target::{build_invocation, build_valgrind_invocation};


#[derive(Debug, Error)]
pub enum GraderError {
    #[error("config not found: {0}")]
    ConfigNotFound(String),
    #[error("failed parsing config: {0}")]
    ConfigParseError(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid suite provided: {0}")]
    InvalidSuite(String),
    #[error(transparent)]
    ComponentCheckError(#[from] ComponentCheckError),
    #[error("error generating report: {0}")]
    GenerationError(String),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Drives grading: owns the immutable configuration, iterates suites and test
/// cases, and folds every execution into a report record.
pub struct Grader {
    config: GradingConfig,
}

/// Accumulating state of one `run` invocation. Created fresh per run and
/// returned to the caller, never shared.
pub struct GradingRun {
    pub records: Vec<ReportRecord>,
    pub total_score: f64,
}

impl GradingRun {
    fn new() -> Self {
        GradingRun {
            records: vec![],
            total_score: 0.0,
        }
    }

    pub fn get_json_report(&self) -> Result<String, GraderError> {
        let entries: Vec<serde_json::Value> = self.records.iter().map(|record| record.get_json_entry()).collect();
        serde_json::to_string_pretty(&json!({
            "tests": entries,
            "total_score": self.total_score,
        }))
        .map_err(|err| GraderError::GenerationError(err.to_string()))
    }
}

/// Everything observed while executing one test case. Folded into a
/// `ReportRecord` right after and discarded.
struct RunResult {
    status: ExecStatus,
    memory_error: bool,
    passed: bool,
    diff: String,
    actual: String,
}

impl Grader {
    pub fn from_file(path: &str) -> Result<Self, GraderError> {
        let raw = read_to_string(path).map_err(|_| GraderError::ConfigNotFound(path.to_owned()))?;
        let config: GradingConfig =
            toml::from_str(&raw).map_err(|err| GraderError::ConfigParseError(err.to_string()))?;
        config.validate().map_err(GraderError::InvalidConfig)?;
        Ok(Grader { config })
    }

    /// Runs the selected suite, every suite (`ALL`), or only removes prior run
    /// artifacts (`CLEAN`). An unknown suite name fails before anything runs.
    pub fn run(&self, selector: &str) -> Result<GradingRun, GraderError> {
        let mut run = GradingRun::new();
        match selector {
            "CLEAN" => {
                self.clean()?;
            }
            "ALL" => {
                self.clean()?;
                for suite in &self.config.suites {
                    self.run_suite(suite, &mut run)?;
                }
            }
            name => {
                let suite = self
                    .config
                    .suites
                    .iter()
                    .find(|suite| suite.name == name)
                    .ok_or_else(|| GraderError::InvalidSuite(name.to_owned()))?;
                self.clean()?;
                self.run_suite(suite, &mut run)?;
            }
        }
        Ok(run)
    }

    fn run_suite(&self, suite: &TestSuite, run: &mut GradingRun) -> Result<(), GraderError> {
        println!("Running tests for {}...", suite.name);

        let usage = self.check_suite_components(suite)?;

        for (test_num, test) in suite.tests.iter().enumerate() {
            let (record, points) = self.run_test_case(suite, test, test_num, usage.as_ref())?;
            run.total_score += points;
            run.records.push(record);
        }

        println!("Done running tests for {}.\n", suite.name);
        Ok(())
    }

    /// The circuit inspection runs once per suite, not per test case; its
    /// result applies to every case of the suite.
    fn check_suite_components(&self, suite: &TestSuite) -> Result<Option<ComponentUsage>, GraderError> {
        if self.config.mode != Mode::Logisim {
            return Ok(None);
        }
        let table = match self
            .config
            .disallowed_components
            .as_ref()
            .and_then(|tables| tables.get(&suite.name))
        {
            Some(table) => table,
            None => return Ok(None),
        };
        let circuit_file = format!("{}.circ", suite.name);
        Ok(Some(check_circuit(Path::new(&circuit_file), table)?))
    }

    fn run_test_case(
        &self,
        suite: &TestSuite,
        test: &TestCase,
        test_num: usize,
        usage: Option<&ComponentUsage>,
    ) -> Result<(ReportRecord, f64), GraderError> {
        let result = self.execute_test(suite, test, test_num)?;

        let component_penalty = usage.map(|usage| usage.penalty).unwrap_or(1.0);
        let mut factors = PenaltyFactors::none();
        if result.status.exited_nonzero() {
            factors.exit = self.config.non_zero_exit_status_penalty;
        }
        if result.memory_error {
            factors.memory = self.config.memory_penalty;
        }
        factors.components = component_penalty;
        let max_points = test.points.unwrap_or(0.0);
        let score = final_score(max_points, result.passed, &factors);

        let components_found = usage.map(|usage| usage.components_found.as_slice()).unwrap_or(&[]);
        let annotations = penalty_annotations(
            result.status.exited_nonzero(),
            self.config.non_zero_exit_status_penalty,
            result.memory_error,
            self.config.memory_penalty,
            components_found,
            component_penalty,
            result.status.is_segfault(),
        );

        self.print_result_row(test, test_num, result.passed, result.status, result.memory_error, score, max_points);

        let record = ReportRecord::new(
            format!("{} test {}: {}", suite.name, test_num, test.desc),
            score,
            max_points,
            annotations,
            result.diff,
            result.actual,
            test.visibility.clone(),
        );
        Ok((record, score))
    }

    fn execute_test(&self, suite: &TestSuite, test: &TestCase, test_num: usize) -> Result<RunResult, GraderError> {
        let target = self
            .config
            .mode
            .target_name(&suite.name, self.config.force_suite_filename.as_deref());

        let test_dir = Path::new(&self.config.test_dir);
        let expected_path = test_dir.join(format!("{}_expected_{}.txt", suite.name, test_num));
        let actual_path = test_dir.join(format!("{}_actual_{}.txt", suite.name, test_num));
        let diff_path = test_dir.join(format!("{}_diff_{}.txt", suite.name, test_num));

        let invocation = build_invocation(self.config.mode, &target, &test.args);
        let status = run_process(&invocation, OutputTarget::File(&actual_path));

        if self.config.mode == Mode::Spim {
            if let Err(err) = sanitize_file(&actual_path) {
                eprintln!("Warning: failed sanitizing {}: {}", actual_path.display(), err);
            }
        }

        let expected = read_to_string(&expected_path).unwrap_or_default();
        let actual = read_to_string(&actual_path).unwrap_or_default();

        let comparison = test.diff.compare(&expected, &actual);
        write(&diff_path, &comparison.diff)?;
        let diff = read_to_string(&diff_path).unwrap_or_default();

        let mut memory_error = false;
        if test.valgrind {
            let valgrind = build_valgrind_invocation(&target, &test.args);
            memory_error = run_process(&valgrind, OutputTarget::Discard) == ExecStatus::Exited(VALGRIND_ERROR_EXIT_CODE);
        }

        Ok(RunResult {
            status,
            memory_error,
            passed: comparison.passed,
            diff,
            actual,
        })
    }

    fn print_result_row(
        &self,
        test: &TestCase,
        test_num: usize,
        passed: bool,
        status: ExecStatus,
        memory_error: bool,
        score: f64,
        max_points: f64,
    ) {
        let verdict = if passed { "Pass" } else { "Failed" };
        let mut errors = String::new();
        if status.exited_nonzero() {
            errors.push_str("exit_status_non_zero  ");
        }
        if memory_error {
            errors.push_str("valgrind_memory_error");
        }

        let test_id = format!("Test {}", test_num);
        let description = format!("({}):", test.desc);
        match test.points {
            Some(_) => {
                let score_text = format!("{:.2}/{:.2}", score, max_points);
                println!("{:<10} {:<50} {:<20} {:<15} {:<45}", test_id, description, verdict, score_text, errors);
            }
            None => {
                println!("{:<10} {:<50} {:<20} {:<45}", test_id, description, verdict, errors);
            }
        }
    }

    /// Removes actual-output and diff files of prior runs (including sanitizer
    /// backups) across all suites. Expected-output files are never touched.
    pub fn clean(&self) -> Result<(), GraderError> {
        lazy_static! {
            static ref RUN_ARTIFACT: Regex = Regex::new(r"_(actual|diff)_\d+\.txt").unwrap();
        }

        let entries = match read_dir(&self.config.test_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            if RUN_ARTIFACT.is_match(&file_name.to_string_lossy()) {
                if let Err(err) = remove_file(entry.path()) {
                    eprintln!("Warning: could not remove {}: {}", entry.path().display(), err);
                }
            }
        }
        Ok(())
    }
}
