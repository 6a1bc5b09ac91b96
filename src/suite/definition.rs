use std::collections::HashMap;
use std::fmt;

use serde_derive::Deserialize;

use crate::check::compare::DiffMode;


/// Grading configuration, read once from a TOML file and never mutated.
#[derive(Clone, Debug, Deserialize)]
pub struct GradingConfig {
    pub test_dir: String,
    pub mode: Mode,
    pub force_suite_filename: Option<String>,
    pub non_zero_exit_status_penalty: f64,
    pub memory_penalty: f64,
    /// Disallowed-component penalty groups, keyed by suite name. Absent means
    /// no restrictions.
    pub disallowed_components: Option<HashMap<String, Vec<ComponentPenalty>>>,
    pub suites: Vec<TestSuite>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Exe,
    Spim,
    Logisim,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Exe => write!(f, "exe"),
            Mode::Spim => write!(f, "spim"),
            Mode::Logisim => write!(f, "logisim"),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TestSuite {
    pub name: String,
    pub tests: Vec<TestCase>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TestCase {
    pub desc: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub valgrind: bool,
    pub diff: DiffMode,
    /// Absent means the test is pass/fail only and no score is displayed.
    pub points: Option<f64>,
    #[serde(default = "default_visibility")]
    pub visibility: String,
}

fn default_visibility() -> String {
    "visible".to_owned()
}

#[derive(Clone, Debug, Deserialize)]
pub struct ComponentPenalty {
    pub components: Vec<String>,
    pub penalty: f64,
}

impl GradingConfig {
    /// Rejects configurations that would break the scoring invariants.
    pub fn validate(&self) -> Result<(), String> {
        check_factor("non_zero_exit_status_penalty", self.non_zero_exit_status_penalty)?;
        check_factor("memory_penalty", self.memory_penalty)?;

        if let Some(tables) = &self.disallowed_components {
            for (suite, groups) in tables {
                for group in groups {
                    check_factor(&format!("disallowed_components penalty for suite '{}'", suite), group.penalty)?;
                }
            }
        }

        for suite in &self.suites {
            for (test_num, test) in suite.tests.iter().enumerate() {
                if let Some(points) = test.points {
                    if points < 0.0 {
                        return Err(format!(
                            "suite '{}' test {} has negative points: {}",
                            suite.name, test_num, points
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

fn check_factor(name: &str, factor: f64) -> Result<(), String> {
    if factor < 0.0 || factor > 1.0 {
        return Err(format!("{} must lie in [0, 1], got {}", name, factor));
    }
    Ok(())
}
