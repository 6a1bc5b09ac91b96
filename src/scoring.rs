/// Multiplicative penalty factors, each in `[0, 1]` with `1.0` meaning no
/// penalty.
#[derive(Clone, Copy, Debug)]
pub struct PenaltyFactors {
    pub exit: f64,
    pub memory: f64,
    pub components: f64,
}

impl PenaltyFactors {
    pub fn none() -> Self {
        PenaltyFactors {
            exit: 1.0,
            memory: 1.0,
            components: 1.0,
        }
    }
}

/// Final score of a test case. A failed comparison zeroes the score outright;
/// penalties only ever reduce an earned score.
pub fn final_score(max_points: f64, passed: bool, factors: &PenaltyFactors) -> f64 {
    if !passed {
        return 0.0;
    }
    max_points * factors.exit * factors.memory * factors.components
}

/// Human-readable lines naming each penalty condition that fired.
pub fn penalty_annotations(
    exited_nonzero: bool,
    exit_penalty: f64,
    memory_error: bool,
    memory_penalty: f64,
    components_found: &[String],
    component_penalty: f64,
    is_segfault: bool,
) -> Vec<String> {
    let mut annotations = Vec::new();

    if exited_nonzero {
        annotations.push(format!("Exit status non zero! ({})", penalty_text(exit_penalty)));
    }
    if memory_error {
        annotations.push(format!("Valgrind memory error detected! ({})", penalty_text(memory_penalty)));
    }
    if !components_found.is_empty() {
        annotations.push(format!(
            "The following disallowed components were detected: {:?} ({})",
            components_found,
            penalty_text(component_penalty)
        ));
    }
    if is_segfault {
        annotations.push("Segfault detected!".to_owned());
    }

    annotations
}

fn penalty_text(factor: f64) -> String {
    if factor < 1.0 {
        format!("{}% penalty applied", (1.0 - factor) * 100.0)
    } else {
        "no penalty applied".to_owned()
    }
}
