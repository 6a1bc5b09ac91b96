use serde_json::json;


/// Byte ceiling past which a diff or actual-output payload gets truncated.
pub const MAX_PAYLOAD_BYTES: usize = 1_000_000;

/// Prefix kept when a payload exceeds the ceiling.
pub const TRUNCATED_PREFIX_CHARS: usize = 5000;

/// Final, exportable result of one test case.
#[derive(Clone, Debug)]
pub struct ReportRecord {
    pub name: String,
    pub score: f64,
    pub max_score: f64,
    pub annotations: Vec<String>,
    pub visibility: String,
    diff: String,
    diff_truncated: bool,
    actual: String,
    actual_truncated: bool,
}

impl ReportRecord {
    pub fn new(
        name: String,
        score: f64,
        max_score: f64,
        annotations: Vec<String>,
        diff: String,
        actual: String,
        visibility: String,
    ) -> Self {
        let (diff, diff_truncated) = truncate_payload(diff);
        let (actual, actual_truncated) = truncate_payload(actual);
        ReportRecord {
            name,
            score,
            max_score,
            annotations,
            visibility,
            diff,
            diff_truncated,
            actual,
            actual_truncated,
        }
    }

    /// The assembled human-readable message: penalty annotations, then the
    /// diff and captured output when the comparison found differences.
    pub fn output_text(&self) -> String {
        let mut output = String::new();
        for annotation in &self.annotations {
            output.push_str(annotation);
            output.push('\n');
        }

        if !self.diff.is_empty() {
            output.push_str("The actual output did not match the expected output!\n");
            output.push_str("\n###### DIFF ######\n");
            if self.diff_truncated {
                output.push_str("###### The diff output was truncated because it's larger than 1MB! ######\n");
                output.push_str("###### This is most likely due to an infinite loop! ######\n");
            }
            output.push_str(&self.diff);
            if self.actual_truncated {
                output.push_str("###### The actual output was truncated because it's larger than 1MB! ######\n");
                output.push_str("###### This is most likely due to an infinite loop! ######\n");
            }
            output.push_str("\n###### ACTUAL ######\n");
            output.push_str(&self.actual);
        }

        output
    }

    pub fn get_json_entry(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "score": self.score,
            "max_score": self.max_score,
            "output": self.output_text(),
            "visibility": self.visibility,
        })
    }
}

fn truncate_payload(payload: String) -> (String, bool) {
    if payload.len() > MAX_PAYLOAD_BYTES {
        (payload.chars().take(TRUNCATED_PREFIX_CHARS).collect(), true)
    } else {
        (payload, false)
    }
}
