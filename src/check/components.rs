use std::fs::read_to_string;
use std::path::Path;

use thiserror::Error;

use crate::suite::definition::ComponentPenalty;


#[derive(Debug, Error)]
pub enum ComponentCheckError {
    #[error("cannot read circuit file {file}: {source}")]
    Unreadable {
        file: String,
        source: std::io::Error,
    },
    #[error("malformed circuit file {file}: {source}")]
    Malformed {
        file: String,
        source: roxmltree::Error,
    },
}

/// Disallowed components found in a circuit file and the penalty they carry.
#[derive(Clone, Debug)]
pub struct ComponentUsage {
    pub components_found: Vec<String>,
    pub penalty: f64,
}

impl ComponentUsage {
    pub fn unrestricted() -> Self {
        ComponentUsage {
            components_found: vec![],
            penalty: 1.0,
        }
    }
}

/// Scans a circuit description for disallowed components.
///
/// A missing file means there is nothing to check and is never penalized.
/// Every component of every circuit element is matched against the penalty
/// table; duplicates are recorded in encounter order, and the most severe
/// matched penalty governs. A file that exists but does not parse is a
/// defect the caller has to see, not an empty result.
pub fn check_circuit(file: &Path, penalty_table: &[ComponentPenalty]) -> Result<ComponentUsage, ComponentCheckError> {
    if !file.exists() {
        return Ok(ComponentUsage::unrestricted());
    }

    let content = read_to_string(file).map_err(|source| ComponentCheckError::Unreadable {
        file: file.display().to_string(),
        source,
    })?;
    let document = roxmltree::Document::parse(&content).map_err(|source| ComponentCheckError::Malformed {
        file: file.display().to_string(),
        source,
    })?;

    let mut components_found = Vec::new();
    let mut penalty = 1.0f64;

    for circuit in document.root_element().children().filter(|node| node.has_tag_name("circuit")) {
        for component in circuit.children().filter(|node| node.has_tag_name("comp")) {
            let name = match component.attribute("name") {
                Some(name) => name,
                None => continue,
            };
            for group in penalty_table {
                if group.components.iter().any(|disallowed| disallowed == name) {
                    components_found.push(name.to_owned());
                    penalty = penalty.min(group.penalty);
                }
            }
        }
    }

    Ok(ComponentUsage { components_found, penalty })
}
