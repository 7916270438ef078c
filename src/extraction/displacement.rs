// Table-displacement block located by a fixed line window
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::DisplacementLayout;
use crate::types::NOT_FOUND;

pub const AXES: [&str; 3] = ["LATERAL", "VERTICAL", "LONGITUDINAL"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDisplacement {
    pub lateral: String,
    pub vertical: String,
    pub longitudinal: String,
    /// False when the placeholder array was substituted
    pub located: bool,
}

impl TableDisplacement {
    pub fn placeholder() -> Self {
        Self {
            lateral: NOT_FOUND.to_string(),
            vertical: NOT_FOUND.to_string(),
            longitudinal: NOT_FOUND.to_string(),
            located: false,
        }
    }

    pub fn values(&self) -> [&str; 3] {
        [&self.lateral, &self.vertical, &self.longitudinal]
    }
}

pub fn locate_displacement(text: &str, layout: &DisplacementLayout) -> TableDisplacement {
    let lines: Vec<&str> = text.split('\n').collect();
    let start = layout.first_line;

    match lines.get(start..start.saturating_add(AXES.len())) {
        Some([lateral, vertical, longitudinal]) => {
            debug!(first_line = start, "displacement window located");
            TableDisplacement {
                lateral: lateral.trim().to_string(),
                vertical: vertical.trim().to_string(),
                longitudinal: longitudinal.trim().to_string(),
                located: true,
            }
        }
        _ => {
            warn!(
                first_line = start,
                available = lines.len(),
                "text too short for displacement window, using placeholders"
            );
            TableDisplacement::placeholder()
        }
    }
}
