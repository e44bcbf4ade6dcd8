//! Registration above a marker comment.

use super::{ensure_import, missing_registration, outcome, PyModule, WiringEdit, WiringOutcome, WiringStrategy};
use crate::error::{SpecError, SpecResult};

/// Marker comment placed in the application module by default.
pub const DEFAULT_ROUTER_MARKER: &str = "# crudgen: routers";

/// Inserts the registration on the line above a marker comment, at the
/// marker's indentation, so it also works inside an application factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerStrategy {
    marker: String,
}

impl MarkerStrategy {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().trim().to_string(),
        }
    }
}

impl Default for MarkerStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTER_MARKER)
    }
}

impl WiringStrategy for MarkerStrategy {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn apply(&self, content: &str, edit: &WiringEdit) -> SpecResult<WiringOutcome> {
        let mut module = PyModule::parse(content);

        if let Some(registration) = missing_registration(&module, edit) {
            let (line, indent) = module
                .marker_line(&self.marker)
                .ok_or_else(|| SpecError::anchor_not_found(&self.marker))?;
            module.insert(line, &indent, &registration.text);
        }
        ensure_import(&mut module, &edit.import);

        Ok(outcome(content, module))
    }
}
