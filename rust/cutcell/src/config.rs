// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Options for building cut-cell graphs.

use std::path::PathBuf;

/// Default budget of sheet-growing steps per element.
pub const DEFAULT_MAX_SEARCH_STEPS: usize = 100_000;

/// Tuning and diagnostics options for [`crate::facet_graph::create`].
///
/// Gmsh dumps are opt-in: the default never writes files. Enable them with
/// [`GraphOptions::with_dumps`] or `CUTCELL_DUMP_ON_FAILURE=1`. When enabled,
/// a dump is written whenever an element fails with too few facets per cell,
/// an unclosed facet graph, or a boundary that line pruning removed entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOptions {
    /// Write Gmsh dumps when volume-cell creation fails. Off by default.
    pub dump_on_failure: bool,
    /// Directory the dumps are written to.
    pub dump_dir: PathBuf,
    /// Upper bound on cycle search steps before giving up.
    pub max_search_steps: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            dump_on_failure: false,
            dump_dir: PathBuf::from("."),
            max_search_steps: DEFAULT_MAX_SEARCH_STEPS,
        }
    }
}

impl GraphOptions {
    /// Load options from environment variables, falling back to defaults.
    ///
    /// - `CUTCELL_DUMP_ON_FAILURE`: `1`/`true`/`yes` enables dumps
    /// - `CUTCELL_DUMP_DIR`: dump directory
    /// - `CUTCELL_MAX_SEARCH_STEPS`: search step budget
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            dump_on_failure: std::env::var("CUTCELL_DUMP_ON_FAILURE")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.dump_on_failure),
            dump_dir: std::env::var("CUTCELL_DUMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dump_dir),
            max_search_steps: std::env::var("CUTCELL_MAX_SEARCH_STEPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_search_steps),
        }
    }

    /// Enables failure dumps into `dir`.
    pub fn with_dumps(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_on_failure = true;
        self.dump_dir = dir.into();
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = GraphOptions::default();
        assert!(!options.dump_on_failure);
        assert_eq!(options.max_search_steps, DEFAULT_MAX_SEARCH_STEPS);
    }

    #[test]
    fn flags() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }

    #[test]
    fn with_dumps_enables_dumping() {
        let options = GraphOptions::default().with_dumps("/tmp/cut");
        assert!(options.dump_on_failure);
        assert_eq!(options.dump_dir, PathBuf::from("/tmp/cut"));
    }
}
