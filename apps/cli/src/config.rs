// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI configuration loaded from environment variables.

use cutcell::GraphOptions;

/// Runtime configuration of the command line driver.
#[derive(Debug, Clone)]
pub struct Config {
    /// `tracing` filter directive.
    pub log_filter: String,
    /// Emit log lines as JSON instead of human readable text.
    pub json_logs: bool,
    /// Pretty-print the JSON report.
    pub pretty: bool,
    /// Options handed to every graph.
    pub graph: GraphOptions,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `RUST_LOG` sets the filter, `CUTCELL_LOG_FORMAT=json` switches the log
    /// format and `CUTCELL_PRETTY=0` prints a compact report. Graph options
    /// come from [`GraphOptions::from_env`].
    pub fn from_env() -> Self {
        Self {
            log_filter: std::env::var("RUST_LOG").unwrap_or_else(|_| "info,cutcell=info".into()),
            json_logs: std::env::var("CUTCELL_LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            pretty: std::env::var("CUTCELL_PRETTY")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            graph: GraphOptions::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
