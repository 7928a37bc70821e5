// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module defines the mapper configuration: the closed set of options
//! that tune the parallel search, their kebab-case wire form, and their
//! defaults. Configurations can be written as TOML documents or built as
//! plain struct literals; either way, anything the mapper cannot make sense
//! of is fatal at setup time.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::common::Metric;
use crate::error::SetupError;

fn default_num_threads() -> usize {
    num_cpus::get()
}
fn default_timeout() -> u32 {
    1000
}
fn default_victory_condition() -> u32 {
    500
}

/// The user-facing knobs of a mapping-space search.
///
/// # Example
/// ```
/// # use mapsearch::config::MapperConfig;
/// let config: MapperConfig = r#"
///     num-threads          = 4
///     optimization-metrics = ["delay", "energy"]
///     timeout              = 100
///     sync-interval        = 32
/// "#.parse().unwrap();
///
/// assert_eq!(4, config.num_threads);
/// assert_eq!(100, config.timeout);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MapperConfig {
    /// How many worker threads to spawn. Defaults to the hardware
    /// parallelism hint.
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,

    /// The single figure of merit to optimize for. Takes precedence over
    /// `optimization-metrics` when both are present.
    #[serde(default)]
    pub optimization_metric: Option<Metric>,

    /// The ordered (most significant first) list of figures of merit.
    /// When neither form is given, the mapper optimizes for `edp`.
    #[serde(default)]
    pub optimization_metrics: Option<Vec<Metric>>,

    /// The total number of valid mappings to collect across all workers
    /// before stopping, 0 meaning unlimited. The quota is ceil-divided
    /// among the workers.
    #[serde(default)]
    pub search_size: u32,

    /// How many *consecutive* invalid mappings a worker tolerates before
    /// giving up on its subspace.
    #[serde(default = "default_timeout")]
    pub timeout: u32,

    /// How many consecutive valid-but-not-improving mappings a worker
    /// accepts before declaring its search converged, 0 disabling the
    /// criterion.
    #[serde(default = "default_victory_condition")]
    pub victory_condition: u32,

    /// How many enumerated mappings separate two exchanges with the shared
    /// global best, 0 disabling the exchange altogether.
    #[serde(default)]
    pub sync_interval: u32,

    /// Log one machine-readable line per valid mapping and per local-best
    /// update.
    #[serde(default)]
    pub log_stats: bool,

    /// Log the summary line of every valid mapping, not only the improving
    /// ones.
    #[serde(default)]
    pub log_suboptimal: bool,

    /// Emit a structured status event per worker iteration, for an external
    /// live display to render.
    #[serde(default)]
    pub live_status: bool,

    /// Track per-level rejection counts and keep one sample rejected
    /// mapping per topology level.
    #[serde(default)]
    pub diagnostics: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        MapperConfig {
            num_threads         : default_num_threads(),
            optimization_metric : None,
            optimization_metrics: None,
            search_size         : 0,
            timeout             : default_timeout(),
            victory_condition   : default_victory_condition(),
            sync_interval       : 0,
            log_stats           : false,
            log_suboptimal      : false,
            live_status         : false,
            diagnostics         : false,
        }
    }
}

impl FromStr for MapperConfig {
    type Err = SetupError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(text)?)
    }
}

impl MapperConfig {
    /// Loads a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        std::fs::read_to_string(path)?.parse()
    }

    /// Resolves the ordered metric list: the singular form wins when both
    /// are present, and the default is `[edp]`. An explicitly empty list is
    /// a configuration error.
    pub fn metrics(&self) -> Result<Vec<Metric>, SetupError> {
        let metrics = if let Some(metric) = self.optimization_metric {
            vec![metric]
        } else if let Some(metrics) = &self.optimization_metrics {
            metrics.clone()
        } else {
            vec![Metric::Edp]
        };
        if metrics.is_empty() {
            return Err(SetupError::EmptyMetricList);
        }
        Ok(metrics)
    }

    /// Divides the valid-mapping quota among `num_threads` workers,
    /// rounding up so that the workers collectively reach at least the
    /// requested total (they may overshoot it by up to `num_threads - 1`).
    pub fn search_size_per_worker(&self, num_threads: usize) -> u128 {
        if self.search_size > 0 {
            1 + (self.search_size as u128 - 1) / num_threads as u128
        } else {
            0
        }
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
