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

//! This module defines the errors that can abort a mapping-space search
//! before any worker thread is spawned. Once the search is running, illegal
//! mappings are not errors: they are counted, throttled by the
//! consecutive-invalid timeout, and never propagated above their worker.

use thiserror::Error;

/// An error detected while setting up the mapper. All of these are fatal:
/// there is no point searching a space whose optimization criteria or
/// configuration cannot be made sense of.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The configuration names a figure of merit this mapper does not know.
    #[error("unrecognized optimization metric '{0}' (expected one of delay, energy, last-level-accesses, edp)")]
    UnknownMetric(String),

    /// The configuration supplied an explicit, empty metric list.
    #[error("optimization-metrics must name at least one metric")]
    EmptyMetricList,

    /// The configuration text could not be deserialized.
    #[error("invalid mapper configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("could not read mapper configuration: {0}")]
    Io(#[from] std::io::Error),
}
