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

//! This module defines the traits through which the framework talks to the
//! cost model: `CostEngine`, the stats it produces (`TopologyStats`) and the
//! description of the hardware topology it models (`ArchSpecs`).

use crate::common::EvalStatus;

/// The subset of an evaluation's figures the framework itself consumes.
/// Engines typically produce many more figures; those travel through the
/// framework by value, opaquely, inside the engine's stats type.
pub trait TopologyStats {
    /// The number of cycles taken to process the workload.
    fn cycles(&self) -> u64;
    /// The total energy spent processing the workload.
    fn energy(&self) -> f64;
    /// The number of accesses to the outermost memory level.
    fn last_level_accesses(&self) -> u64;
    /// The fraction of the compute fabric kept busy, in [0, 1].
    fn utilization(&self) -> f64;
    /// The number of elementary compute operations (positive for any valid
    /// evaluation).
    fn maccs(&self) -> u64;
}

/// A description of the hardware topology the engine models. The framework
/// only needs to know how many levels the topology has (rejection
/// diagnostics are tracked per level) and how to name them in reports.
pub trait ArchSpecs {
    /// The number of levels in the topology.
    fn num_levels(&self) -> usize;
    /// A human-readable name for the given level.
    fn level_name(&self, level: usize) -> &str;
}

/// The cost model. An engine is configured once for a hardware topology and
/// then asked to judge candidate mappings of a workload onto that topology,
/// in two stages of increasing algorithmic complexity so that hopeless
/// candidates can be rejected cheaply.
///
/// # Important note
/// An engine is stateful and *not* assumed to be shareable across threads:
/// every worker constructs and configures its own instance. This is why the
/// trait does not require `Send` nor `Sync` on implementors, only on the
/// data that crosses thread boundaries (mappings and stats).
pub trait CostEngine {
    /// The hardware topology description. Shared immutably by all workers.
    type Specs: ArchSpecs + Clone + Sync;
    /// The problem shape being mapped. Shared immutably by all workers.
    type Workload: Sync;
    /// A concrete assignment of the workload onto the topology.
    type Mapping: Clone + Send;
    /// The figures produced by a successful evaluation.
    type Stats: TopologyStats + Clone + Send;

    /// Configures the engine for the given topology. Idempotent.
    fn spec(&mut self, specs: &Self::Specs);

    /// Runs the cheap legality checks, one status per topology level. The
    /// mapping passes iff every level succeeds. When `quiet` is set, the
    /// engine may skip composing failure reasons.
    fn pre_evaluate(&mut self, mapping: &Self::Mapping, workload: &Self::Workload, quiet: bool)
        -> Vec<EvalStatus>;

    /// Runs the full cost evaluation, one status per topology level. On
    /// all-level success, the resulting figures are retrievable through
    /// `stats`.
    fn evaluate(&mut self, mapping: &Self::Mapping, workload: &Self::Workload, quiet: bool)
        -> Vec<EvalStatus>;

    /// The figures of the last successful evaluation.
    fn stats(&self) -> Self::Stats;
}
