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

//! This module defines the most basic data types that are used throughout all
//! the code of our library (both at the abstraction and implementation levels).
//! These are also the types your client library is likely to work with.
//!
//! In particular, this module comprises the definition of the following types:
//! - `MappingId`
//! - `Metric` (+ the `cost` function)
//! - `Betterness` (+ the `compare` and `is_better` functions)
//! - `EvalStatus`
//! - `SearchStatus`
//! - `EvaluationResult`
//! - `InvalidityReport`
//! - `MapperOutcome`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::abstraction::engine::TopologyStats;
use crate::error::SetupError;

// ----------------------------------------------------------------------------
// --- MAPPING ID -------------------------------------------------------------
// ----------------------------------------------------------------------------
/// This type denotes a point in the mapping space. It is nothing but an
/// abstract handle: a mapping id is only meaningful to the subspace that
/// handed it out, and not every id points to a legal mapping (the space of
/// legal mappings is sparse).
///
/// # Examples:
/// ```
/// # use mapsearch::common::MappingId;
/// assert_eq!(0, MappingId(0).id());
/// assert_eq!(1, MappingId(1).id());
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MappingId(pub u128);
impl MappingId {
    #[inline]
    /// This function returns the numeric value of the mapping id.
    pub fn id(self) -> u128 {
        self.0
    }
}

// ----------------------------------------------------------------------------
// --- METRIC & COST ----------------------------------------------------------
// ----------------------------------------------------------------------------
/// This type identifies one of the figures of merit the mapper can optimize
/// for. The wire/config form of a metric is its kebab-case string tag
/// (`delay`, `energy`, `last-level-accesses`, `edp`); anything else is a
/// configuration error caught at setup time.
///
/// # Example
/// ```
/// # use mapsearch::common::Metric;
/// assert_eq!(Metric::Edp, "edp".parse().unwrap());
/// assert!("flops".parse::<Metric>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// The number of cycles taken to process the workload.
    Delay,
    /// The total energy spent processing the workload.
    Energy,
    /// The number of accesses to the last (outermost) memory level.
    LastLevelAccesses,
    /// The energy-delay product.
    Edp,
}
impl FromStr for Metric {
    type Err = SetupError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "delay"               => Ok(Metric::Delay),
            "energy"              => Ok(Metric::Energy),
            "last-level-accesses" => Ok(Metric::LastLevelAccesses),
            "edp"                 => Ok(Metric::Edp),
            other                 => Err(SetupError::UnknownMetric(other.to_string()))
        }
    }
}
impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Delay             => write!(f, "delay"),
            Metric::Energy            => write!(f, "energy"),
            Metric::LastLevelAccesses => write!(f, "last-level-accesses"),
            Metric::Edp               => write!(f, "edp")
        }
    }
}

/// Returns the scalar cost of an evaluated mapping under the given metric.
/// Lower is always better.
pub fn cost<S: TopologyStats>(stats: &S, metric: Metric) -> f64 {
    match metric {
        Metric::Delay             => stats.cycles() as f64,
        Metric::Energy            => stats.energy(),
        Metric::LastLevelAccesses => stats.last_level_accesses() as f64,
        Metric::Edp               => stats.energy() * stats.cycles() as f64
    }
}

// ----------------------------------------------------------------------------
// --- BETTERNESS & COMPARISON ------------------------------------------------
// ----------------------------------------------------------------------------
/// The relative improvement threshold below which two costs are considered
/// tied on a metric, forcing the tie to be broken by the next metric in the
/// optimization list.
pub const TOLERANCE: f64 = 0.001;

/// The verdict of comparing a candidate against an incumbent under an ordered
/// list of metrics. `Better`/`Worse` mean a clear win/loss on some metric;
/// the `Slightly` variants mean every metric was within tolerance and the
/// verdict reflects the sign of the highest-priority near-tie.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Betterness {
    Better,
    SlightlyBetter,
    SlightlyWorse,
    Worse
}

/// Compares the costs of a `candidate` against those of an `incumbent` under
/// the given ordered (most significant first) list of metrics.
///
/// The comparison proceeds lexicographically: a relative improvement larger
/// than `TOLERANCE` on the current metric decides the verdict outright;
/// otherwise the remaining metrics break the tie. When all metrics are
/// within tolerance, the verdict carries the sign of the current metric's
/// improvement. NOTE! Equality is categorized as `SlightlyWorse` (prefers
/// the incumbent), so the first-found mapping of a plateau wins.
///
/// # Panics
/// The metric list must not be empty.
pub fn compare<S: TopologyStats>(candidate: &S, incumbent: &S, metrics: &[Metric]) -> Betterness {
    let candidate_cost = cost(candidate, metrics[0]);
    let incumbent_cost = cost(incumbent, metrics[0]);

    let relative_improvement = if incumbent_cost == 0.0 { 1.0 } else {
        (incumbent_cost - candidate_cost) / incumbent_cost
    };

    if relative_improvement.abs() > TOLERANCE {
        // We have a clear winner.
        if relative_improvement > 0.0 {
            Betterness::Better
        } else {
            Betterness::Worse
        }
    } else {
        // Within tolerance range, try to recurse.
        match &metrics[1..] {
            [] =>
                if relative_improvement > 0.0 {
                    Betterness::SlightlyBetter
                } else {
                    Betterness::SlightlyWorse
                },
            rest =>
                match compare(candidate, incumbent, rest) {
                    verdict @ (Betterness::Better | Betterness::Worse) => verdict,
                    _ =>
                        if relative_improvement > 0.0 {
                            Betterness::SlightlyBetter
                        } else {
                            Betterness::SlightlyWorse
                        }
                }
        }
    }
}

/// Returns true iff the `candidate` should replace the `incumbent` under the
/// given metric list.
pub fn is_better<S: TopologyStats>(candidate: &S, incumbent: &S, metrics: &[Metric]) -> bool {
    matches!(compare(candidate, incumbent, metrics),
             Betterness::Better | Betterness::SlightlyBetter)
}

// ----------------------------------------------------------------------------
// --- EVAL STATUS ------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The status reported by the cost engine for one topology level when
/// checking or evaluating a mapping. A mapping is accepted iff every level
/// reports success.
#[derive(Debug, Clone, Default)]
pub struct EvalStatus {
    pub success    : bool,
    pub fail_reason: String
}
impl EvalStatus {
    /// A status telling the level accepted the mapping.
    pub fn pass() -> Self {
        EvalStatus { success: true, fail_reason: String::new() }
    }
    /// A status telling the level rejected the mapping, and why.
    pub fn fail(reason: impl Into<String>) -> Self {
        EvalStatus { success: false, fail_reason: reason.into() }
    }
}

/// Returns true iff every topology level accepted the mapping.
pub fn all_levels_succeeded(status_per_level: &[EvalStatus]) -> bool {
    status_per_level.iter().all(|status| status.success)
}

// ----------------------------------------------------------------------------
// --- SEARCH STATUS ----------------------------------------------------------
// ----------------------------------------------------------------------------
/// The feedback a worker gives its search cursor about the mapping id the
/// cursor last handed out. Adaptive search strategies use this signal to
/// steer the enumeration.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SearchStatus {
    /// The mapping was legal and fully evaluated.
    Success,
    /// The id did not denote a constructible mapping.
    MappingConstructionFailure,
    /// The mapping was constructible but some topology level rejected it.
    EvalFailure
}

// ----------------------------------------------------------------------------
// --- EVALUATION RESULT ------------------------------------------------------
// ----------------------------------------------------------------------------
/// The outcome of pushing one mapping through the cost engine. An invalid
/// result carries no payload at all, so a rejected mapping can never be
/// mistaken for a ranked one.
#[derive(Debug, Clone)]
pub enum EvaluationResult<M, S> {
    /// No valid mapping has been ranked (yet).
    Invalid,
    /// A legal mapping along with the stats its evaluation produced.
    Valid {
        mapping: M,
        stats  : S
    }
}
impl<M, S> Default for EvaluationResult<M, S> {
    fn default() -> Self {
        EvaluationResult::Invalid
    }
}
impl<M: Clone, S: TopologyStats + Clone> EvaluationResult<M, S> {
    /// Returns true iff this result holds an evaluated mapping.
    pub fn valid(&self) -> bool {
        matches!(self, EvaluationResult::Valid {..})
    }
    /// Returns the stats of the held mapping, if any.
    pub fn stats(&self) -> Option<&S> {
        match self {
            EvaluationResult::Invalid          => None,
            EvaluationResult::Valid {stats, ..} => Some(stats)
        }
    }
    /// Returns the held mapping, if any.
    pub fn mapping(&self) -> Option<&M> {
        match self {
            EvaluationResult::Invalid            => None,
            EvaluationResult::Valid {mapping, ..} => Some(mapping)
        }
    }
    /// Overwrites this result with a copy of `other` iff `other` is valid
    /// and strictly preferable under the given metric list (an invalid self
    /// is always replaced by a valid other). Returns true iff an overwrite
    /// took place. Ties keep the incumbent.
    pub fn update_if_better(&mut self, other: &Self, metrics: &[Metric]) -> bool {
        let updated = match (&*self, other) {
            (_, EvaluationResult::Invalid) => false,
            (EvaluationResult::Invalid, _) => true,
            (EvaluationResult::Valid {stats: incumbent, ..},
             EvaluationResult::Valid {stats: candidate, ..}) =>
                is_better(candidate, incumbent, metrics)
        };
        if updated {
            *self = other.clone();
        }
        updated
    }
}

// ----------------------------------------------------------------------------
// --- INVALIDITY REPORT ------------------------------------------------------
// ----------------------------------------------------------------------------
/// A per-topology-level account of why mappings were rejected during
/// evaluation. For each level it tracks the rejection count and keeps the
/// *first* rejected mapping as a sample; one exemplar per level is all the
/// downstream report needs.
#[derive(Debug, Clone)]
pub struct InvalidityReport<M> {
    counts : Vec<u128>,
    samples: Vec<Option<M>>
}
impl<M: Clone> InvalidityReport<M> {
    /// Creates an empty report for a topology with `num_levels` levels.
    pub fn new(num_levels: usize) -> Self {
        InvalidityReport {
            counts : vec![0; num_levels],
            samples: vec![None; num_levels]
        }
    }
    /// The number of topology levels this report covers.
    pub fn num_levels(&self) -> usize {
        self.counts.len()
    }
    /// The number of rejections attributed to the given level.
    pub fn count(&self, level: usize) -> u128 {
        self.counts[level]
    }
    /// The sample mapping kept for the given level, if any was rejected there.
    pub fn sample(&self, level: usize) -> Option<&M> {
        self.samples[level].as_ref()
    }
    /// The total number of rejections across all levels.
    pub fn total(&self) -> u128 {
        self.counts.iter().sum()
    }
    /// Attributes one rejection of `mapping` to the given level. The sample
    /// slot is only written on the first rejection for that level.
    pub fn record(&mut self, level: usize, mapping: &M) {
        if self.counts[level] == 0 {
            self.samples[level] = Some(mapping.clone());
        }
        self.counts[level] += 1;
    }
    /// Folds another report (typically from a sibling worker) into this one:
    /// counts add up and each level inherits a sample from the first report
    /// that had a nonzero count for it.
    pub fn absorb(&mut self, other: &Self) {
        for level in 0..self.counts.len() {
            if self.counts[level] == 0 && other.counts[level] != 0 {
                self.samples[level] = other.samples[level].clone();
            }
            self.counts[level] += other.counts[level];
        }
    }
    /// Returns the level with the most rejections along with its count, or
    /// None when no rejection was recorded at all. Ties go to the earliest
    /// level.
    pub fn worst_level(&self) -> Option<(usize, u128)> {
        self.counts.iter().cloned().enumerate()
            .fold(None, |worst, (level, count)| {
                if count > worst.map_or(0, |(_, most)| most) {
                    Some((level, count))
                } else {
                    worst
                }
            })
    }
}

// ----------------------------------------------------------------------------
// --- MAPPER OUTCOME ---------------------------------------------------------
// ----------------------------------------------------------------------------
/// What a full mapping-space search produces: the globally best evaluation
/// result (possibly invalid when the search criteria admitted no legal
/// mapping, which is a valid outcome), the aggregated invalidity
/// diagnostics, and the overall enumeration counters.
#[derive(Debug, Clone)]
pub struct MapperOutcome<M, S> {
    pub best          : EvaluationResult<M, S>,
    pub invalidity    : InvalidityReport<M>,
    pub total_mappings: u128,
    pub valid_mappings: u128
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_metric {
    use crate::common::Metric;

    #[test]
    fn the_wire_form_of_a_metric_is_its_kebab_case_tag() {
        assert_eq!("delay",               Metric::Delay.to_string());
        assert_eq!("energy",              Metric::Energy.to_string());
        assert_eq!("last-level-accesses", Metric::LastLevelAccesses.to_string());
        assert_eq!("edp",                 Metric::Edp.to_string());
    }
    #[test]
    fn parsing_roundtrips_with_display() {
        for metric in [Metric::Delay, Metric::Energy, Metric::LastLevelAccesses, Metric::Edp] {
            assert_eq!(metric, metric.to_string().parse().unwrap());
        }
    }
    #[test]
    fn parsing_an_unknown_tag_is_a_setup_error() {
        let err = "throughput".parse::<Metric>().unwrap_err();
        assert!(err.to_string().contains("throughput"));
    }
}



#[cfg(test)]
mod test_evaluation_result {
    use crate::common::{EvaluationResult, Metric};
    use crate::test_utils::TestStats;

    const DELAY: [Metric; 1] = [Metric::Delay];

    fn valid(id: u128, cycles: u64) -> EvaluationResult<u128, TestStats> {
        EvaluationResult::Valid { mapping: id, stats: TestStats::new(cycles, 1.0) }
    }

    #[test]
    fn an_invalid_other_is_never_adopted() {
        let mut best = valid(1, 100);
        assert!(!best.update_if_better(&EvaluationResult::Invalid, &DELAY));
        assert_eq!(Some(&1), best.mapping());
    }
    #[test]
    fn a_valid_other_always_replaces_an_invalid_self() {
        let mut best = EvaluationResult::<u128, TestStats>::Invalid;
        assert!(best.update_if_better(&valid(7, 99999), &DELAY));
        assert!(best.valid());
        assert_eq!(Some(&7), best.mapping());
    }
    #[test]
    fn an_equal_candidate_does_not_displace_the_incumbent() {
        let mut best = valid(1, 100);
        assert!(!best.update_if_better(&valid(2, 100), &DELAY));
        assert_eq!(Some(&1), best.mapping());
    }
    #[test]
    fn updates_are_monotonically_improving() {
        let mut best = EvaluationResult::Invalid;
        let inputs = [50_u64, 80, 40, 40, 90, 10];
        for (id, cycles) in inputs.iter().copied().enumerate() {
            best.update_if_better(&valid(id as u128, cycles), &DELAY);
            let held = best.stats().unwrap().cycles;
            assert!(inputs[..=id].iter().all(|c| held <= *c));
        }
        // ties broken toward the earlier input
        assert_eq!(Some(&5), best.mapping());
        assert_eq!(10, best.stats().unwrap().cycles);
    }
}
