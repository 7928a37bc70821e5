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

//! This module provides some utilities to write unit tests, the most notable
//! of which are scripted stand-ins for the three external collaborators (the
//! cost engine, the mapping space, and the search algorithm) along with a
//! capturing log sink.
#![cfg(test)]

use std::io;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::abstraction::engine::{ArchSpecs, CostEngine, TopologyStats};
use crate::abstraction::mapspace::{MapSpace, Subspace};
use crate::abstraction::search::SearchAlgorithm;
use crate::common::{EvalStatus, MappingId, SearchStatus};

/// A plain bag of figures implementing `TopologyStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TestStats {
    pub cycles             : u64,
    pub energy             : f64,
    pub last_level_accesses: u64,
    pub utilization        : f64,
    pub maccs              : u64
}
impl TestStats {
    pub fn new(cycles: u64, energy: f64) -> Self {
        TestStats { cycles, energy, last_level_accesses: 0, utilization: 1.0, maccs: 1 }
    }
}
impl TopologyStats for TestStats {
    fn cycles(&self) -> u64              { self.cycles }
    fn energy(&self) -> f64              { self.energy }
    fn last_level_accesses(&self) -> u64 { self.last_level_accesses }
    fn utilization(&self) -> f64         { self.utilization }
    fn maccs(&self) -> u64               { self.maccs }
}

/// A topology of `n` levels named L0, L1, ...
#[derive(Debug, Clone)]
pub struct TestSpecs {
    levels: Vec<String>
}
impl TestSpecs {
    pub fn new(num_levels: usize) -> Self {
        TestSpecs { levels: (0..num_levels).map(|i| format!("L{}", i)).collect() }
    }
}
impl ArchSpecs for TestSpecs {
    fn num_levels(&self) -> usize {
        self.levels.len()
    }
    fn level_name(&self, level: usize) -> &str {
        &self.levels[level]
    }
}

/// The workload is irrelevant to the scripted engine.
pub struct TestWorkload;

/// A scripted mapping: it carries its own verdicts, so the engine merely
/// reads them back.
#[derive(Debug, Clone, PartialEq)]
pub struct TestMapping {
    pub id             : u128,
    pub pre_fail_level : Option<usize>,
    pub eval_fail_level: Option<usize>,
    pub stats          : TestStats
}
impl TestMapping {
    /// A mapping that passes both stages and evaluates to the given delay.
    pub fn valid(id: u128, cycles: u64) -> Self {
        TestMapping {
            id,
            pre_fail_level : None,
            eval_fail_level: None,
            stats          : TestStats::new(cycles, 1.0)
        }
    }
    /// A mapping rejected by the pre-check at the given topology level.
    pub fn rejected_in_precheck(id: u128, level: usize) -> Self {
        TestMapping {
            id,
            pre_fail_level : Some(level),
            eval_fail_level: None,
            stats          : TestStats::default()
        }
    }
    /// A mapping that passes the pre-check but fails the full evaluation at
    /// the given topology level.
    pub fn rejected_in_eval(id: u128, level: usize) -> Self {
        TestMapping {
            id,
            pre_fail_level : None,
            eval_fail_level: Some(level),
            stats          : TestStats::default()
        }
    }
}

/// An engine whose verdicts are entirely driven by the scripted mappings it
/// is given.
#[derive(Default)]
pub struct TableEngine {
    num_levels: usize,
    last      : Option<TestStats>
}
impl TableEngine {
    fn verdict(&self, fail_level: Option<usize>) -> Vec<EvalStatus> {
        (0..self.num_levels)
            .map(|level| if fail_level == Some(level) {
                EvalStatus::fail(format!("scripted rejection at level {}", level))
            } else {
                EvalStatus::pass()
            })
            .collect()
    }
}
impl CostEngine for TableEngine {
    type Specs    = TestSpecs;
    type Workload = TestWorkload;
    type Mapping  = TestMapping;
    type Stats    = TestStats;

    fn spec(&mut self, specs: &TestSpecs) {
        self.num_levels = specs.num_levels();
    }
    fn pre_evaluate(&mut self, mapping: &TestMapping, _workload: &TestWorkload, _quiet: bool)
        -> Vec<EvalStatus> {
        self.verdict(mapping.pre_fail_level)
    }
    fn evaluate(&mut self, mapping: &TestMapping, _workload: &TestWorkload, _quiet: bool)
        -> Vec<EvalStatus> {
        let status = self.verdict(mapping.eval_fail_level);
        if status.iter().all(|s| s.success) {
            self.last = Some(mapping.stats);
        }
        status
    }
    fn stats(&self) -> TestStats {
        self.last.unwrap_or_default()
    }
}

/// A subspace backed by a table of scripted mappings; a `None` entry stands
/// for an id whose mapping cannot be constructed. A cyclic table repeats
/// itself forever, which is handy for exercising the termination criteria
/// with an endless cursor.
pub struct TableSpace {
    entries: Vec<Option<TestMapping>>,
    cyclic : bool
}
impl TableSpace {
    pub fn exact(entries: Vec<Option<TestMapping>>) -> Self {
        TableSpace { entries, cyclic: false }
    }
    pub fn cyclic(entries: Vec<Option<TestMapping>>) -> Self {
        TableSpace { entries, cyclic: true }
    }
    pub fn len(&self) -> u128 {
        self.entries.len() as u128
    }
}
impl Subspace for TableSpace {
    type Mapping = TestMapping;

    fn size(&self) -> u128 {
        self.len()
    }
    fn construct(&self, id: MappingId) -> Option<TestMapping> {
        let index = if self.cyclic {
            (id.id() % self.entries.len() as u128) as usize
        } else if id.id() < self.entries.len() as u128 {
            id.id() as usize
        } else {
            return None;
        };
        self.entries[index].clone()
    }
}

/// A mapping space backed by one big table, split into contiguous chunks.
pub struct TableMapSpace {
    entries: Vec<Option<TestMapping>>
}
impl TableMapSpace {
    pub fn new(entries: Vec<Option<TestMapping>>) -> Self {
        TableMapSpace { entries }
    }
}
impl MapSpace for TableMapSpace {
    type Mapping  = TestMapping;
    type Subspace = TableSpace;

    fn size(&self) -> u128 {
        self.entries.len() as u128
    }
    fn split(&self, nb_splits: usize) -> Vec<TableSpace> {
        let chunk = 1 + self.entries.len().saturating_sub(1) / nb_splits;
        self.entries.chunks(chunk)
            .map(|entries| TableSpace::exact(entries.to_vec()))
            .collect()
    }
}

/// The feedback collected by a `LinearSearch`, shared with the test body.
#[derive(Clone, Default)]
pub struct SharedReports(Arc<Mutex<Vec<(SearchStatus, Option<f64>)>>>);
impl SharedReports {
    pub fn statuses(&self) -> Vec<SearchStatus> {
        self.0.lock().iter().map(|(status, _)| *status).collect()
    }
    pub fn success_costs(&self) -> Vec<f64> {
        self.0.lock().iter().filter_map(|(_, cost)| *cost).collect()
    }
}

/// The simplest possible cursor: it hands out sequential ids, either forever
/// or up to a limit, and records every report it receives.
pub struct LinearSearch {
    next   : u128,
    limit  : Option<u128>,
    reports: SharedReports
}
impl LinearSearch {
    pub fn exhaustive(limit: u128) -> Self {
        LinearSearch { next: 0, limit: Some(limit), reports: SharedReports::default() }
    }
    pub fn endless() -> Self {
        LinearSearch { next: 0, limit: None, reports: SharedReports::default() }
    }
    pub fn reports(&self) -> SharedReports {
        self.reports.clone()
    }
}
impl SearchAlgorithm for LinearSearch {
    fn next(&mut self) -> Option<MappingId> {
        match self.limit {
            Some(limit) if self.next >= limit => None,
            _ => {
                let id = self.next;
                self.next += 1;
                Some(MappingId(id))
            }
        }
    }
    fn report(&mut self, status: SearchStatus, cost: Option<f64>) {
        self.reports.0.lock().push((status, cost));
    }
}

/// A cloneable, capturing log sink.
#[derive(Clone, Default)]
pub struct SharedLog(Arc<Mutex<Vec<u8>>>);
impl SharedLog {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}
impl Write for SharedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_table_map_space {
    use crate::abstraction::mapspace::{MapSpace, Subspace};
    use crate::common::MappingId;
    use crate::test_utils::{TableMapSpace, TestMapping};

    /// Walks every subspace exhaustively and returns the global ids of the
    /// mappings it reaches.
    fn enumerate_all(space: &TableMapSpace, nb_splits: usize) -> Vec<u128> {
        let mut seen = vec![];
        for subspace in space.split(nb_splits) {
            for id in 0..subspace.size() {
                if let Some(mapping) = subspace.construct(MappingId(id)) {
                    seen.push(mapping.id);
                }
            }
        }
        seen
    }

    #[test]
    fn splitting_covers_the_space_without_overlap() {
        let entries = (0..10).map(|id| Some(TestMapping::valid(id, 1))).collect();
        let space   = TableMapSpace::new(entries);

        for nb_splits in [1, 2, 3, 4, 7, 10] {
            let mut seen = enumerate_all(&space, nb_splits);
            seen.sort_unstable();
            // every id once: the union covers the space and no id is
            // visited by more than one subspace
            assert_eq!((0..10).collect::<Vec<u128>>(), seen);
        }
    }
    #[test]
    fn splitting_yields_at_most_the_requested_number_of_subspaces() {
        let entries = (0..10).map(|id| Some(TestMapping::valid(id, 1))).collect();
        let space   = TableMapSpace::new(entries);
        assert!(space.split(4).len() <= 4);
        assert!(space.split(16).len() <= 16);
    }
}
