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

//! This module provides the implementation of the parallel mapper
//! coordinator. That is, the component that splits one mapping space into as
//! many subspaces as there are worker threads, spawns the workers with the
//! shared state they exchange through, waits for all of them to finish, and
//! merges their thread-local results into the final global best.

use std::io;
use std::io::Write;
use std::sync::Arc;

use crate::abstraction::engine::{ArchSpecs, CostEngine};
use crate::abstraction::mapspace::MapSpace;
use crate::abstraction::search::SearchAlgorithm;
use crate::common::{InvalidityReport, MapperOutcome, Metric};
use crate::config::MapperConfig;
use crate::error::SetupError;
use crate::implementation::worker::{Critical, Shared, Worker, WorkerConfig, WorkerOutcome};
use crate::termination::TerminationFlag;

/// The coordinator of one mapping-space search. It is single-shot: build
/// one, run it, and hand the outcome to whatever reporting layer you use.
///
/// The coordinator owns nothing heavyweight itself: the arch specs, the
/// workload and the mapping space are borrowed from the embedder, every
/// worker constructs its own cost engine, and the only shared mutable state
/// is the mutex-protected pair of global best and log stream.
pub struct ParallelMapper<'a, E, MS>
    where E : CostEngine,
          MS: MapSpace<Mapping = E::Mapping>
{
    arch_specs       : &'a E::Specs,
    workload         : &'a E::Workload,
    mapspace         : &'a MS,
    num_threads      : usize,
    metrics          : Vec<Metric>,
    search_size      : u128,
    timeout          : u32,
    victory_condition: u32,
    sync_interval    : u128,
    log_stats        : bool,
    log_suboptimal   : bool,
    live_status      : bool,
    diagnostics      : bool,
    terminate        : TerminationFlag,
    log              : Option<Box<dyn Write + Send>>
}

impl<'a, E, MS> ParallelMapper<'a, E, MS>
    where E : CostEngine,
          MS: MapSpace<Mapping = E::Mapping>
{
    /// Sets up a mapper for the given topology, workload and mapping space.
    /// This is where every configuration error becomes fatal: an unknown or
    /// empty metric list never reaches a worker thread.
    pub fn new(arch_specs: &'a E::Specs,
               workload  : &'a E::Workload,
               mapspace  : &'a MS,
               config    : &MapperConfig) -> Result<Self, SetupError> {
        let metrics     = config.metrics()?;
        let num_threads = if config.num_threads == 0 { num_cpus::get() }
                          else { config.num_threads };
        Ok(ParallelMapper {
            arch_specs,
            workload,
            mapspace,
            num_threads,
            metrics,
            search_size      : config.search_size_per_worker(num_threads),
            timeout          : config.timeout,
            victory_condition: config.victory_condition,
            sync_interval    : config.sync_interval as u128,
            log_stats        : config.log_stats,
            log_suboptimal   : config.log_suboptimal,
            live_status      : config.live_status,
            diagnostics      : config.diagnostics,
            terminate        : TerminationFlag::new(),
            log              : None
        })
    }

    /// Sets the sink for the human-readable run log (defaults to stderr).
    pub fn with_log(mut self, log: Box<dyn Write + Send>) -> Self {
        self.log = Some(log);
        self
    }

    /// Shares an externally owned termination flag (e.g. one raised by a
    /// signal handler) instead of the mapper's private one.
    pub fn with_termination_flag(mut self, terminate: TerminationFlag) -> Self {
        self.terminate = terminate;
        self
    }

    /// Runs the search to completion and returns the merged outcome.
    ///
    /// The mapping space is split once into disjoint subspaces; the given
    /// factory produces one search cursor per subspace (it receives the
    /// subspace and the worker index). All workers are always joined, even
    /// when some of them finish early; the cooperative terminate flag is
    /// the only means of an early global stop.
    pub fn run<SA, F>(&mut self, search_factory: F) -> MapperOutcome<E::Mapping, E::Stats>
        where E : Default,
              SA: SearchAlgorithm + Send,
              F : Fn(&MS::Subspace, usize) -> SA
    {
        let subspaces = self.mapspace.split(self.num_threads);
        tracing::info!(requested = self.num_threads,
                       actual    = subspaces.len(),
                       "mapping space split into subspaces");

        let log    = self.log.take().unwrap_or_else(|| Box::new(io::stderr()));
        let shared = Arc::new(Shared::new(log));

        let arch_specs        = self.arch_specs;
        let workload          = self.workload;
        let metrics           = &self.metrics[..];
        let search_size       = self.search_size;
        let timeout           = self.timeout;
        let victory_condition = self.victory_condition;
        let sync_interval     = self.sync_interval;
        let log_stats         = self.log_stats;
        let log_suboptimal    = self.log_suboptimal;
        let live_status       = self.live_status;
        let diagnostics       = self.diagnostics;

        let outcomes: Vec<WorkerOutcome<E::Mapping, E::Stats>> =
            crossbeam::thread::scope(|s| {
                let mut handles = Vec::with_capacity(subspaces.len());
                for (thread_id, subspace) in subspaces.iter().enumerate() {
                    let search    = search_factory(subspace, thread_id);
                    let shared    = Arc::clone(&shared);
                    let terminate = self.terminate.clone();

                    handles.push(s.spawn(move |_| {
                        let mut worker = Worker::<E, _, _>::new(WorkerConfig {
                            thread_id,
                            search,
                            subspace,
                            shared,
                            terminate,
                            search_size,
                            timeout,
                            victory_condition,
                            sync_interval,
                            log_stats,
                            log_suboptimal,
                            live_status,
                            diagnostics,
                            metrics,
                            arch_specs,
                            workload
                        });
                        worker.run();
                        worker.into_outcome()
                    }));
                }
                handles.into_iter()
                       .map(|handle| handle.join().expect("a mapper worker panicked"))
                       .collect()
            }).expect("something went wrong with the worker threads");

        // Post-processing: aggregate the per-worker diagnostics and fold
        // every thread-local best into the global best.
        let mut invalidity = InvalidityReport::new(self.arch_specs.num_levels());
        let mut total_mappings: u128 = 0;
        let mut valid_mappings: u128 = 0;

        let best = {
            let mut critical = shared.lock();
            for outcome in &outcomes {
                invalidity.absorb(&outcome.invalidity);
                total_mappings += outcome.total_mappings;
                valid_mappings += outcome.valid_mappings;
                critical.best.update_if_better(&outcome.best, &self.metrics);
            }
            if self.diagnostics {
                Self::write_diagnostics(&mut critical, self.arch_specs, &invalidity);
            }
            if !critical.best.valid() {
                Self::write_no_solution_help(&mut critical, self.diagnostics);
            }
            critical.best.clone()
        };

        tracing::info!(total = total_mappings as u64,
                       valid = valid_mappings as u64,
                       found = best.valid(),
                       "mapping-space search complete");

        MapperOutcome { best, invalidity, total_mappings, valid_mappings }
    }

    /// Writes the aggregated per-level rejection table to the run log. The
    /// sample mapping kept for the worst level travels in the outcome, so a
    /// reporting layer with an engine at hand can re-evaluate and print it.
    fn write_diagnostics(critical  : &mut Critical<E::Mapping, E::Stats>,
                         arch_specs: &E::Specs,
                         invalidity: &InvalidityReport<E::Mapping>) {
        let log = &mut critical.log;
        let _ = writeln!(log);
        let _ = writeln!(log, "===============================================");
        let _ = writeln!(log, "               BEGIN DIAGNOSTICS               ");
        let _ = writeln!(log, "-----------------------------------------------");
        let _ = writeln!(log, "Per-level rejection counts:");
        for level in 0..invalidity.num_levels() {
            if invalidity.count(level) > 0 {
                let _ = writeln!(log, "{:>24}: {}",
                                 arch_specs.level_name(level), invalidity.count(level));
            }
        }
        if let Some((level, count)) = invalidity.worst_level() {
            let _ = writeln!(log);
            let _ = writeln!(log, "Level with most failures: {}: {}",
                             arch_specs.level_name(level), count);
        }
        let _ = writeln!(log, "-----------------------------------------------");
        let _ = writeln!(log, "                 END DIAGNOSTICS               ");
        let _ = writeln!(log, "===============================================");
    }

    /// A no-solution run is a valid outcome, but an unhelpful one; this
    /// writes the checklist that most often explains it.
    fn write_no_solution_help(critical: &mut Critical<E::Mapping, E::Stats>,
                              diagnostics: bool) {
        let log = &mut critical.log;
        let _ = writeln!(log, "MESSAGE: no valid mappings found within the search criteria. \
                               Some suggestions:");
        let _ = writeln!(log, "(1) Observe each worker's termination message. If it terminated \
                               due to");
        let _ = writeln!(log, "    consecutive failed mappings, it will tell you how many failed \
                               at");
        let _ = writeln!(log, "    construction and how many were rejected by the evaluation.");
        let _ = writeln!(log, "(2) Check your architecture configuration and mapping-space");
        let _ = writeln!(log, "    constraints. Try to find the offending constraints that are");
        let _ = writeln!(log, "    likely to have caused the rejections, and relax them.");
        let _ = writeln!(log, "(3) Try other search algorithms, and relax the termination \
                               criteria:");
        let _ = writeln!(log, "    victory-condition, timeout and/or search-size.");
        if !diagnostics {
            let _ = writeln!(log, "(4) Enable the mapper's diagnostics (diagnostics = true) to \
                                   track and");
            let _ = writeln!(log, "    report more information about the rejected mappings.");
        }
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
