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

//! This module provides the implementation of the per-thread mapper worker.
//! Each worker owns one subspace, one search cursor and one cost engine; it
//! repeatedly pulls a mapping id from the cursor, pushes the mapping through
//! the staged evaluation, and maintains a thread-local best which it
//! periodically exchanges with the shared global best.

use std::io::Write;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::abstraction::engine::{ArchSpecs, CostEngine, TopologyStats};
use crate::abstraction::mapspace::Subspace;
use crate::abstraction::search::SearchAlgorithm;
use crate::common::{all_levels_succeeded, cost, EvalStatus, EvaluationResult,
                    InvalidityReport, Metric, SearchStatus};
use crate::termination::TerminationFlag;

/// The shared data that may only be manipulated within critical sections:
/// the global best and the run log stream. Keeping the log behind the same
/// lock serializes the writes of all workers, so interleaved lines stay
/// readable.
pub struct Critical<M, S> {
    /// The best evaluation result any worker has shared so far.
    pub best: EvaluationResult<M, S>,
    /// The sink for the human-readable run log.
    pub log : Box<dyn Write + Send>
}
/// The state which is shared among the many running workers. It provides
/// access to the critical data, protected by a single coarse mutex which is
/// only ever held for O(1) work: an exchange of bests or the write of a few
/// log lines. Workers never hold it while calling into the engine, the
/// subspace or the search cursor.
pub struct Shared<M, S> {
    critical: Mutex<Critical<M, S>>
}
impl<M, S> Shared<M, S> {
    /// Creates the shared state with an invalid global best and the given
    /// log sink.
    pub fn new(log: Box<dyn Write + Send>) -> Self {
        Shared {
            critical: Mutex::new(Critical { best: EvaluationResult::Invalid, log })
        }
    }
    /// Enters the critical section.
    pub fn lock(&self) -> MutexGuard<'_, Critical<M, S>> {
        self.critical.lock()
    }
}

/// The configuration information a worker receives from the coordinator.
/// It is immutable after construction: the worker's mutable state (its
/// local best, its counters, its diagnostics) lives in the `Worker` itself.
pub struct WorkerConfig<'a, E: CostEngine, SS, SA> {
    /// The index of this worker among its siblings.
    pub thread_id: usize,
    /// The search cursor deciding the enumeration order. Owned: cursors are
    /// stateful and never shared.
    pub search: SA,
    /// The piece of the mapping space this worker is responsible for.
    pub subspace: &'a SS,
    /// The mutex-protected global best and log stream.
    pub shared: Arc<Shared<E::Mapping, E::Stats>>,
    /// The cooperative stop flag.
    pub terminate: TerminationFlag,
    /// How many valid mappings to collect before stopping, 0 = unlimited.
    pub search_size: u128,
    /// How many consecutive invalid mappings to tolerate before giving up.
    pub timeout: u32,
    /// How many consecutive unimproving valid mappings before declaring
    /// victory, 0 = disabled.
    pub victory_condition: u32,
    /// How many enumerated mappings between exchanges with the global best,
    /// 0 = disabled.
    pub sync_interval: u128,
    /// Log one machine-readable line per valid mapping and per update.
    pub log_stats: bool,
    /// Log the summary line of every valid mapping, not only improvements.
    pub log_suboptimal: bool,
    /// Emit a structured status event per iteration.
    pub live_status: bool,
    /// Track per-level rejection counts and samples.
    pub diagnostics: bool,
    /// The ordered optimization metrics. Must not be empty.
    pub metrics: &'a [Metric],
    /// The hardware topology the engine must be configured for.
    pub arch_specs: &'a E::Specs,
    /// The problem shape being mapped.
    pub workload: &'a E::Workload
}

/// What a worker hands back to the coordinator once its loop has exited.
pub struct WorkerOutcome<M, S> {
    pub best          : EvaluationResult<M, S>,
    pub invalidity    : InvalidityReport<M>,
    pub total_mappings: u128,
    pub valid_mappings: u128
}

/// The per-thread search/evaluate/rank loop. A worker consumes mapping ids
/// from its cursor, evaluates them in stages with an early bail-out at each
/// stage, maintains a thread-local best, and terminates under any of the
/// conditions described on `run`.
pub struct Worker<'a, E: CostEngine, SS, SA> {
    config        : WorkerConfig<'a, E, SS, SA>,
    best          : EvaluationResult<E::Mapping, E::Stats>,
    invalidity    : InvalidityReport<E::Mapping>,
    total_mappings: u128,
    valid_mappings: u128
}

impl<'a, E, SS, SA> Worker<'a, E, SS, SA>
    where E : CostEngine + Default,
          SS: Subspace<Mapping = E::Mapping>,
          SA: SearchAlgorithm
{
    pub fn new(config: WorkerConfig<'a, E, SS, SA>) -> Self {
        let invalidity = InvalidityReport::new(config.arch_specs.num_levels());
        Worker {
            config,
            best: EvaluationResult::Invalid,
            invalidity,
            total_mappings: 0,
            valid_mappings: 0
        }
    }

    /// Runs the mapper loop until one of the termination conditions holds:
    /// the global terminate flag is raised, the valid-mapping quota is
    /// reached, the victory condition is met, `timeout` consecutive invalid
    /// mappings were seen, or the search cursor is exhausted.
    pub fn run(&mut self) {
        let mut engine = E::default();
        engine.spec(self.config.arch_specs);

        let mut total_mappings: u128 = 0;
        let mut valid_mappings: u128 = 0;
        let mut invalid_mappings_mapcnstr: u128 = 0;
        let mut invalid_mappings_eval: u128 = 0;
        let mut mappings_since_last_best_update: u32 = 0;

        // =================
        // Main mapper loop.
        // =================
        loop {
            if self.config.live_status {
                self.live_status_event(total_mappings, valid_mappings,
                                       invalid_mappings_mapcnstr + invalid_mappings_eval,
                                       mappings_since_last_best_update);
            }

            // Termination conditions.
            let mut terminate = false;

            if self.config.terminate.is_set() {
                self.statement("global termination flag activated, terminating search.");
                terminate = true;
            }
            if self.config.search_size > 0 && valid_mappings == self.config.search_size {
                self.statement(&format!("{} valid mappings found, terminating search.",
                                        self.config.search_size));
                terminate = true;
            }
            if self.config.victory_condition > 0
                && mappings_since_last_best_update == self.config.victory_condition {
                self.statement(&format!("{} suboptimal mappings found since the last upgrade, \
                                         terminating search.",
                                        self.config.victory_condition));
                terminate = true;
            }
            let consecutive_invalid = invalid_mappings_mapcnstr + invalid_mappings_eval;
            if consecutive_invalid > 0 && consecutive_invalid == self.config.timeout as u128 {
                self.statement(&format!("{} invalid mappings ({} construction, {} evaluation) \
                                         found since the last valid mapping, terminating search.",
                                        self.config.timeout,
                                        invalid_mappings_mapcnstr,
                                        invalid_mappings_eval));
                terminate = true;
            }

            // Try to obtain the next mapping id from the search algorithm.
            let next_id = self.config.search.next();
            if next_id.is_none() {
                self.statement("search algorithm is done, terminating search.");
                terminate = true;
            }
            let mapping_id = match next_id {
                Some(id) if !terminate => id,
                _                      => break
            };

            // Periodically sync the thread-local best with the global best.
            // Exactly one direction of transfer per sync: a successful pull
            // means the global already dominates anything this worker could
            // push back.
            if total_mappings != 0
                && self.config.sync_interval > 0
                && total_mappings % self.config.sync_interval == 0 {
                let mut critical = self.config.shared.lock();
                let pulled = self.best.update_if_better(&critical.best, self.config.metrics);
                if !pulled && self.best.valid() {
                    critical.best.update_if_better(&self.best, self.config.metrics);
                }
            }

            // Begin mapping. This is done in stages of increasing
            // algorithmic complexity, bailing out as early as possible.

            // Stage 1: construct a mapping from the mapping id. This can
            //          fail because the space of *legal* mappings is not
            //          dense, so an id may point to an illegal mapping.
            total_mappings += 1;
            let mapping = match self.config.subspace.construct(mapping_id) {
                Some(mapping) => mapping,
                None => {
                    invalid_mappings_mapcnstr += 1;
                    self.config.search.report(SearchStatus::MappingConstructionFailure, None);
                    continue;
                }
            };

            // Stage 2: lightweight pre-checks the engine can use to reject
            //          a mapping before paying for a full evaluation.
            let status_per_level =
                engine.pre_evaluate(&mapping, self.config.workload, !self.config.diagnostics);
            if !all_levels_succeeded(&status_per_level) {
                invalid_mappings_eval += 1;
                self.record_rejection(&status_per_level, &mapping);
                self.config.search.report(SearchStatus::EvalFailure, None);
                continue;
            }

            // Stage 3: heavyweight evaluation.
            let status_per_level =
                engine.evaluate(&mapping, self.config.workload, !self.config.diagnostics);
            if !all_levels_succeeded(&status_per_level) {
                invalid_mappings_eval += 1;
                self.record_rejection(&status_per_level, &mapping);
                self.config.search.report(SearchStatus::EvalFailure, None);
                continue;
            }

            // Success. The timeout counters measure *consecutive* invalids
            // since the last valid mapping, so both are reset here.
            let stats = engine.stats();
            valid_mappings += 1;
            if self.config.log_stats {
                let mut critical = self.config.shared.lock();
                let _ = writeln!(critical.log, "[{}] INVALID {} {} {}",
                                 self.config.thread_id, total_mappings, valid_mappings,
                                 invalid_mappings_mapcnstr + invalid_mappings_eval);
            }
            invalid_mappings_mapcnstr = 0;
            invalid_mappings_eval = 0;

            let primary_cost = cost(&stats, self.config.metrics[0]);
            self.config.search.report(SearchStatus::Success, Some(primary_cost));

            let utilization = stats.utilization();
            let energy_per_macc = stats.energy() / stats.maccs() as f64;
            if self.config.log_suboptimal {
                self.summary_line(utilization, energy_per_macc);
            }

            // Is the new mapping better than the previous best one?
            let incumbent_cost = self.best.stats()
                                          .map(|best| cost(best, self.config.metrics[0]));
            let result = EvaluationResult::Valid { mapping, stats };
            if self.best.update_if_better(&result, self.config.metrics) {
                tracing::debug!(thread = self.config.thread_id,
                                cost   = primary_cost,
                                "thread-local best updated");
                if self.config.log_stats {
                    let improvement = match incumbent_cost {
                        Some(incumbent) => (incumbent - primary_cost) / incumbent,
                        None            => 1.0
                    };
                    let mut critical = self.config.shared.lock();
                    let _ = writeln!(critical.log, "[{}] UPDATE {} {} {} {}",
                                     self.config.thread_id, total_mappings, valid_mappings,
                                     mappings_since_last_best_update, improvement);
                }
                if !self.config.log_suboptimal {
                    self.summary_line(utilization, energy_per_macc);
                }
                mappings_since_last_best_update = 0;
            } else {
                mappings_since_last_best_update += 1;
            }
        }

        self.total_mappings = total_mappings;
        self.valid_mappings = valid_mappings;
    }

    /// Consumes the worker and hands its local best, diagnostics and
    /// counters back to the coordinator.
    pub fn into_outcome(self) -> WorkerOutcome<E::Mapping, E::Stats> {
        WorkerOutcome {
            best          : self.best,
            invalidity    : self.invalidity,
            total_mappings: self.total_mappings,
            valid_mappings: self.valid_mappings
        }
    }

    /// Writes one termination statement to the shared run log and mirrors
    /// it as a structured event.
    fn statement(&self, message: &str) {
        tracing::debug!(thread = self.config.thread_id, "{}", message);
        let mut critical = self.config.shared.lock();
        let _ = writeln!(critical.log, "[{:3}] STATEMENT: {}",
                         self.config.thread_id, message);
    }

    /// Writes the one-line summary of a valid mapping to the shared run log.
    fn summary_line(&self, utilization: f64, energy_per_macc: f64) {
        let mut critical = self.config.shared.lock();
        let _ = writeln!(critical.log, "[{:3}] Utilization = {:4.2} | pJ/MACC = {:8.3}",
                         self.config.thread_id, utilization, energy_per_macc);
    }

    /// Emits the structured status snapshot an external live display can
    /// render.
    fn live_status_event(&self, total: u128, valid: u128, consecutive_invalid: u128,
                         since_last_update: u32) {
        let (utilization, energy_per_macc) = match self.best.stats() {
            Some(stats) => (stats.utilization(), stats.energy() / stats.maccs() as f64),
            None        => (0.0, 0.0)
        };
        tracing::trace!(
            thread              = self.config.thread_id,
            total               = total as u64,
            valid               = valid as u64,
            consecutive_invalid = consecutive_invalid as u64,
            since_last_update,
            utilization,
            energy_per_macc,
            "worker status"
        );
    }

    /// Attributes a rejected mapping to every failing topology level,
    /// keeping the first rejected mapping per level as a sample.
    fn record_rejection(&mut self, status_per_level: &[EvalStatus], mapping: &E::Mapping) {
        if !self.config.diagnostics {
            return;
        }
        for (level, status) in status_per_level.iter().enumerate() {
            if !status.success {
                self.invalidity.record(level, mapping);
            }
        }
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
