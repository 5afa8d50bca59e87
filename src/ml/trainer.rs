// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Iteration-driven training over the bucketed dataset.
//
// Each iteration:
//   1. draw u ~ U[0,1) and pick the first bucket whose
//      cumulative scale exceeds u
//   2. sample a batch from that bucket's pool (with replacement)
//   3. check the batch shape, then one learner step
//   4. add the step loss to the window accumulator
//
// Logging schedule (iteration counts steps already taken):
//   iteration 0       → report the very first loss, reset
//   iteration % log   → report total / steps_per_log, reset,
//                       append a row to metrics.csv
//
// Phase:  Init ──run──▶ Running ──done──▶ Checkpointed
//                          │
//                          └──learner error──▶ Failed
//
// A failed step is never retried; the error goes straight to
// the caller and nothing is saved.

use std::path::PathBuf;

use rand::Rng;

use crate::data::batcher::BatchBuilder;
use crate::data::dataset::{BucketedDataset, SamplingDistribution};
use crate::domain::error::{PipelineError, Result};
use crate::domain::traits::{Persistable, SequenceLearner};
use crate::infra::metrics::{MetricsLogger, WindowMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerPhase {
    Init,
    Running,
    Checkpointed,
    Failed,
}

/// Schedule and batch settings for one run.
#[derive(Debug, Clone)]
pub struct TrainerSettings {
    pub batch_size:           usize,
    pub max_iterations:       usize,
    pub steps_per_log:        usize,
    /// 0 = save only when the loop finishes
    pub steps_per_checkpoint: usize,
    pub checkpoint_dir:       PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Iteration counter at exit, as stored in the checkpoint
    pub iterations:       usize,
    pub steps_taken:      usize,
    pub best_window_loss: Option<f64>,
    pub stopped_early:    bool,
}

pub struct Trainer<'a, L, R> {
    learner:      L,
    dataset:      &'a BucketedDataset,
    distribution: SamplingDistribution,
    settings:     TrainerSettings,
    rng:          R,
    metrics:      Option<MetricsLogger>,
    iteration:    usize,
    total_loss:   f64,
    phase:        TrainerPhase,
}

impl<'a, L, R> Trainer<'a, L, R>
where
    L: SequenceLearner + Persistable,
    R: Rng,
{
    pub fn new(
        learner:  L,
        dataset:  &'a BucketedDataset,
        settings: TrainerSettings,
        rng:      R,
    ) -> Result<Self> {
        if settings.steps_per_log == 0 {
            return Err(PipelineError::InvalidConfig("steps_per_log must be at least 1".to_string()));
        }
        let distribution = dataset.sampling_distribution()?;
        tracing::info!("Bucket scale: {:?}", distribution.scale());
        Ok(Self {
            learner,
            dataset,
            distribution,
            settings,
            rng,
            metrics: None,
            iteration: 0,
            total_loss: 0.0,
            phase: TrainerPhase::Init,
        })
    }

    pub fn with_metrics(mut self, metrics: MetricsLogger) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Continue counting from a restored checkpoint.
    pub fn resume_from(mut self, iteration: usize) -> Self {
        tracing::info!("Resuming from iteration {}", iteration);
        self.iteration = iteration;
        self
    }

    #[cfg(test)]
    pub fn phase(&self) -> TrainerPhase { self.phase }

    #[cfg(test)]
    pub fn iteration(&self) -> usize { self.iteration }

    #[cfg(test)]
    pub fn into_learner(self) -> L { self.learner }

    /// Run until `max_iterations` has been passed or `should_stop` returns true.
    /// `should_stop` is consulted before every iteration.
    pub fn run<F>(&mut self, mut should_stop: F) -> Result<TrainingSummary>
    where
        F: FnMut(usize) -> bool,
    {
        self.phase = TrainerPhase::Running;
        let mut steps_taken = 0usize;
        let mut best: Option<f64> = None;
        let mut stopped_early = false;

        while self.iteration <= self.settings.max_iterations {
            if should_stop(self.iteration) {
                tracing::info!("Stop requested at iteration {}", self.iteration);
                stopped_early = true;
                break;
            }

            let loss = match self.step() {
                Ok(loss) => loss,
                Err(e) => {
                    self.phase = TrainerPhase::Failed;
                    tracing::warn!("Trainer {:?} at iteration {}: {}", self.phase, self.iteration, e);
                    return Err(e);
                }
            };
            steps_taken += 1;
            self.total_loss += loss;

            if self.iteration == 0 {
                println!("Iter {:>6} | loss={:.4}", self.iteration, self.total_loss);
                self.total_loss = 0.0;
            }

            self.iteration += 1;

            if self.iteration % self.settings.steps_per_log == 0 {
                let window = WindowMetrics::new(
                    self.iteration,
                    self.total_loss / self.settings.steps_per_log as f64,
                );
                println!("Iter {:>6} | avg_loss={:.4}", window.iteration, window.avg_loss);
                if best.map_or(true, |b| window.is_improvement(b)) {
                    best = Some(window.avg_loss);
                }
                if let Some(m) = &self.metrics {
                    m.log(&window)?;
                }
                self.total_loss = 0.0;
            }

            let every = self.settings.steps_per_checkpoint;
            if every > 0 && self.iteration % every == 0 {
                self.learner.save(&self.settings.checkpoint_dir, self.iteration)?;
                tracing::info!("Periodic checkpoint at iteration {}", self.iteration);
            }
        }

        self.learner.save(&self.settings.checkpoint_dir, self.iteration)?;
        self.phase = TrainerPhase::Checkpointed;
        tracing::info!(
            "Trainer {:?}: checkpoint saved at iteration {} to '{}'",
            self.phase,
            self.iteration,
            self.settings.checkpoint_dir.display()
        );

        Ok(TrainingSummary {
            iterations: self.iteration,
            steps_taken,
            best_window_loss: best,
            stopped_early,
        })
    }

    fn step(&mut self) -> Result<f64> {
        let u: f64 = self.rng.gen();
        let bucket_id = self.distribution.sample(u);
        let dataset = self.dataset;
        let pool = dataset.pool(bucket_id).ok_or(PipelineError::EmptyDataset)?;

        let batch = BatchBuilder::build(
            pool,
            pool.bucket(),
            self.settings.batch_size,
            &mut self.rng,
        )?;
        batch.check_shape(pool.bucket())?;

        let outcome = self.learner.train_step(bucket_id, &batch)?;
        if let Some(norm) = outcome.grad_norm {
            tracing::debug!("iteration {} bucket {} grad_norm={:.4}", self.iteration, bucket_id, norm);
        }
        Ok(outcome.loss as f64)
    }
}
