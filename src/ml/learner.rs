// ============================================================
// Layer 5 — Burn Learner
// ============================================================
// Implements the SequenceLearner capability on top of
// Seq2SeqModel.
//
// Key Burn insight:
//   - train_step runs on the AutodiffBackend B for gradients
//   - infer_step uses model.valid() → B::InnerBackend
//   - both backends share one device type
//
// Batches arrive time-major; tensors are built batch-major:
//   rows[t][b]  →  flat[b * T + t]  →  reshape [batch, T]
//
// The optimiser is plain SGD at a fixed learning rate. Before
// each update the gradients are clipped by their global norm:
//
//   norm  = sqrt(Σ over all parameters of Σ g²)
//   scale = max_grad_norm / max(norm, max_grad_norm)
//
// The pre-clipping norm is reported in StepOutcome::grad_norm.
//
// Token IDs are checked against both vocabulary sizes before
// any tensor is built.

use std::path::Path;

use burn::{
    module::{AutodiffModule, ModuleVisitor, Param},
    optim::{GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::Batch;
use crate::domain::bucket::BucketCatalog;
use crate::domain::error::{PipelineError, Result};
use crate::domain::traits::{Persistable, SequenceLearner, StepOutcome};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{Seq2SeqConfig, Seq2SeqModel};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Hyperparameters the learner needs beyond the model shape.
#[derive(Debug, Clone)]
pub struct LearnerOptions {
    pub learning_rate: f64,
    pub max_grad_norm: f32,
}

pub struct BurnLearner<B: AutodiffBackend, O> {
    model:          Seq2SeqModel<B>,
    optim:          O,
    catalog:        BucketCatalog,
    options:        LearnerOptions,
    enc_vocab_size: usize,
    dec_vocab_size: usize,
    device:         B::Device,
}

/// SGD at a fixed learning rate, with gradients clipped by global norm.
pub fn sgd_learner<B: AutodiffBackend>(
    model_cfg: &Seq2SeqConfig,
    catalog:   BucketCatalog,
    options:   LearnerOptions,
    device:    B::Device,
) -> BurnLearner<B, impl Optimizer<Seq2SeqModel<B>, B>> {
    let optim = SgdConfig::new().init::<B, Seq2SeqModel<B>>();
    BurnLearner::new(model_cfg, catalog, options, device, optim)
}

/// `sgd_learner` on the default WGPU device.
pub fn default_learner(
    model_cfg: &Seq2SeqConfig,
    catalog:   BucketCatalog,
    options:   LearnerOptions,
) -> BurnLearner<TrainBackend, impl Optimizer<Seq2SeqModel<TrainBackend>, TrainBackend>> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    sgd_learner::<TrainBackend>(model_cfg, catalog, options, device)
}

impl<B, O> BurnLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqModel<B>, B>,
{
    pub fn new(
        model_cfg: &Seq2SeqConfig,
        catalog:   BucketCatalog,
        options:   LearnerOptions,
        device:    B::Device,
        optim:     O,
    ) -> Self {
        let model: Seq2SeqModel<B> = model_cfg.init(&device);
        tracing::info!(
            "Seq2seq model ready: {} layers, hidden={}, vocab {} → {}",
            model_cfg.num_layers, model_cfg.hidden_size,
            model_cfg.enc_vocab_size, model_cfg.dec_vocab_size,
        );
        Self {
            model,
            optim,
            catalog,
            options,
            enc_vocab_size: model_cfg.enc_vocab_size,
            dec_vocab_size: model_cfg.dec_vocab_size,
            device,
        }
    }

    fn check(&self, bucket_id: usize, batch: &Batch) -> Result<()> {
        let bucket = self.catalog.get(bucket_id).ok_or_else(|| {
            PipelineError::Learner(format!("unknown bucket id {bucket_id}"))
        })?;
        batch.check_shape(bucket)?;
        check_ids("source", &batch.encoder_inputs, self.enc_vocab_size)?;
        check_ids("target", &batch.decoder_inputs, self.dec_vocab_size)
    }
}

fn check_ids(side: &str, rows: &[Vec<u32>], vocab_size: usize) -> Result<()> {
    match rows.iter().flatten().find(|&&id| id as usize >= vocab_size) {
        Some(id) => Err(PipelineError::Learner(format!(
            "{side} id {id} is outside the vocabulary of {vocab_size} tokens"
        ))),
        None => Ok(()),
    }
}

// ─── Gradient Clipping ────────────────────────────────────────────────────────
/// Sums the squared gradient of every float parameter that has one.
struct SquaredNorm<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    total: Option<Tensor<B::InnerBackend, 1>>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(param.id) {
            let squares = grad.powi_scalar(2).sum();
            self.total = Some(match self.total.take() {
                Some(total) => total + squares,
                None => squares,
            });
        }
    }
}

/// Multiplies every float parameter's gradient by `factor`.
struct ScaleGrads<'a> {
    grads:  &'a mut GradientsParams,
    factor: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for ScaleGrads<'_> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(param.id) {
            self.grads.register::<B::InnerBackend, D>(param.id, grad.mul_scalar(self.factor));
        }
    }
}

/// L2 norm over all of `model`'s gradients.
fn global_norm<B: AutodiffBackend>(model: &Seq2SeqModel<B>, grads: &GradientsParams) -> f64 {
    let mut visitor = SquaredNorm::<B> { grads, total: None };
    model.visit(&mut visitor);
    visitor
        .total
        .map(|t| t.into_scalar().elem::<f64>().sqrt())
        .unwrap_or(0.0)
}

/// Rescale `grads` so their global norm is at most `max_norm`.
/// Returns the norm before clipping.
fn clip_by_global_norm<B: AutodiffBackend>(
    model:    &Seq2SeqModel<B>,
    grads:    &mut GradientsParams,
    max_norm: f64,
) -> f64 {
    let norm = global_norm(model, grads);
    if norm.is_finite() && norm > max_norm {
        let mut visitor = ScaleGrads { grads, factor: max_norm / norm };
        model.visit(&mut visitor);
    }
    norm
}

// ─── Tensor Conversion ────────────────────────────────────────────────────────
/// Time-major rows → [batch, rows] Int tensor.
fn ids_tensor<B: Backend>(rows: &[Vec<u32>], device: &B::Device) -> Tensor<B, 2, Int> {
    let steps = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let flat: Vec<i32> = (0..width)
        .flat_map(|b| rows.iter().map(move |row| row[b] as i32))
        .collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([width, steps])
}

/// Time-major rows → [batch, rows] Float tensor.
fn weights_tensor<B: Backend>(rows: &[Vec<f32>], device: &B::Device) -> Tensor<B, 2> {
    let steps = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let flat: Vec<f32> = (0..width)
        .flat_map(|b| rows.iter().map(move |row| row[b]))
        .collect();
    Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([width, steps])
}

// ─── SequenceLearner ──────────────────────────────────────────────────────────
impl<B, O> SequenceLearner for BurnLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqModel<B>, B>,
{
    fn train_step(&mut self, bucket_id: usize, batch: &Batch) -> Result<StepOutcome> {
        self.check(bucket_id, batch)?;

        let source  = ids_tensor::<B>(&batch.encoder_inputs, &self.device);
        let decoder = ids_tensor::<B>(&batch.decoder_inputs, &self.device);
        let targets = ids_tensor::<B>(&batch.shifted_targets(), &self.device);
        let masks   = weights_tensor::<B>(&batch.decoder_masks, &self.device);

        let loss = self.model.forward_loss(source, decoder, targets, masks);
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        if !loss_val.is_finite() {
            return Err(PipelineError::Learner(format!(
                "non-finite loss {loss_val} in bucket {bucket_id}"
            )));
        }

        // Backward pass, global-norm clipping, SGD update
        let grads = loss.backward();
        let mut grads = GradientsParams::from_grads(grads, &self.model);
        let norm = clip_by_global_norm(&self.model, &mut grads, self.options.max_grad_norm as f64);
        if !norm.is_finite() {
            return Err(PipelineError::Learner(format!(
                "non-finite gradient norm in bucket {bucket_id}"
            )));
        }
        self.model = self.optim.step(self.options.learning_rate, self.model.clone(), grads);

        Ok(StepOutcome { grad_norm: Some(norm as f32), loss: loss_val as f32 })
    }

    fn infer_step(&self, bucket_id: usize, batch: &Batch) -> Result<Vec<Vec<Vec<f32>>>> {
        self.check(bucket_id, batch)?;

        // model.valid() → Seq2SeqModel<B::InnerBackend>, no autodiff graph
        let model = self.model.valid();
        let source = ids_tensor::<B::InnerBackend>(&batch.encoder_inputs, &self.device);
        let first  = batch.decoder_inputs.first().cloned().unwrap_or_default();
        let first: Vec<i32> = first.iter().map(|&id| id as i32).collect();
        let first = Tensor::<B::InnerBackend, 1, Int>::from_ints(first.as_slice(), &self.device);

        let width = batch.batch_size();
        model
            .greedy(source, first, batch.decoder_len())
            .into_iter()
            .map(|probs| {
                let flat = probs
                    .into_data()
                    .to_vec::<f32>()
                    .map_err(|e| PipelineError::Learner(format!("cannot read output: {e:?}")))?;
                let vocab = flat.len() / width.max(1);
                Ok(flat.chunks(vocab.max(1)).map(<[f32]>::to_vec).collect())
            })
            .collect()
    }
}

// ─── Persistable ──────────────────────────────────────────────────────────────
impl<B, O> Persistable for BurnLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2SeqModel<B>, B>,
{
    fn save(&self, dir: &Path, iteration: usize) -> Result<()> {
        CheckpointManager::new(dir).save_model::<B, _>(&self.model, iteration)
    }

    fn restore(&mut self, dir: &Path) -> Result<usize> {
        let (model, iteration) =
            CheckpointManager::new(dir).load_model::<B, _>(self.model.clone(), &self.device)?;
        self.model = model;
        Ok(iteration)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use crate::data::batcher::BatchBuilder;
    use crate::domain::bucket::Bucket;
    use crate::domain::example::{Example, EOS_ID, START_ID};

    type TestBackend = Autodiff<NdArray>;

    fn learner() -> BurnLearner<TestBackend, impl Optimizer<Seq2SeqModel<TestBackend>, TestBackend>> {
        let catalog = BucketCatalog::from_pairs(&[(3, 4), (5, 6)]).unwrap();
        let options = LearnerOptions { learning_rate: 0.5, max_grad_norm: 5.0 };
        sgd_learner::<TestBackend>(&Seq2SeqConfig::new(10, 12, 8, 2), catalog, options, Default::default())
    }

    fn batch() -> Batch {
        let a = Example::new(vec![4, 5], vec![START_ID, 6, EOS_ID]);
        let b = Example::new(vec![7], vec![START_ID, 8, 9, EOS_ID]);
        BatchBuilder::from_examples(&[&a, &b], Bucket::new(3, 4)).unwrap()
    }

    #[test]
    fn test_ids_tensor_is_batch_major() {
        let rows = vec![vec![1, 2], vec![3, 4], vec![5, 6]];
        let t = ids_tensor::<NdArray>(&rows, &Default::default());
        assert_eq!(t.dims(), [2, 3]);
        let flat = t.into_data().to_vec::<i64>().unwrap();
        assert_eq!(flat, vec![1, 3, 5, 2, 4, 6]);
    }

    #[test]
    fn test_train_step_reports_finite_loss() {
        let mut l = learner();
        let out = l.train_step(0, &batch()).unwrap();
        assert!(out.loss.is_finite());
        assert!(out.loss > 0.0);
        let norm = out.grad_norm.unwrap();
        assert!(norm.is_finite() && norm > 0.0);
    }

    #[test]
    fn test_clipping_caps_the_global_norm() {
        let device = Default::default();
        let model: Seq2SeqModel<TestBackend> = Seq2SeqConfig::new(10, 12, 8, 1).init(&device);
        let b = batch();
        let loss = model.forward_loss(
            ids_tensor::<TestBackend>(&b.encoder_inputs, &device),
            ids_tensor::<TestBackend>(&b.decoder_inputs, &device),
            ids_tensor::<TestBackend>(&b.shifted_targets(), &device),
            weights_tensor::<TestBackend>(&b.decoder_masks, &device),
        );
        let mut grads = GradientsParams::from_grads(loss.backward(), &model);

        let before = global_norm(&model, &grads);
        assert!(before > 0.0);
        let max_norm = before / 4.0;
        assert!((clip_by_global_norm(&model, &mut grads, max_norm) - before).abs() < 1e-9);
        assert!((global_norm(&model, &grads) - max_norm).abs() < 1e-3 * before);

        // already under the cap: left alone
        let after = global_norm(&model, &grads);
        clip_by_global_norm(&model, &mut grads, before);
        assert!((global_norm(&model, &grads) - after).abs() < 1e-6 * before);
    }

    #[test]
    fn test_ids_outside_vocabulary_are_rejected() {
        let mut l = learner();
        let bad_source = Example::new(vec![4, 50], vec![START_ID, 6, EOS_ID]);
        let batch = BatchBuilder::from_examples(&[&bad_source], Bucket::new(3, 4)).unwrap();
        match l.train_step(0, &batch) {
            Err(PipelineError::Learner(msg)) => assert!(msg.contains("source id 50")),
            other => panic!("expected a learner error, got {other:?}"),
        }

        let bad_target = Example::new(vec![4], vec![START_ID, 12, EOS_ID]);
        let batch = BatchBuilder::from_examples(&[&bad_target], Bucket::new(3, 4)).unwrap();
        assert!(matches!(l.infer_step(0, &batch), Err(PipelineError::Learner(_))));
    }

    #[test]
    fn test_wrong_bucket_is_rejected() {
        let mut l = learner();
        assert!(matches!(
            l.train_step(1, &batch()),
            Err(PipelineError::LengthInvariant { .. })
        ));
        assert!(matches!(l.train_step(9, &batch()), Err(PipelineError::Learner(_))));
    }

    #[test]
    fn test_infer_step_shape() {
        let l = learner();
        let single = BatchBuilder::single(&[4, 5], Bucket::new(3, 4)).unwrap();
        let out = l.infer_step(0, &single).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].len(), 12);
    }

    #[test]
    fn test_save_and_restore_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let l = learner();
        l.save(dir.path(), 17).unwrap();
        let mut fresh = learner();
        assert_eq!(fresh.restore(dir.path()).unwrap(), 17);
    }
}
