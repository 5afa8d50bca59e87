// ============================================================
// Layer 5 — Seq2Seq Model
// ============================================================
// Shapes, for a batch of b examples:
//
//   source ids   [b, S] → embedding [b, S, h] → GRU × L
//                         → outputs [b, S, h], states L × [b, h]
//   decoder ids  [b, T] → embedding [b, T, h] → GRU × L (seeded)
//                         → attention over the encoder outputs
//                         → tanh(W [x; context]) → logits [b, T, V]
//
// Reference: Cho et al. (2014) GRU encoder-decoder
//            Luong et al. (2015) dot-product attention

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{log_softmax, softmax, tanh},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub enc_vocab_size: usize,
    pub dec_vocab_size: usize,
    pub hidden_size:    usize,
    pub num_layers:     usize,
}

impl Seq2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2SeqModel<B> {
        let h = self.hidden_size;
        let encoder = (0..self.num_layers)
            .map(|_| GruConfig::new(h, h, true).init(device))
            .collect();
        let decoder = (0..self.num_layers)
            .map(|_| GruConfig::new(h, h, true).init(device))
            .collect();
        Seq2SeqModel {
            enc_embedding: EmbeddingConfig::new(self.enc_vocab_size, h).init(device),
            dec_embedding: EmbeddingConfig::new(self.dec_vocab_size, h).init(device),
            encoder,
            decoder,
            attn_combine: LinearConfig::new(2 * h, h).init(device),
            output:       LinearConfig::new(h, self.dec_vocab_size).init(device),
        }
    }
}

/// Embedding → stacked GRU encoder, and embedding → stacked GRU decoder
/// with dot-product attention over the encoder outputs, projected to the
/// target vocabulary. Decoder layer `l` starts from the final state of
/// encoder layer `l`.
#[derive(Module, Debug)]
pub struct Seq2SeqModel<B: Backend> {
    pub enc_embedding: Embedding<B>,
    pub dec_embedding: Embedding<B>,
    pub encoder:       Vec<Gru<B>>,
    pub decoder:       Vec<Gru<B>>,
    pub attn_combine:  Linear<B>,
    pub output:        Linear<B>,
}

/// Encoder outputs of the top layer plus the final state of every layer.
pub struct Encoded<B: Backend> {
    pub outputs: Tensor<B, 3>,
    pub states:  Vec<Tensor<B, 2>>,
}

/// [batch, seq, hidden] → the hidden vector at the last step, [batch, hidden]
fn last_step<B: Backend>(x: &Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, seq, hidden] = x.dims();
    x.clone()
        .slice([0..batch, seq - 1..seq, 0..hidden])
        .reshape([batch, hidden])
}

impl<B: Backend> Seq2SeqModel<B> {
    /// source_ids: [batch, src_len]
    pub fn encode(&self, source_ids: Tensor<B, 2, Int>) -> Encoded<B> {
        let mut x = self.enc_embedding.forward(source_ids);
        let mut states = Vec::with_capacity(self.encoder.len());
        for layer in &self.encoder {
            x = layer.forward(x, None);
            states.push(last_step(&x));
        }
        Encoded { outputs: x, states }
    }

    /// Run the decoder over `decoder_ids` ([batch, steps]) from `states`.
    /// Returns logits [batch, steps, vocab] and the updated layer states.
    pub fn decode(
        &self,
        decoder_ids: Tensor<B, 2, Int>,
        states:      &[Tensor<B, 2>],
        enc_outputs: &Tensor<B, 3>,
    ) -> (Tensor<B, 3>, Vec<Tensor<B, 2>>) {
        let mut x = self.dec_embedding.forward(decoder_ids);
        let mut next_states = Vec::with_capacity(self.decoder.len());
        for (layer, state) in self.decoder.iter().zip(states) {
            x = layer.forward(x, Some(state.clone()));
            next_states.push(last_step(&x));
        }

        // [batch, steps, hidden] x [batch, hidden, src] → [batch, steps, src]
        let scores  = x.clone().matmul(enc_outputs.clone().swap_dims(1, 2));
        let weights = softmax(scores, 2);
        let context = weights.matmul(enc_outputs.clone());

        let combined = tanh(self.attn_combine.forward(Tensor::cat(vec![x, context], 2)));
        (self.output.forward(combined), next_states)
    }

    /// Teacher-forced loss, weighted by the decoder masks.
    ///
    /// targets, masks: [batch, steps], aligned with `decoder_ids`.
    pub fn forward_loss(
        &self,
        source_ids:  Tensor<B, 2, Int>,
        decoder_ids: Tensor<B, 2, Int>,
        targets:     Tensor<B, 2, Int>,
        masks:       Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        let encoded = self.encode(source_ids);
        let (logits, _) = self.decode(decoder_ids, &encoded.states, &encoded.outputs);

        let [batch, steps, vocab] = logits.dims();
        let n = batch * steps;
        let log_probs = log_softmax(logits.reshape([n, vocab]), 1);
        let picked = log_probs
            .gather(1, targets.reshape([n, 1]))
            .reshape([n]);
        let weights = masks.reshape([n]);

        let total = weights.clone().sum().clamp_min(1.0);
        (picked * weights).sum().neg() / total
    }

    /// Feed-previous decoding: step 0 consumes `first_ids` ([batch]),
    /// every later step consumes the previous step's argmax.
    /// Returns `steps` probability tensors of shape [batch, vocab].
    pub fn greedy(
        &self,
        source_ids: Tensor<B, 2, Int>,
        first_ids:  Tensor<B, 1, Int>,
        steps:      usize,
    ) -> Vec<Tensor<B, 2>> {
        let encoded = self.encode(source_ids);
        let [batch] = first_ids.dims();
        let mut input = first_ids.reshape([batch, 1]);
        let mut states = encoded.states;
        let mut outputs = Vec::with_capacity(steps);

        for _ in 0..steps {
            let (logits, next) = self.decode(input, &states, &encoded.outputs);
            let [b, _, vocab] = logits.dims();
            let probs = softmax(logits.reshape([b, vocab]), 1);
            input = probs.clone().argmax(1);
            states = next;
            outputs.push(probs);
        }
        outputs
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn model() -> (Seq2SeqModel<TestBackend>, <TestBackend as Backend>::Device) {
        let device = Default::default();
        let cfg = Seq2SeqConfig::new(11, 13, 8, 2);
        (cfg.init(&device), device)
    }

    fn ids(data: &[i32], shape: [usize; 2], device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(data, device).reshape(shape)
    }

    #[test]
    fn test_encode_shapes() {
        let (m, device) = model();
        let enc = m.encode(ids(&[0, 4, 5, 0, 0, 6], [2, 3], &device));
        assert_eq!(enc.outputs.dims(), [2, 3, 8]);
        assert_eq!(enc.states.len(), 2);
        assert_eq!(enc.states[0].dims(), [2, 8]);
    }

    #[test]
    fn test_loss_is_finite_and_positive() {
        let (m, device) = model();
        let src = ids(&[0, 4, 5, 0, 0, 6], [2, 3], &device);
        let dec = ids(&[2, 7, 3, 2, 3, 0], [2, 3], &device);
        let tgt = ids(&[7, 3, 0, 3, 0, 0], [2, 3], &device);
        let masks = Tensor::<TestBackend, 1>::from_floats([1.0, 1.0, 0.0, 1.0, 0.0, 0.0], &device)
            .reshape([2, 3]);
        let loss: f64 = m.forward_loss(src, dec, tgt, masks).into_scalar().elem::<f64>();
        assert!(loss.is_finite());
        assert!(loss > 0.0);
    }

    #[test]
    fn test_greedy_emits_one_distribution_per_step() {
        let (m, device) = model();
        let src = ids(&[0, 4, 5], [1, 3], &device);
        let first = Tensor::<TestBackend, 1, Int>::from_ints([2], &device);
        let out = m.greedy(src, first, 4);
        assert_eq!(out.len(), 4);
        let probs = out[0].clone().into_data().to_vec::<f32>().unwrap();
        assert_eq!(probs.len(), 13);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }
}
