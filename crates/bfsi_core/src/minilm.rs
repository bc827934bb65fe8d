use std::path::Path;

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::ops::softmax;
use candle_nn::{embedding, layer_norm, linear, Embedding, LayerNorm, LayerNormConfig, Linear, VarBuilder};

use crate::embed::EmbeddingProvider;
use crate::error::{PipelineError, Result};

// Dimensions of sentence-transformers/all-MiniLM-L6-v2.
const HIDDEN_SIZE: usize = 384;
const INTERMEDIATE_SIZE: usize = 1536;
const NUM_HEADS: usize = 12;
const HEAD_DIM: usize = HIDDEN_SIZE / NUM_HEADS;
const NUM_LAYERS: usize = 6;
const VOCAB_SIZE: usize = 30522;
const MAX_POSITIONS: usize = 512;
const TYPE_VOCAB_SIZE: usize = 2;
const LAYER_NORM_EPS: f64 = 1e-12;

fn norm(vb: VarBuilder) -> candle_core::Result<LayerNorm> {
    let config = LayerNormConfig {
        eps: LAYER_NORM_EPS,
        remove_mean: true,
        affine: true,
    };
    layer_norm(HIDDEN_SIZE, config, vb)
}

struct InputEmbeddings {
    word: Embedding,
    position: Embedding,
    token_type: Embedding,
    norm: LayerNorm,
}

impl InputEmbeddings {
    fn load(vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            word: embedding(VOCAB_SIZE, HIDDEN_SIZE, vb.pp("word_embeddings"))?,
            position: embedding(MAX_POSITIONS, HIDDEN_SIZE, vb.pp("position_embeddings"))?,
            token_type: embedding(TYPE_VOCAB_SIZE, HIDDEN_SIZE, vb.pp("token_type_embeddings"))?,
            norm: norm(vb.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, token_ids: &Tensor) -> candle_core::Result<Tensor> {
        let (_, seq_len) = token_ids.dims2()?;
        let device = token_ids.device();

        let positions = Tensor::arange(0u32, seq_len as u32, device)?.unsqueeze(0)?;
        let token_types = token_ids.zeros_like()?;

        let summed = ((self.word.forward(token_ids)? + self.position.forward(&positions)?)?
            + self.token_type.forward(&token_types)?)?;
        self.norm.forward(&summed)
    }
}

struct EncoderLayer {
    query: Linear,
    key: Linear,
    value: Linear,
    attn_output: Linear,
    attn_norm: LayerNorm,
    intermediate: Linear,
    output: Linear,
    output_norm: LayerNorm,
}

impl EncoderLayer {
    fn load(vb: VarBuilder) -> candle_core::Result<Self> {
        let attn = vb.pp("attention");
        Ok(Self {
            query: linear(HIDDEN_SIZE, HIDDEN_SIZE, attn.pp("self").pp("query"))?,
            key: linear(HIDDEN_SIZE, HIDDEN_SIZE, attn.pp("self").pp("key"))?,
            value: linear(HIDDEN_SIZE, HIDDEN_SIZE, attn.pp("self").pp("value"))?,
            attn_output: linear(HIDDEN_SIZE, HIDDEN_SIZE, attn.pp("output").pp("dense"))?,
            attn_norm: norm(attn.pp("output").pp("LayerNorm"))?,
            intermediate: linear(HIDDEN_SIZE, INTERMEDIATE_SIZE, vb.pp("intermediate").pp("dense"))?,
            output: linear(INTERMEDIATE_SIZE, HIDDEN_SIZE, vb.pp("output").pp("dense"))?,
            output_norm: norm(vb.pp("output").pp("LayerNorm"))?,
        })
    }

    fn split_heads(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;
        x.reshape((batch, seq_len, NUM_HEADS, HEAD_DIM))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;

        let q = self.split_heads(&self.query.forward(x)?)?;
        let k = self.split_heads(&self.key.forward(x)?)?;
        let v = self.split_heads(&self.value.forward(x)?)?;

        let scale = 1.0 / (HEAD_DIM as f64).sqrt();
        let scores = (q.matmul(&k.t()?)? * scale)?;
        let probs = softmax(&scores, D::Minus1)?;

        let context = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq_len, HIDDEN_SIZE))?;

        // Post-norm residuals, BERT style.
        let x = (x + self.attn_output.forward(&context)?)?;
        let x = self.attn_norm.forward(&x)?;

        let ffn = self.output.forward(&self.intermediate.forward(&x)?.gelu_erf()?)?;
        self.output_norm.forward(&(ffn + x)?)
    }
}

struct MiniLmEncoder {
    embeddings: InputEmbeddings,
    layers: Vec<EncoderLayer>,
}

impl MiniLmEncoder {
    fn load(weights: &Path, device: &Device) -> Result<Self> {
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device)? };

        let embeddings = InputEmbeddings::load(vb.pp("embeddings"))?;
        let mut layers = Vec::with_capacity(NUM_LAYERS);
        for i in 0..NUM_LAYERS {
            layers.push(EncoderLayer::load(
                vb.pp("encoder").pp("layer").pp(i.to_string()),
            )?);
        }

        Ok(Self { embeddings, layers })
    }

    /// Mean-pooled, L2-normalized sentence embedding for one token sequence.
    fn encode(&self, token_ids: &[u32]) -> Result<Vec<f32>> {
        let device = self.embeddings.word.embeddings().device();
        let ids = Tensor::new(token_ids, device)?.unsqueeze(0)?;

        let mut hidden = self.embeddings.forward(&ids)?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden)?;
        }

        let pooled = hidden.mean(1)?.squeeze(0)?;
        let norm_val: f32 = pooled.sqr()?.sum_all()?.sqrt()?.to_scalar()?;
        let normalized = if norm_val > 0.0 {
            pooled.affine(1.0 / norm_val as f64, 0.0)?
        } else {
            pooled
        };

        Ok(normalized.to_vec1::<f32>()?)
    }
}

/// Local all-MiniLM-L6-v2 sentence embedder (384-dim). Loads once at
/// startup; inference is pure computation with no I/O, so the provider is
/// shareable across query-handling threads.
pub struct MiniLmEmbeddingProvider {
    encoder: MiniLmEncoder,
    tokenizer: tokenizers::Tokenizer,
}

impl MiniLmEmbeddingProvider {
    pub fn load(weights: &Path, tokenizer: &Path) -> Result<Self> {
        let encoder = MiniLmEncoder::load(weights, &Device::Cpu)?;
        let tokenizer = tokenizers::Tokenizer::from_file(tokenizer)
            .map_err(|e| PipelineError::Embedding(format!("load tokenizer: {e}")))?;
        Ok(Self { encoder, tokenizer })
    }
}

impl EmbeddingProvider for MiniLmEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| PipelineError::Embedding(format!("tokenize: {e}")))?;

        let mut token_ids: Vec<u32> = encoding.get_ids().to_vec();
        token_ids.truncate(MAX_POSITIONS);

        self.encoder.encode(&token_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;
    use std::path::PathBuf;

    fn model_files() -> Option<(PathBuf, PathBuf)> {
        let base = Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()?
            .parent()?
            .join("models");
        let weights = base.join("all-MiniLM-L6-v2.safetensors");
        let tokenizer = base.join("all-MiniLM-L6-v2-tokenizer.json");
        if weights.exists() && tokenizer.exists() {
            Some((weights, tokenizer))
        } else {
            None
        }
    }

    #[test]
    fn embeds_to_normalized_384_dims() {
        let Some((weights, tokenizer)) = model_files() else {
            eprintln!("Skipping: all-MiniLM-L6-v2 weights not found");
            return;
        };

        let provider = MiniLmEmbeddingProvider::load(&weights, &tokenizer).unwrap();
        let v = provider.embed("What is the penalty for loan prepayment?").unwrap();

        assert_eq!(v.len(), 384);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01, "L2 norm should be ~1.0, got {norm}");
    }

    #[test]
    fn related_queries_score_higher_than_unrelated() {
        let Some((weights, tokenizer)) = model_files() else {
            eprintln!("Skipping: all-MiniLM-L6-v2 weights not found");
            return;
        };

        let provider = MiniLmEmbeddingProvider::load(&weights, &tokenizer).unwrap();
        let base = provider.embed("How do I block a lost debit card?").unwrap();
        let related = provider.embed("My card was stolen, how can I block it?").unwrap();
        let unrelated = provider.embed("What is the capital of France?").unwrap();

        assert!(
            cosine_similarity(&base, &related) > cosine_similarity(&base, &unrelated),
            "related banking questions should be closer"
        );
    }
}
