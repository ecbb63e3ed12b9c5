use anyhow::{Result, anyhow};
use std::time::Instant;

use candle_core::{Device, Module, Tensor};
use candle_nn::{linear, Linear};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaForSequenceClassification};
use tokenizers::{Encoding, Tokenizer};

use medrag_core::traits::CrossEncoder;

use crate::backbone::{Family, ModelFiles};
use crate::tokenize::{pad_batch, pad_id};

const MAX_LEN: usize = 512;

enum Head {
    /// BERT encoder + tanh pooler + single-logit classifier (ms-marco style).
    Bert { bert: BertModel, pooler: Linear, classifier: Linear },
    XlmRoberta(XLMRobertaForSequenceClassification),
}

/// Sequence-classification model scoring (query, passage) pairs jointly.
pub struct CandleCrossEncoder {
    model_id: String,
    head: Head,
    tokenizer: Tokenizer,
    device: Device,
    pad_id: u32,
}

impl CandleCrossEncoder {
    pub fn load(model_id: &str, files: &ModelFiles, device: Device) -> Result<Self> {
        tracing::info!(model = model_id, dir = %files.dir.display(), "loading cross-encoder");
        let tokenizer = files.tokenizer(MAX_LEN)?;
        let vb = files.var_builder(&device)?;
        let head = match files.family {
            Family::Bert => {
                let config: BertConfig = serde_json::from_value(files.raw_config.clone())?;
                let hidden = files.hidden_size()?;
                let bert = BertModel::load(vb.clone(), &config)?;
                let pooler = linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
                let classifier = linear(hidden, 1, vb.pp("classifier"))?;
                Head::Bert { bert, pooler, classifier }
            }
            Family::XlmRoberta => {
                let config: XLMRobertaConfig = serde_json::from_value(files.raw_config.clone())?;
                Head::XlmRoberta(XLMRobertaForSequenceClassification::new(1, &config, vb)?)
            }
        };
        let pad_id = pad_id(&tokenizer);
        Ok(Self { model_id: model_id.to_string(), head, tokenizer, device, pad_id })
    }

    fn logits(&self, encodings: &[Encoding]) -> Result<Vec<f32>> {
        let inputs = pad_batch(encodings, MAX_LEN, self.pad_id, &self.device)?;
        let logits: Tensor = match &self.head {
            Head::Bert { bert, pooler, classifier } => {
                let hidden = bert.forward(&inputs.input_ids, &inputs.token_type_ids, Some(&inputs.attention_mask))?;
                let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
                let pooled = pooler.forward(&cls)?.tanh()?;
                classifier.forward(&pooled)?
            }
            Head::XlmRoberta(model) => model.forward(&inputs.input_ids, &inputs.attention_mask, &inputs.token_type_ids)?,
        };
        Ok(logits.to_device(&Device::Cpu)?.flatten_all()?.to_vec1()?)
    }
}

impl CrossEncoder for CandleCrossEncoder {
    fn model_id(&self) -> &str { &self.model_id }

    fn score_pairs(&self, query: &str, passages: &[String]) -> Result<Vec<Result<f32>>> {
        if passages.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        // Pairs that fail to tokenize are reported individually and left out of the forward pass.
        let mut scores: Vec<Result<f32>> = Vec::with_capacity(passages.len());
        let mut encodings = Vec::with_capacity(passages.len());
        let mut slots = Vec::with_capacity(passages.len());
        for (i, passage) in passages.iter().enumerate() {
            match self.tokenizer.encode((query, passage.as_str()), true) {
                Ok(enc) => { encodings.push(enc); slots.push(i); scores.push(Ok(0.0)); }
                Err(e) => scores.push(Err(anyhow!("tokenization failed for pair {}: {}", i, e))),
            }
        }
        if !encodings.is_empty() {
            let logits = self.logits(&encodings)?;
            if logits.len() != encodings.len() {
                return Err(anyhow!("cross-encoder returned {} logits for {} pairs", logits.len(), encodings.len()));
            }
            for (slot, logit) in slots.into_iter().zip(logits) { scores[slot] = Ok(logit); }
        }
        tracing::debug!(pairs = passages.len(), elapsed_ms = start.elapsed().as_millis() as u64, "scored pairs");
        Ok(scores)
    }
}
