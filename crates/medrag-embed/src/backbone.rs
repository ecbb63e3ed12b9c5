//! Loading of local HuggingFace-style model directories.
//!
//! A model directory holds `config.json`, `tokenizer.json` and either
//! `model.safetensors` or `pytorch_model.bin`. BERT and XLM-RoBERTa encoders
//! are supported, selected by `model_type` in `config.json`.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::{Tokenizer, TruncationParams};

use crate::tokenize::BatchInputs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Bert,
    XlmRoberta,
}

pub struct ModelFiles {
    pub dir: PathBuf,
    pub family: Family,
    pub raw_config: serde_json::Value,
}

impl ModelFiles {
    pub fn open(dir: PathBuf) -> Result<Self> {
        let config_path = dir.join("config.json");
        let raw_config: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&config_path).map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?)?;
        let family = match raw_config.get("model_type").and_then(|v| v.as_str()) {
            Some("bert") | None => Family::Bert,
            Some("xlm-roberta") | Some("roberta") => Family::XlmRoberta,
            Some(other) => return Err(anyhow!("Unsupported model_type '{}' in {}", other, config_path.display())),
        };
        Ok(Self { dir, family, raw_config })
    }

    pub fn hidden_size(&self) -> Result<usize> {
        self.raw_config.get("hidden_size").and_then(|v| v.as_u64()).map(|v| v as usize).ok_or_else(|| anyhow!("config.json has no hidden_size"))
    }

    pub fn tokenizer(&self, max_len: usize) -> Result<Tokenizer> {
        let path = self.dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&path).map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        Ok(tokenizer)
    }

    pub fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        let safetensors = self.dir.join("model.safetensors");
        if safetensors.exists() {
            let bytes = std::fs::read(&safetensors).map_err(|e| anyhow!("Failed to read {}: {}", safetensors.display(), e))?;
            return Ok(VarBuilder::from_buffered_safetensors(bytes, DType::F32, device)?);
        }
        let weights_path = self.dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path).map_err(|e| anyhow!("Failed to read {}: {}", weights_path.display(), e))?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
    }
}

/// Token-level encoder producing `[B,T,H]` hidden states.
pub enum Encoder {
    Bert(BertModel),
    XlmRoberta(XLMRobertaModel),
}

impl Encoder {
    pub fn load(files: &ModelFiles, vb: VarBuilder) -> Result<Self> {
        Ok(match files.family {
            Family::Bert => {
                let config: BertConfig = serde_json::from_value(files.raw_config.clone())?;
                Encoder::Bert(BertModel::load(vb, &config)?)
            }
            Family::XlmRoberta => {
                let config: XLMRobertaConfig = serde_json::from_value(files.raw_config.clone())?;
                Encoder::XlmRoberta(XLMRobertaModel::new(&config, vb)?)
            }
        })
    }

    pub fn forward(&self, inputs: &BatchInputs) -> Result<Tensor> {
        Ok(match self {
            Encoder::Bert(m) => m.forward(&inputs.input_ids, &inputs.token_type_ids, Some(&inputs.attention_mask))?,
            Encoder::XlmRoberta(m) => m.forward(&inputs.input_ids, &inputs.attention_mask, &inputs.token_type_ids, None, None, None)?,
        })
    }
}

/// Locate a model directory: explicit setting, then `APP_MODEL_DIR/<name>`,
/// then `models/<name>` relative to the working directory.
pub fn resolve_model_dir(model: &str, configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = medrag_core::config::expand_path(dir);
        if p.exists() { return Ok(p); }
        return Err(anyhow!("Configured model dir {} does not exist", p.display()));
    }
    let short = model.rsplit('/').next().unwrap_or(model);
    if let Ok(root) = std::env::var("APP_MODEL_DIR") {
        let p = Path::new(&root).join(short);
        if p.exists() { return Ok(p); }
    }
    let local = Path::new("models").join(short);
    if local.exists() { return Ok(local); }
    Err(anyhow!("Could not locate model directory for '{}' (set a model_dir or APP_MODEL_DIR)", model))
}
