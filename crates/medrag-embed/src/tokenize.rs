use anyhow::{Result, anyhow};
use candle_core::{Device, Tensor};
use tokenizers::{Encoding, Tokenizer};

/// Token ids, attention mask and token type ids for one padded batch, each `[B, T]`.
pub struct BatchInputs {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
}

pub fn pad_id(tokenizer: &Tokenizer) -> u32 {
    ["<pad>", "[PAD]"].iter().find_map(|t| tokenizer.token_to_id(t)).unwrap_or(0)
}

/// Truncate each encoding to `max_len` and right-pad to the longest one.
pub fn pad_batch(encodings: &[Encoding], max_len: usize, pad_id: u32, device: &Device) -> Result<BatchInputs> {
    if encodings.is_empty() { return Err(anyhow!("cannot build an empty batch")); }
    let width = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);
    let rows = encodings.len();
    let (mut ids, mut mask, mut types) = (Vec::with_capacity(rows * width), Vec::with_capacity(rows * width), Vec::with_capacity(rows * width));
    for enc in encodings {
        let n = enc.get_ids().len().min(width);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        types.extend_from_slice(&enc.get_type_ids()[..n]);
        let pad = width - n;
        ids.extend(std::iter::repeat(pad_id).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
        types.extend(std::iter::repeat(0).take(pad));
    }
    Ok(BatchInputs {
        input_ids: Tensor::from_vec(ids, (rows, width), device)?,
        attention_mask: Tensor::from_vec(mask, (rows, width), device)?,
        token_type_ids: Tensor::from_vec(types, (rows, width), device)?,
    })
}
