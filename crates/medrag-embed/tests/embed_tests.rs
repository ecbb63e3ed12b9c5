use medrag_core::config::{EmbeddingSettings, RerankerSettings};
use medrag_embed::{load_cross_encoder, load_embedder, FakeCrossEncoder, FakeEmbedder};
use medrag_core::traits::{CrossEncoder, Embedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let embedder = FakeEmbedder::new(384);
    let texts = vec!["allopurinol dose titration".to_string(), "allopurinol dose titration".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384);
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_cross_encoder_prefers_overlap() {
    let ce = FakeCrossEncoder::default();
    let passages = vec!["Urate lowering therapy for gout".to_string(), "Asthma inhaler technique".to_string()];
    let scores = ce.score_pairs("gout urate", &passages).expect("batch");
    let s: Vec<f32> = scores.into_iter().map(|r| r.expect("pair")).collect();
    assert!(s[0] > s[1]);
    assert!((s[0] - 4.0).abs() < 1e-6);
    assert!((s[1] + 4.0).abs() < 1e-6);
}

#[test]
fn loaders_honour_fake_switch() {
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");
    let settings = EmbeddingSettings { dimension: 64, ..Default::default() };
    let embedder = load_embedder(&settings).expect("embedder");
    assert_eq!(embedder.dim(), 64);
    let ce = load_cross_encoder("any/reranker", &RerankerSettings::default()).expect("cross-encoder");
    assert!(ce.model_id().starts_with("fake:"));
}
