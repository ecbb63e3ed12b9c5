//! Per-request JSON snapshots of each pipeline stage.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

/// `blake3(query + timestamp)`, shortened to 16 hex characters.
pub fn request_id(query: &str, timestamp: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(query.as_bytes());
    hasher.update(timestamp.as_bytes());
    hasher.finalize().to_hex().as_str()[..16].to_string()
}

/// Writes `<dir>/<request_id>_<stage>.json`. Write failures are logged and
/// never fail the request.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    request_id: String,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>, query: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self { dir: dir.into(), request_id: request_id(query, &now) }
    }

    pub fn request_id(&self) -> &str { &self.request_id }

    pub fn path_for(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", self.request_id, stage))
    }

    pub fn write<T: Serialize + ?Sized>(&self, stage: &str, value: &T) {
        let path = self.path_for(stage);
        if let Err(e) = write_json(&path, value) {
            tracing::warn!(path = %path.display(), error = %e, "could not write debug artifact");
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_core::types::ProcessedQuery;

    #[test]
    fn request_id_depends_on_query_and_time() {
        let a = request_id("gout", "2024-01-01T00:00:00Z");
        assert_eq!(a.len(), 16);
        assert_eq!(a, request_id("gout", "2024-01-01T00:00:00Z"));
        assert_ne!(a, request_id("gout", "2024-01-01T00:00:01Z"));
    }

    #[test]
    fn query_artifact_omits_embedding() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path(), "gout");
        let q = ProcessedQuery { original: "gout".into(), expanded: "gout urate".into(), embedding: vec![0.1; 8], embedding_model: "m".into() };
        writer.write("query", &q);
        let raw = std::fs::read_to_string(writer.path_for("query")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["expanded"], "gout urate");
        assert!(json.get("embedding").is_none());
    }
}
