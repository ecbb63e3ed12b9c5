//! LanceDB connection and housekeeping helpers.
use anyhow::Result;
use lancedb::{connect, Connection};
use std::path::Path;

use medrag_core::types::SearchFilters;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

/// Removes a local table's data directory so the next write starts fresh.
pub fn remove_local_table(db_path: &Path, name: &str) -> Result<()> {
    let dir = db_path.join(format!("{}.lance", name));
    if dir.exists() { std::fs::remove_dir_all(&dir)?; }
    Ok(())
}

/// SQL predicate for the set filters, `None` when no filter is set.
pub fn filter_predicate(filters: &SearchFilters) -> Option<String> {
    if filters.is_empty() { return None; }
    let clauses: Vec<String> = filters
        .pairs()
        .into_iter()
        .map(|(column, value)| format!("{} = '{}'", column, value.replace('\'', "''")))
        .collect();
    Some(clauses.join(" AND "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_joins_and_escapes() {
        let filters = SearchFilters { specialty: Some("rheumatology".into()), source_name: Some("O'Brien".into()), doc_type: None };
        assert_eq!(filter_predicate(&filters).as_deref(), Some("specialty = 'rheumatology' AND source_name = 'O''Brien'"));
        assert!(filter_predicate(&SearchFilters::default()).is_none());
    }
}
