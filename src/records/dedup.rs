//! Offline deduplication pass over collected records
//!
//! Partitioning by facets can reach the same listing through several facet
//! combinations, so the sink legitimately holds exact duplicates. This pass
//! runs once, after collection completes. When the token toggle is on,
//! repeated description tokens are collapsed inside each record first; then
//! records whose full field projection was already seen are dropped, keeping
//! the first occurrence. Deduplicating on the token-collapsed projection
//! keeps the whole pass idempotent: records distinguished only by repeated
//! tokens fold into one. Relative order is preserved throughout.

use crate::records::{read_records, write_records, ListingRecord};
use crate::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Dedup pass configuration
#[derive(Debug, Clone)]
pub struct DedupOptions {
    /// Also collapse repeated tokens within each record's description list
    pub dedup_description_tokens: bool,
}

/// Counts reported by a dedup pass
#[derive(Debug, Clone, Copy)]
pub struct DedupStats {
    pub before: usize,
    pub after: usize,
}

/// Deduplicates a record sequence.
///
/// Record equality is positional across every field, including the order of
/// tokens inside list fields: two records that differ only in token order are
/// kept as distinct records.
pub fn dedup_records(mut records: Vec<ListingRecord>, options: &DedupOptions) -> Vec<ListingRecord> {
    // Token dedup happens before record comparison so that records
    // differing only in repeated tokens count as duplicates
    if options.dedup_description_tokens {
        for record in &mut records {
            dedup_description(record);
        }
    }

    let mut seen: HashSet<ListingRecord> = HashSet::with_capacity(records.len());
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        if seen.insert(record.clone()) {
            unique.push(record);
        }
    }

    unique
}

/// First-occurrence, order-preserving token dedup within one record
fn dedup_description(record: &mut ListingRecord) {
    let mut seen: HashSet<String> = HashSet::with_capacity(record.des.len());
    record.des.retain(|token| seen.insert(token.clone()));
}

/// Runs the dedup pass over a sink file, writing the result next to it
///
/// The cleaned file keeps the sink's format so downstream consumers read
/// either file interchangeably.
pub fn dedup_sink_file(path: &Path, options: &DedupOptions) -> Result<(DedupStats, PathBuf)> {
    let records = read_records(path)?;
    let before = records.len();

    let unique = dedup_records(records, options);
    let after = unique.len();

    let clean_path = derive_clean_path(path);
    write_records(&clean_path, &unique)?;

    tracing::info!(
        "Dedup: {} records in, {} out, written to {}",
        before,
        after,
        clean_path.display()
    );

    Ok((DedupStats { before, after }, clean_path))
}

/// `records.jsonl` -> `records_clean.jsonl`
pub fn derive_clean_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("records");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("jsonl");
    path.with_file_name(format!("{}_clean.{}", stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, des: &[&str]) -> ListingRecord {
        ListingRecord {
            title: title.to_string(),
            des: des.iter().map(|s| s.to_string()).collect(),
            bottom: vec!["近地铁".to_string()],
            brand: "链家".to_string(),
            price: "3500元/月".to_string(),
        }
    }

    fn options(dedup_des: bool) -> DedupOptions {
        DedupOptions {
            dedup_description_tokens: dedup_des,
        }
    }

    #[test]
    fn test_exact_duplicates_keep_first_occurrence() {
        let records = vec![
            record("a", &["x", "y"]),
            record("b", &["x"]),
            record("a", &["x", "y"]),
        ];
        let unique = dedup_records(records, &options(false));
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title, "a");
        assert_eq!(unique[1].title, "b");
    }

    #[test]
    fn test_token_order_differences_are_not_duplicates() {
        let records = vec![record("a", &["x", "y"]), record("a", &["y", "x"])];
        let unique = dedup_records(records, &options(false));
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_description_token_dedup_preserves_order() {
        let records = vec![record("a", &["精装", "近地铁", "精装", "南向", "近地铁"])];
        let unique = dedup_records(records, &options(true));
        assert_eq!(unique[0].des, vec!["精装", "近地铁", "南向"]);
    }

    #[test]
    fn test_records_identical_after_token_dedup_collapse() {
        // Distinct on the raw fields, identical once repeated tokens fold
        let records = vec![record("a", &["x", "x"]), record("a", &["x"])];
        let unique = dedup_records(records, &options(true));
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].des, vec!["x"]);
    }

    #[test]
    fn test_records_differing_only_in_repeats_stay_distinct_without_toggle() {
        let records = vec![record("a", &["x", "x"]), record("a", &["x"])];
        let unique = dedup_records(records, &options(false));
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let records = vec![
            record("a", &["x", "y", "x"]),
            record("a", &["x", "y", "x"]),
            record("b", &["z"]),
        ];
        let opts = options(true);
        let once = dedup_records(records, &opts);
        let twice = dedup_records(once.clone(), &opts);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_dedup_is_idempotent_across_token_collapses() {
        // Records that only become equal after token dedup must converge in
        // a single pass
        let records = vec![record("a", &["x", "x"]), record("a", &["x"])];
        let opts = options(true);
        let once = dedup_records(records, &opts);
        let twice = dedup_records(once.clone(), &opts);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(dedup_records(Vec::new(), &options(true)).is_empty());
    }

    #[test]
    fn test_derive_clean_path() {
        assert_eq!(
            derive_clean_path(Path::new("/data/sz_rent.jsonl")),
            Path::new("/data/sz_rent_clean.jsonl")
        );
    }

    #[test]
    fn test_dedup_sink_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        crate::records::write_records(
            &path,
            &[record("a", &["x"]), record("a", &["x"]), record("b", &["y"])],
        )
        .unwrap();

        let (stats, clean_path) = dedup_sink_file(&path, &options(true)).unwrap();
        assert_eq!(stats.before, 3);
        assert_eq!(stats.after, 2);

        let cleaned = crate::records::read_records(&clean_path).unwrap();
        assert_eq!(cleaned.len(), 2);
    }
}
