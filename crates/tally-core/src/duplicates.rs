//! Duplicate detection for incoming transactions
//!
//! A candidate is a duplicate of an existing record when:
//! - date, amount, institution name and account name are exactly equal, and
//! - the original statements are similar: after normalization (lowercase,
//!   letters and digits only) they are equal or within a Levenshtein
//!   distance of less than [`SIMILARITY_THRESHOLD`].
//!
//! When several existing records qualify, the first one in the existing
//! collection wins. There is no ranking between candidates.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use strsim::levenshtein;
use tracing::debug;

use crate::models::{CreateTransactionInput, Transaction};

/// Descriptions must be strictly closer than this edit distance
///
/// Fixed regardless of description length.
pub const SIMILARITY_THRESHOLD: usize = 3;

/// Lowercase and keep only letters and digits
pub fn normalize_description(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether two original statements describe the same transaction
pub fn descriptions_similar(a: &str, b: &str) -> bool {
    let a = normalize_description(a);
    let b = normalize_description(b);
    a == b || levenshtein(&a, &b) < SIMILARITY_THRESHOLD
}

fn same_key(candidate: &CreateTransactionInput, existing: &Transaction) -> bool {
    candidate.date == existing.date
        && candidate.amount == existing.amount
        && candidate.institution_name == existing.institution_name
        && candidate.account_name == existing.account_name
}

/// Find the first existing record the candidate duplicates
pub fn is_duplicate_transaction<'a>(
    candidate: &CreateTransactionInput,
    existing: &'a [Transaction],
) -> Option<&'a Transaction> {
    existing.iter().find(|tx| {
        same_key(candidate, tx)
            && descriptions_similar(&candidate.original_statement, &tx.original_statement)
    })
}

/// Exact-match key for narrowing duplicate candidates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DuplicateKey<'a> {
    date: NaiveDate,
    amount_bits: u64,
    institution_name: &'a str,
    account_name: &'a str,
}

impl<'a> DuplicateKey<'a> {
    fn new(date: NaiveDate, amount: f64, institution_name: &'a str, account_name: &'a str) -> Self {
        // -0.0 == 0.0 but their bit patterns differ. NaN would bucket with
        // NaN while never comparing equal; the store rejects non-finite
        // amounts so none reach here.
        let amount = if amount == 0.0 { 0.0 } else { amount };
        Self {
            date,
            amount_bits: amount.to_bits(),
            institution_name,
            account_name,
        }
    }

    fn of_input(input: &'a CreateTransactionInput) -> Self {
        Self::new(
            input.date,
            input.amount,
            &input.institution_name,
            &input.account_name,
        )
    }

    fn of_transaction(tx: &'a Transaction) -> Self {
        Self::new(tx.date, tx.amount, &tx.institution_name, &tx.account_name)
    }
}

/// Existing transactions bucketed by their exact-match key
///
/// Buckets keep the order of the existing collection, so lookups return the
/// same record a linear scan would.
pub struct DuplicateIndex<'a> {
    buckets: HashMap<DuplicateKey<'a>, Vec<&'a Transaction>>,
}

impl<'a> DuplicateIndex<'a> {
    pub fn build(existing: &'a [Transaction]) -> Self {
        let mut buckets: HashMap<DuplicateKey<'a>, Vec<&'a Transaction>> = HashMap::new();
        for tx in existing {
            buckets
                .entry(DuplicateKey::of_transaction(tx))
                .or_default()
                .push(tx);
        }
        Self { buckets }
    }

    /// Number of distinct keys in the index
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Find the first indexed record the candidate duplicates
    pub fn find(&self, candidate: &CreateTransactionInput) -> Option<&'a Transaction> {
        self.buckets
            .get(&DuplicateKey::of_input(candidate))?
            .iter()
            .copied()
            .find(|tx| descriptions_similar(&candidate.original_statement, &tx.original_statement))
    }
}

/// Check every batch entry against the existing collection
///
/// Returns the batch index of each duplicate with the record it matched.
/// Entries are checked independently; the batch is not compared with itself.
pub fn find_duplicates(
    batch: &[CreateTransactionInput],
    existing: &[Transaction],
) -> BTreeMap<usize, Transaction> {
    let index = DuplicateIndex::build(existing);

    let duplicates: BTreeMap<usize, Transaction> = batch
        .iter()
        .enumerate()
        .filter_map(|(i, candidate)| index.find(candidate).map(|tx| (i, tx.clone())))
        .collect();

    debug!(
        "Duplicate scan: {} of {} rows matched against {} existing ({} keys)",
        duplicates.len(),
        batch.len(),
        existing.len(),
        index.len()
    );
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{existing_tx, input};

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description("SQ *Coffee-Shop #42"), "sqcoffeeshop42");
        assert_eq!(normalize_description("  "), "");
        assert_eq!(normalize_description("Café"), "café");
    }

    #[test]
    fn test_similarity_threshold_boundary() {
        // distance 2
        assert!(descriptions_similar("coffee shop", "cofee shp"));
        // distance 3
        assert!(!descriptions_similar("coffeeshop", "cofeeshp!x"));
        assert_eq!(levenshtein("coffeeshop", "cofeeshpx"), 3);
        assert!(!descriptions_similar("coffeeshop", "cofeeshpx"));
    }

    #[test]
    fn test_similarity_ignores_case_and_punctuation() {
        assert!(descriptions_similar("AMAZON.COM*MK1", "amazon com mk1"));
    }

    #[test]
    fn test_exact_key_fields_required() {
        let existing = vec![existing_tx("1", "2024-01-01", "Coffee Shop", -4.5)];
        let candidate = input("2024-01-01", "Coffee Shop", -4.5);
        assert!(is_duplicate_transaction(&candidate, &existing).is_some());

        let mut other_date = candidate.clone();
        other_date.date = "2024-01-02".parse().unwrap();
        assert!(is_duplicate_transaction(&other_date, &existing).is_none());

        let mut other_amount = candidate.clone();
        other_amount.amount = -4.51;
        assert!(is_duplicate_transaction(&other_amount, &existing).is_none());

        let mut other_institution = candidate.clone();
        other_institution.institution_name = "Other Bank".into();
        assert!(is_duplicate_transaction(&other_institution, &existing).is_none());

        let mut other_account = candidate.clone();
        other_account.account_name = "Savings".into();
        assert!(is_duplicate_transaction(&other_account, &existing).is_none());
    }

    #[test]
    fn test_different_description_is_not_duplicate() {
        let existing = vec![existing_tx("1", "2024-01-01", "Coffee Shop", -4.5)];
        let candidate = input("2024-01-01", "Hardware Store", -4.5);
        assert!(is_duplicate_transaction(&candidate, &existing).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let existing = vec![
            existing_tx("first", "2024-01-01", "Coffee Shop", -4.5),
            existing_tx("second", "2024-01-01", "Coffee Shop", -4.5),
        ];
        let candidate = input("2024-01-01", "Coffee Shop", -4.5);
        let found = is_duplicate_transaction(&candidate, &existing).unwrap();
        assert_eq!(found.id, "first");

        let duplicates = find_duplicates(&[candidate], &existing);
        assert_eq!(duplicates[&0].id, "first");
    }

    #[test]
    fn test_find_duplicates_indexes_batch_positions() {
        let existing = vec![
            existing_tx("1", "2024-01-01", "Coffee Shop", -4.5),
            existing_tx("2", "2024-01-03", "Grocery Mart", -52.1),
        ];
        let batch = vec![
            input("2024-01-02", "Book Store", -12.0),
            input("2024-01-03", "GROCERY MART", -52.1),
            input("2024-01-01", "Coffee Shop", -4.5),
        ];

        let duplicates = find_duplicates(&batch, &existing);
        assert_eq!(duplicates.len(), 2);
        assert!(!duplicates.contains_key(&0));
        assert_eq!(duplicates[&1].id, "2");
        assert_eq!(duplicates[&2].id, "1");
    }

    #[test]
    fn test_find_duplicates_is_idempotent() {
        let existing = vec![existing_tx("1", "2024-01-01", "Coffee Shop", -4.5)];
        let batch = vec![
            input("2024-01-01", "Coffee Shop", -4.5),
            input("2024-01-01", "Tea House", -4.5),
        ];
        let first = find_duplicates(&batch, &existing);
        let second = find_duplicates(&batch, &existing);
        assert_eq!(first, second);
    }

    #[test]
    fn test_index_agrees_with_linear_scan() {
        let existing = vec![
            existing_tx("1", "2024-01-01", "Coffee Shop", -4.5),
            existing_tx("2", "2024-01-01", "Coffee Shopp", -4.5),
            existing_tx("3", "2024-01-01", "Coffee Shop", 0.0),
            existing_tx("4", "2024-02-01", "Rent", -1200.0),
        ];
        let batch = vec![
            input("2024-01-01", "coffee shop", -4.5),
            input("2024-01-01", "Coffee Shop", -0.0),
            input("2024-02-01", "RENT PAYMENT", -1200.0),
            input("2024-02-01", "Rent.", -1200.0),
        ];

        let indexed = find_duplicates(&batch, &existing);
        for (i, candidate) in batch.iter().enumerate() {
            let linear = is_duplicate_transaction(candidate, &existing);
            assert_eq!(indexed.get(&i).map(|t| &t.id), linear.map(|t| &t.id));
        }
        // zero amounts match regardless of sign
        assert_eq!(indexed[&1].id, "3");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(find_duplicates(&[], &[]).is_empty());
        let batch = vec![input("2024-01-01", "Coffee Shop", -4.5)];
        assert!(find_duplicates(&batch, &[]).is_empty());
    }
}
