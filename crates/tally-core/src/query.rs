//! Filter, sort and paginate transaction collections
//!
//! Everything here is a pure function over a slice: inputs are never
//! mutated and results are fresh vectors. List views load the master data
//! once and run these in memory.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Transaction;

/// Predicates for narrowing a transaction list
///
/// Every configured predicate must hold (logical AND). Unset or blank
/// predicates impose no constraint. Text matches are case-insensitive
/// substring matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilters {
    /// Earliest date, inclusive
    pub date_from: Option<NaiveDate>,
    /// Latest date, inclusive
    pub date_to: Option<NaiveDate>,
    pub institution: Option<String>,
    pub account: Option<String>,
    pub category: Option<String>,
    /// Smallest amount, inclusive
    pub min_amount: Option<f64>,
    /// Largest amount, inclusive
    pub max_amount: Option<f64>,
    /// Matches when any tag contains this text
    pub tag: Option<String>,
    /// Free text matched against merchant, original statement and notes
    pub search: Option<String>,
}

impl TransactionFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set date range filter
    pub fn date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn institution(mut self, value: Option<impl Into<String>>) -> Self {
        self.institution = value.map(Into::into);
        self
    }

    pub fn account(mut self, value: Option<impl Into<String>>) -> Self {
        self.account = value.map(Into::into);
        self
    }

    pub fn category(mut self, value: Option<impl Into<String>>) -> Self {
        self.category = value.map(Into::into);
        self
    }

    /// Set inclusive amount range
    pub fn amount_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn tag(mut self, value: Option<impl Into<String>>) -> Self {
        self.tag = value.map(Into::into);
        self
    }

    pub fn search(mut self, value: Option<impl Into<String>>) -> Self {
        self.search = value.map(Into::into);
        self
    }

    /// Whether a single transaction satisfies every configured predicate
    pub fn matches(&self, tx: &Transaction) -> bool {
        if self.date_from.is_some_and(|from| tx.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| tx.date > to) {
            return false;
        }
        if let Some(needle) = active(&self.institution) {
            if !contains_ignore_case(&tx.institution_name, &needle) {
                return false;
            }
        }
        if let Some(needle) = active(&self.account) {
            if !contains_ignore_case(&tx.account_name, &needle) {
                return false;
            }
        }
        if let Some(needle) = active(&self.category) {
            if !contains_ignore_case(&tx.category, &needle) {
                return false;
            }
        }
        if self.min_amount.is_some_and(|min| tx.amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| tx.amount > max) {
            return false;
        }
        if let Some(needle) = active(&self.tag) {
            if !tx.tags.iter().any(|tag| contains_ignore_case(tag, &needle)) {
                return false;
            }
        }
        if let Some(needle) = active(&self.search) {
            let hit = contains_ignore_case(&tx.merchant, &needle)
                || contains_ignore_case(&tx.original_statement, &needle)
                || contains_ignore_case(&tx.notes, &needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Lowercased, trimmed predicate text, or None when blank
fn active(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn contains_ignore_case(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

/// Keep the transactions matching every configured predicate
pub fn filter(transactions: &[Transaction], filters: &TransactionFilters) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| filters.matches(tx))
        .cloned()
        .collect()
}

/// Sortable transaction fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Date,
    Merchant,
    Amount,
    InstitutionName,
    AccountName,
    Category,
    OriginalStatement,
    Notes,
    /// Orders by number of tags, not tag text
    Tags,
    SourceFile,
    ImportedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Merchant => "merchant",
            Self::Amount => "amount",
            Self::InstitutionName => "institutionName",
            Self::AccountName => "accountName",
            Self::Category => "category",
            Self::OriginalStatement => "originalStatement",
            Self::Notes => "notes",
            Self::Tags => "tags",
            Self::SourceFile => "sourceFile",
            Self::ImportedAt => "importedAt",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "date" => Ok(Self::Date),
            "merchant" => Ok(Self::Merchant),
            "amount" => Ok(Self::Amount),
            "institution" | "institutionname" => Ok(Self::InstitutionName),
            "account" | "accountname" => Ok(Self::AccountName),
            "category" => Ok(Self::Category),
            "originalstatement" | "statement" => Ok(Self::OriginalStatement),
            "notes" => Ok(Self::Notes),
            "tags" => Ok(Self::Tags),
            "sourcefile" => Ok(Self::SourceFile),
            "importedat" => Ok(Self::ImportedAt),
            _ => Err(format!("Unknown sort field: {}", s)),
        }
    }
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(format!("Unknown sort direction: {}", s)),
        }
    }
}

/// Case-insensitive ordering that puts lowercase first on otherwise equal text
fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

fn compare_by(field: SortField, a: &Transaction, b: &Transaction) -> Ordering {
    match field {
        SortField::Date => a.date.cmp(&b.date),
        SortField::Amount => (a.amount - b.amount)
            .partial_cmp(&0.0)
            .unwrap_or(Ordering::Equal),
        SortField::Tags => a.tags.len().cmp(&b.tags.len()),
        SortField::ImportedAt => a.imported_at.cmp(&b.imported_at),
        SortField::Merchant => locale_cmp(&a.merchant, &b.merchant),
        SortField::InstitutionName => locale_cmp(&a.institution_name, &b.institution_name),
        SortField::AccountName => locale_cmp(&a.account_name, &b.account_name),
        SortField::Category => locale_cmp(&a.category, &b.category),
        SortField::OriginalStatement => locale_cmp(&a.original_statement, &b.original_statement),
        SortField::Notes => locale_cmp(&a.notes, &b.notes),
        SortField::SourceFile => locale_cmp(&a.source_file, &b.source_file),
    }
}

/// Stable sort by one field
pub fn sort(
    transactions: &[Transaction],
    field: SortField,
    direction: SortDirection,
) -> Vec<Transaction> {
    let mut sorted = transactions.to_vec();
    sorted.sort_by(|a, b| {
        let ord = compare_by(field, a, b);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    sorted
}

/// One page of a larger result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of items before slicing
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Slice out the 1-indexed `page` of `page_size` items
///
/// Page 0, a zero page size, or a page past the end produce an empty page;
/// `total` is always the full count.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let total = items.len();
    let total_pages = if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    };

    let slice: &[T] = if page == 0 || page_size == 0 {
        &[]
    } else {
        let start = (page - 1).saturating_mul(page_size).min(total);
        let end = start.saturating_add(page_size).min(total);
        &items[start..end]
    };

    Page {
        items: slice.to_vec(),
        total,
        page,
        page_size,
        total_pages,
    }
}

/// Field and direction for [`query`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Filter, then optionally sort, then paginate
pub fn query(
    transactions: &[Transaction],
    filters: &TransactionFilters,
    sort_spec: Option<SortSpec>,
    page: usize,
    page_size: usize,
) -> Page<Transaction> {
    let filtered = filter(transactions, filters);
    let ordered = match sort_spec {
        Some(spec) => sort(&filtered, spec.field, spec.direction),
        None => filtered,
    };
    paginate(&ordered, page, page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::existing_tx;

    fn sample() -> Vec<Transaction> {
        let mut coffee = existing_tx("1", "2024-01-05", "Coffee Shop", -4.5);
        coffee.category = "Dining".into();
        coffee.tags = ["food".to_string(), "daily".to_string()].into();

        let mut rent = existing_tx("2", "2024-01-01", "Rent Payment", -1200.0);
        rent.category = "Housing".into();
        rent.account_name = "Joint Checking".into();
        rent.notes = "January".into();

        let mut salary = existing_tx("3", "2024-01-15", "ACME Payroll", 3000.0);
        salary.category = "Income".into();
        salary.institution_name = "Credit Union".into();
        salary.tags = ["work".to_string()].into();

        let mut books = existing_tx("4", "2024-02-02", "book store", -25.0);
        books.category = "Shopping".into();

        vec![coffee, rent, salary, books]
    }

    fn ids(transactions: &[Transaction]) -> Vec<&str> {
        transactions.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let txs = sample();
        assert_eq!(filter(&txs, &TransactionFilters::new()).len(), 4);
    }

    #[test]
    fn test_blank_predicates_are_ignored() {
        let txs = sample();
        let filters = TransactionFilters::new()
            .search(Some("  "))
            .category(Some(""));
        assert_eq!(filter(&txs, &filters).len(), 4);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let txs = sample();
        let filters = TransactionFilters::new()
            .date_range("2024-01-05".parse().ok(), "2024-01-15".parse().ok());
        assert_eq!(ids(&filter(&txs, &filters)), vec!["1", "3"]);
    }

    #[test]
    fn test_text_predicates_case_insensitive() {
        let txs = sample();
        let filters = TransactionFilters::new().account(Some("joint"));
        assert_eq!(ids(&filter(&txs, &filters)), vec!["2"]);

        let filters = TransactionFilters::new().institution(Some("UNION"));
        assert_eq!(ids(&filter(&txs, &filters)), vec!["3"]);

        let filters = TransactionFilters::new().category(Some("in"));
        // Dining, Income, Housing (housINg), Shopping (shoppINg)
        assert_eq!(filter(&txs, &filters).len(), 4);
    }

    #[test]
    fn test_amount_range_is_inclusive() {
        let txs = sample();
        let filters = TransactionFilters::new().amount_range(Some(-25.0), Some(-4.5));
        assert_eq!(ids(&filter(&txs, &filters)), vec!["1", "4"]);
    }

    #[test]
    fn test_tag_contains() {
        let txs = sample();
        let filters = TransactionFilters::new().tag(Some("OO"));
        assert_eq!(ids(&filter(&txs, &filters)), vec!["1"]);
    }

    #[test]
    fn test_search_covers_notes_and_statement() {
        let txs = sample();
        let filters = TransactionFilters::new().search(Some("january"));
        assert_eq!(ids(&filter(&txs, &filters)), vec!["2"]);
        let filters = TransactionFilters::new().search(Some("payroll"));
        assert_eq!(ids(&filter(&txs, &filters)), vec!["3"]);
    }

    #[test]
    fn test_filter_is_monotonic() {
        let txs = sample();
        let mut filters = TransactionFilters::new();
        let mut previous = filter(&txs, &filters).len();

        filters.max_amount = Some(0.0);
        let count = filter(&txs, &filters).len();
        assert!(count <= previous);
        previous = count;

        filters.date_from = "2024-01-02".parse().ok();
        let count = filter(&txs, &filters).len();
        assert!(count <= previous);
        previous = count;

        filters.search = Some("shop".into());
        let count = filter(&txs, &filters).len();
        assert!(count <= previous);
        previous = count;

        filters.tag = Some("food".into());
        let count = filter(&txs, &filters).len();
        assert!(count <= previous);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_filter_does_not_mutate_input() {
        let txs = sample();
        let before = txs.clone();
        let _ = filter(&txs, &TransactionFilters::new().search(Some("rent")));
        let _ = sort(&txs, SortField::Amount, SortDirection::Desc);
        assert_eq!(txs, before);
    }

    #[test]
    fn test_sort_amount() {
        let txs = sample();
        let asc = sort(&txs, SortField::Amount, SortDirection::Asc);
        assert_eq!(ids(&asc), vec!["2", "4", "1", "3"]);
        let desc = sort(&txs, SortField::Amount, SortDirection::Desc);
        assert_eq!(ids(&desc), vec!["3", "1", "4", "2"]);
    }

    #[test]
    fn test_sort_strings_ignore_case() {
        let txs = sample();
        let sorted = sort(&txs, SortField::Merchant, SortDirection::Asc);
        // "ACME Payroll", "book store", "Coffee Shop", "Rent Payment"
        assert_eq!(ids(&sorted), vec!["3", "4", "1", "2"]);
    }

    #[test]
    fn test_sort_tags_by_count_only() {
        let mut txs = sample();
        txs[3].tags = ["aaa".to_string()].into();
        let sorted = sort(&txs, SortField::Tags, SortDirection::Asc);
        // rent has no tags; salary ("work") and books ("aaa") tie on count
        // and keep input order; coffee has two
        assert_eq!(ids(&sorted), vec!["2", "3", "4", "1"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut txs = sample();
        for tx in &mut txs {
            tx.category = "Same".into();
        }
        let asc = sort(&txs, SortField::Category, SortDirection::Asc);
        assert_eq!(ids(&asc), vec!["1", "2", "3", "4"]);
        let desc = sort(&txs, SortField::Category, SortDirection::Desc);
        assert_eq!(ids(&desc), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_sort_date_desc() {
        let txs = sample();
        let sorted = sort(&txs, SortField::Date, SortDirection::Desc);
        assert_eq!(ids(&sorted), vec!["4", "3", "1", "2"]);
    }

    #[test]
    fn test_paginate_sizes_sum_to_total() {
        let items: Vec<u32> = (0..23).collect();
        for page_size in 1..=25 {
            let first = paginate(&items, 1, page_size);
            let pages = first.total_pages;
            assert_eq!(pages, items.len().div_ceil(page_size));

            let mut seen = 0;
            for page in 1..=pages {
                let p = paginate(&items, page, page_size);
                assert!(p.items.len() <= page_size);
                assert_eq!(p.total, 23);
                seen += p.items.len();
            }
            assert_eq!(seen, 23);
        }
    }

    #[test]
    fn test_paginate_edges() {
        let items: Vec<u32> = (1..=5).collect();
        let page = paginate(&items, 2, 2);
        assert_eq!(page.items, vec![3, 4]);

        let last = paginate(&items, 3, 2);
        assert_eq!(last.items, vec![5]);

        let past_end = paginate(&items, 9, 2);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 5);

        assert!(paginate(&items, 0, 2).items.is_empty());
        let zero = paginate(&items, 1, 0);
        assert!(zero.items.is_empty());
        assert_eq!(zero.total_pages, 0);

        let huge = paginate(&items, usize::MAX, usize::MAX);
        assert!(huge.items.is_empty());
    }

    #[test]
    fn test_query_composes() {
        let txs = sample();
        let result = query(
            &txs,
            &TransactionFilters::new().amount_range(None, Some(0.0)),
            Some(SortSpec {
                field: SortField::Amount,
                direction: SortDirection::Asc,
            }),
            1,
            2,
        );
        assert_eq!(result.total, 3);
        assert_eq!(result.total_pages, 2);
        assert_eq!(ids(&result.items), vec!["2", "4"]);
    }

    #[test]
    fn test_parse_sort_field() {
        assert_eq!("amount".parse::<SortField>(), Ok(SortField::Amount));
        assert_eq!("account_name".parse::<SortField>(), Ok(SortField::AccountName));
        assert!("bogus".parse::<SortField>().is_err());
    }
}
