//! Domain models for Tally

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written to every master data file
pub const MASTER_DATA_VERSION: &str = "1.0";

/// A ledger entry in the master data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Assigned once on add, never reused or changed
    pub id: String,
    pub date: NaiveDate,
    pub merchant: String,
    /// Negative = debit, positive = credit
    pub amount: f64,
    #[serde(default)]
    pub institution_name: String,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub category: String,
    /// Raw description as it appeared in the source file
    #[serde(default)]
    pub original_statement: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub source_file: String,
    pub imported_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a stored record from an input plus the store-assigned fields
    pub fn from_input(input: CreateTransactionInput, id: String, imported_at: DateTime<Utc>) -> Self {
        Self {
            id,
            date: input.date,
            merchant: input.merchant,
            amount: input.amount,
            institution_name: input.institution_name,
            account_name: input.account_name,
            category: input.category,
            original_statement: input.original_statement,
            notes: input.notes,
            tags: input.tags,
            source_file: input.source_file,
            imported_at,
        }
    }

    /// Merge the present fields of an update onto this record
    pub fn apply(&mut self, update: TransactionUpdate) {
        let TransactionUpdate {
            date,
            merchant,
            amount,
            institution_name,
            account_name,
            category,
            original_statement,
            notes,
            tags,
            source_file,
        } = update;

        if let Some(date) = date {
            self.date = date;
        }
        if let Some(merchant) = merchant {
            self.merchant = merchant;
        }
        if let Some(amount) = amount {
            self.amount = amount;
        }
        if let Some(institution_name) = institution_name {
            self.institution_name = institution_name;
        }
        if let Some(account_name) = account_name {
            self.account_name = account_name;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(original_statement) = original_statement {
            self.original_statement = original_statement;
        }
        if let Some(notes) = notes {
            self.notes = notes;
        }
        if let Some(tags) = tags {
            self.tags = tags;
        }
        if let Some(source_file) = source_file {
            self.source_file = source_file;
        }
    }
}

/// A transaction before the store has assigned an id and import time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionInput {
    pub date: NaiveDate,
    pub merchant: String,
    pub amount: f64,
    #[serde(default)]
    pub institution_name: String,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub original_statement: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub source_file: String,
}

impl CreateTransactionInput {
    /// Input with the required fields set and every optional field empty
    pub fn new(date: NaiveDate, merchant: impl Into<String>, amount: f64) -> Self {
        Self {
            date,
            merchant: merchant.into(),
            amount,
            institution_name: String::new(),
            account_name: String::new(),
            category: String::new(),
            original_statement: String::new(),
            notes: String::new(),
            tags: BTreeSet::new(),
            source_file: String::new(),
        }
    }
}

/// Partial field set for updating an existing transaction
///
/// `id` and `imported_at` are deliberately absent: neither can change after add.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub date: Option<NaiveDate>,
    pub merchant: Option<String>,
    pub amount: Option<f64>,
    pub institution_name: Option<String>,
    pub account_name: Option<String>,
    pub category: Option<String>,
    pub original_statement: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub source_file: Option<String>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Earliest and latest transaction dates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

/// Aggregate summary derived from the transactions collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub total_transactions: usize,
    pub date_range: DateRange,
    /// Distinct non-empty account names, ascending
    pub accounts: Vec<String>,
}

impl Metadata {
    /// Recompute the summary from scratch
    pub fn compute(transactions: &[Transaction]) -> Self {
        let earliest = transactions.iter().map(|t| t.date).min();
        let latest = transactions.iter().map(|t| t.date).max();
        let accounts: BTreeSet<&str> = transactions
            .iter()
            .map(|t| t.account_name.as_str())
            .filter(|name| !name.is_empty())
            .collect();

        Self {
            total_transactions: transactions.len(),
            date_range: DateRange { earliest, latest },
            accounts: accounts.into_iter().map(String::from).collect(),
        }
    }
}

/// The persisted ledger document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterDataFile {
    pub version: String,
    pub last_updated: DateTime<Utc>,
    pub metadata: Metadata,
    pub transactions: Vec<Transaction>,
}

impl MasterDataFile {
    /// A freshly initialized file with no transactions
    pub fn empty() -> Self {
        Self {
            version: MASTER_DATA_VERSION.to_string(),
            last_updated: Utc::now(),
            metadata: Metadata::default(),
            transactions: Vec::new(),
        }
    }

    /// Recompute metadata and stamp the update time
    pub(crate) fn refresh(&mut self) {
        self.metadata = Metadata::compute(&self.transactions);
        self.last_updated = Utc::now();
    }
}

/// Location and freshness of the persisted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: String,
    pub exists: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Fields a source column can be mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    Date,
    Merchant,
    Amount,
    Category,
    InstitutionName,
    AccountName,
    OriginalStatement,
    Notes,
    Tags,
}

impl CanonicalField {
    /// All fields, in header recognition order
    pub const ALL: [CanonicalField; 9] = [
        Self::Date,
        Self::Merchant,
        Self::Amount,
        Self::Category,
        Self::InstitutionName,
        Self::AccountName,
        Self::OriginalStatement,
        Self::Notes,
        Self::Tags,
    ];

    /// Fields that must be mapped before previewing an import
    pub const REQUIRED: [CanonicalField; 3] = [Self::Date, Self::Merchant, Self::Amount];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Merchant => "merchant",
            Self::Amount => "amount",
            Self::Category => "category",
            Self::InstitutionName => "institutionName",
            Self::AccountName => "accountName",
            Self::OriginalStatement => "originalStatement",
            Self::Notes => "notes",
            Self::Tags => "tags",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl std::str::FromStr for CanonicalField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "date" => Ok(Self::Date),
            "merchant" | "payee" => Ok(Self::Merchant),
            "amount" => Ok(Self::Amount),
            "category" => Ok(Self::Category),
            "institution" | "institutionname" | "bank" => Ok(Self::InstitutionName),
            "account" | "accountname" => Ok(Self::AccountName),
            "originalstatement" | "statement" | "description" => Ok(Self::OriginalStatement),
            "notes" | "note" => Ok(Self::Notes),
            "tags" | "tag" => Ok(Self::Tags),
            _ => Err(format!("Unknown field: {}", s)),
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Assignment of one source column to at most one canonical field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_field: Option<CanonicalField>,
}

/// A transformed import row with its duplicate verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewTransaction {
    #[serde(flatten)]
    pub input: CreateTransactionInput,
    pub is_duplicate: bool,
    /// The existing record this row matched, when it is a duplicate
    pub duplicate_of: Option<Transaction>,
}
