//! Multi-stage import of tabular rows into the ledger
//!
//! An [`ImportPipeline`] walks one batch of rows through
//! Mapping → Preview → Committed, with Preview → Mapping as the only way
//! back and Cancelled reachable from either open stage. Operations called
//! in the wrong stage fail with [`Error::InvalidTransition`] and change
//! nothing.

pub mod mapping;
pub mod transform;

use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::duplicates::find_duplicates;
use crate::error::{Error, Result};
use crate::models::{
    CanonicalField, ColumnMapping, CreateTransactionInput, PreviewTransaction, Transaction,
};
use crate::store::TransactionStore;

pub use mapping::{missing_required_fields, recognize_header, suggest_mappings};
pub use transform::{parse_amount, parse_date, parse_tags, transform_rows};

/// One source row: column name to cell text
pub type RawRow = HashMap<String, String>;

/// Values for fields no column is mapped to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDefaults {
    pub institution_name: Option<String>,
    pub account_name: Option<String>,
    pub source_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStage {
    Mapping,
    Preview,
    Committed,
    Cancelled,
}

impl ImportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mapping => "mapping",
            Self::Preview => "preview",
            Self::Committed => "committed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Committed and Cancelled allow nothing further
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled)
    }
}

impl std::fmt::Display for ImportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row counts for the preview stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSummary {
    pub total: usize,
    pub duplicates: usize,
    pub selected: usize,
}

/// State machine for one import batch
#[derive(Debug, Clone)]
pub struct ImportPipeline {
    stage: ImportStage,
    source_columns: Vec<String>,
    rows: Vec<RawRow>,
    mappings: Vec<ColumnMapping>,
    defaults: ImportDefaults,
    /// Date given to rows whose date is missing or unparsable
    today: NaiveDate,
    preview: Vec<PreviewTransaction>,
    /// Parallel to `preview`
    selected: Vec<bool>,
}

impl ImportPipeline {
    /// Start in the Mapping stage with suggested mappings for the headers
    pub fn new(source_columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        let mappings = suggest_mappings(&source_columns);
        debug!(
            "Import started with {} columns, {} rows, {} mapped",
            source_columns.len(),
            rows.len(),
            mappings.iter().filter(|m| m.target_field.is_some()).count()
        );

        Self {
            stage: ImportStage::Mapping,
            source_columns,
            rows,
            mappings,
            defaults: ImportDefaults::default(),
            today: Local::now().date_naive(),
            preview: Vec::new(),
            selected: Vec::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: ImportDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Override the fallback date for undated rows
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    pub fn source_columns(&self) -> &[String] {
        &self.source_columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn defaults(&self) -> &ImportDefaults {
        &self.defaults
    }

    pub fn mappings(&self) -> &[ColumnMapping] {
        &self.mappings
    }

    fn require(&self, expected: ImportStage, action: &'static str) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                stage: self.stage.as_str(),
                action,
            })
        }
    }

    /// Assign a column to a field, or clear it with `None`
    ///
    /// A field held by another column must be released first.
    pub fn set_mapping(&mut self, column: &str, field: Option<CanonicalField>) -> Result<()> {
        self.require(ImportStage::Mapping, "change mappings")?;

        let index = self
            .mappings
            .iter()
            .position(|m| m.source_column == column)
            .ok_or_else(|| Error::Validation(format!("Unknown column: {}", column)))?;

        if let Some(field) = field {
            if let Some(holder) = self
                .mappings
                .iter()
                .find(|m| m.target_field == Some(field) && m.source_column != column)
            {
                return Err(Error::Validation(format!(
                    "Field {} is already mapped to column {}",
                    field, holder.source_column
                )));
            }
        }

        self.mappings[index].target_field = field;
        Ok(())
    }

    pub fn missing_required_fields(&self) -> Vec<CanonicalField> {
        missing_required_fields(&self.mappings)
    }

    /// Transform every row with the current mappings
    pub fn transform(&self) -> Vec<CreateTransactionInput> {
        transform_rows(&self.rows, &self.mappings, &self.defaults, self.today)
    }

    /// Move to Preview, flagging rows that duplicate `existing`
    ///
    /// Duplicates start deselected; everything else starts selected.
    pub fn enter_preview(&mut self, existing: &[Transaction]) -> Result<&[PreviewTransaction]> {
        self.require(ImportStage::Mapping, "preview")?;

        let missing = self.missing_required_fields();
        if !missing.is_empty() {
            return Err(Error::MissingRequiredFields(missing));
        }

        let inputs = self.transform();
        let mut duplicates = find_duplicates(&inputs, existing);

        self.preview = inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| {
                let duplicate_of = duplicates.remove(&i);
                PreviewTransaction {
                    input,
                    is_duplicate: duplicate_of.is_some(),
                    duplicate_of,
                }
            })
            .collect();
        self.selected = self.preview.iter().map(|p| !p.is_duplicate).collect();
        self.stage = ImportStage::Preview;

        let summary = self.summary();
        info!(
            "Previewing {} rows ({} duplicates)",
            summary.total, summary.duplicates
        );
        Ok(&self.preview)
    }

    /// [`Self::enter_preview`] against the store's current transactions
    ///
    /// A store that cannot be read is an error and the pipeline stays in
    /// Mapping.
    pub async fn preview(&mut self, store: &TransactionStore) -> Result<&[PreviewTransaction]> {
        self.require(ImportStage::Mapping, "preview")?;
        let existing = store.try_list_transactions().await?;
        self.enter_preview(&existing)
    }

    /// Return to Mapping, dropping the preview and selection
    pub fn back_to_mapping(&mut self) -> Result<()> {
        self.require(ImportStage::Preview, "go back to mapping")?;
        self.preview.clear();
        self.selected.clear();
        self.stage = ImportStage::Mapping;
        Ok(())
    }

    /// Transformed rows with duplicate flags; empty outside Preview
    pub fn preview_rows(&self) -> &[PreviewTransaction] {
        &self.preview
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    /// Flip one row's selection, returning the new state
    pub fn toggle(&mut self, index: usize) -> Result<bool> {
        self.require(ImportStage::Preview, "change selection")?;
        let row_count = self.selected.len();
        let selected = self.selected.get_mut(index).ok_or_else(|| {
            Error::Validation(format!(
                "Row {} is out of range ({} rows)",
                index, row_count
            ))
        })?;
        *selected = !*selected;
        Ok(*selected)
    }

    pub fn select_all(&mut self) -> Result<()> {
        self.set_selection(|_| true, true)
    }

    pub fn deselect_all(&mut self) -> Result<()> {
        self.set_selection(|_| true, false)
    }

    pub fn select_duplicates(&mut self) -> Result<()> {
        self.set_selection(|p| p.is_duplicate, true)
    }

    pub fn deselect_duplicates(&mut self) -> Result<()> {
        self.set_selection(|p| p.is_duplicate, false)
    }

    fn set_selection(
        &mut self,
        applies: impl Fn(&PreviewTransaction) -> bool,
        value: bool,
    ) -> Result<()> {
        self.require(ImportStage::Preview, "change selection")?;
        for (row, selected) in self.preview.iter().zip(self.selected.iter_mut()) {
            if applies(row) {
                *selected = value;
            }
        }
        Ok(())
    }

    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|s| **s).count()
    }

    pub fn summary(&self) -> PreviewSummary {
        PreviewSummary {
            total: self.preview.len(),
            duplicates: self.preview.iter().filter(|p| p.is_duplicate).count(),
            selected: self.selected_count(),
        }
    }

    /// Selected rows stripped back to plain inputs, in row order
    pub fn selected_inputs(&self) -> Vec<CreateTransactionInput> {
        self.preview
            .iter()
            .zip(&self.selected)
            .filter(|(_, selected)| **selected)
            .map(|(row, _)| row.input.clone())
            .collect()
    }

    /// Add the selected rows to the store in one batch
    ///
    /// On a persistence failure the pipeline stays in Preview with its
    /// selection intact.
    pub async fn commit(&mut self, store: &TransactionStore) -> Result<Vec<Transaction>> {
        self.require(ImportStage::Preview, "commit")?;

        let inputs = self.selected_inputs();
        if inputs.is_empty() {
            return Err(Error::Validation("no transactions selected".into()));
        }

        let created = store.add_transactions(inputs).await?;
        self.preview.clear();
        self.selected.clear();
        self.stage = ImportStage::Committed;

        info!("Imported {} transactions", created.len());
        Ok(created)
    }

    /// Abandon the import without touching the store
    pub fn cancel(&mut self) -> Result<()> {
        if self.stage.is_terminal() {
            return Err(Error::InvalidTransition {
                stage: self.stage.as_str(),
                action: "cancel",
            });
        }

        self.rows.clear();
        self.mappings.clear();
        self.preview.clear();
        self.selected.clear();
        self.stage = ImportStage::Cancelled;
        debug!("Import cancelled");
        Ok(())
    }
}
