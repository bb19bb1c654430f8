//! Column mapping suggestions from source headers
//!
//! Each header is tested against a fixed pattern per canonical field, in
//! [`CanonicalField::ALL`] order. The first field whose pattern matches and
//! that no earlier column already claimed wins; headers matching nothing
//! stay unmapped.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{CanonicalField, ColumnMapping};

fn header_patterns() -> &'static [(CanonicalField, Regex)] {
    static PATTERNS: OnceLock<Vec<(CanonicalField, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        CanonicalField::ALL
            .iter()
            .map(|&field| {
                let pattern = match field {
                    CanonicalField::Date => r"(?i)\bdate\b|^posted$|^when$",
                    CanonicalField::Merchant => {
                        r"(?i)merchant|payee|vendor|counterparty|^description$|^name$"
                    }
                    CanonicalField::Amount => r"(?i)amount|^amt$|^value$|^sum$|^total$",
                    CanonicalField::Category => r"(?i)categor",
                    CanonicalField::InstitutionName => r"(?i)institution|\bbank\b|issuer",
                    CanonicalField::AccountName => r"(?i)account|^card\b",
                    CanonicalField::OriginalStatement => {
                        r"(?i)original|statement|description|memo|details|narrative"
                    }
                    CanonicalField::Notes => r"(?i)\bnotes?\b|comment|remark",
                    CanonicalField::Tags => r"(?i)\btags?\b|labels?",
                };
                (field, Regex::new(pattern).expect("valid regex"))
            })
            .collect()
    })
}

/// Fields whose recognition pattern matches a header, in priority order
pub fn recognize_header(header: &str) -> Vec<CanonicalField> {
    let header = header.trim();
    header_patterns()
        .iter()
        .filter(|(_, re)| re.is_match(header))
        .map(|(field, _)| *field)
        .collect()
}

/// Propose one mapping per source column, each field used at most once
pub fn suggest_mappings(source_columns: &[String]) -> Vec<ColumnMapping> {
    let mut used: Vec<CanonicalField> = Vec::new();

    source_columns
        .iter()
        .map(|column| {
            let target_field = recognize_header(column)
                .into_iter()
                .find(|field| !used.contains(field));
            if let Some(field) = target_field {
                used.push(field);
            }
            ColumnMapping {
                source_column: column.clone(),
                target_field,
            }
        })
        .collect()
}

/// Source column currently mapped to a field
pub fn column_for(mappings: &[ColumnMapping], field: CanonicalField) -> Option<&str> {
    mappings
        .iter()
        .find(|m| m.target_field == Some(field))
        .map(|m| m.source_column.as_str())
}

/// Required fields with no source column
pub fn missing_required_fields(mappings: &[ColumnMapping]) -> Vec<CanonicalField> {
    CanonicalField::REQUIRED
        .iter()
        .copied()
        .filter(|&field| column_for(mappings, field).is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn targets(mappings: &[ColumnMapping]) -> Vec<Option<CanonicalField>> {
        mappings.iter().map(|m| m.target_field).collect()
    }

    #[test]
    fn test_recognize_common_headers() {
        assert_eq!(recognize_header("Transaction Date")[0], CanonicalField::Date);
        assert_eq!(recognize_header("Payee")[0], CanonicalField::Merchant);
        assert_eq!(recognize_header("AMOUNT")[0], CanonicalField::Amount);
        assert_eq!(recognize_header("Category")[0], CanonicalField::Category);
        assert_eq!(recognize_header("Bank")[0], CanonicalField::InstitutionName);
        assert_eq!(recognize_header("Account Name")[0], CanonicalField::AccountName);
        assert_eq!(recognize_header("Memo")[0], CanonicalField::OriginalStatement);
        assert_eq!(recognize_header("Notes")[0], CanonicalField::Notes);
        assert_eq!(recognize_header("Tags")[0], CanonicalField::Tags);
        assert!(recognize_header("Running Bal.").is_empty());
    }

    #[test]
    fn test_chase_style_headers() {
        let mappings = suggest_mappings(&columns(&[
            "Transaction Date",
            "Post Date",
            "Description",
            "Category",
            "Type",
            "Amount",
            "Memo",
        ]));
        assert_eq!(
            targets(&mappings),
            vec![
                Some(CanonicalField::Date),
                // date already claimed
                None,
                Some(CanonicalField::Merchant),
                Some(CanonicalField::Category),
                None,
                Some(CanonicalField::Amount),
                Some(CanonicalField::OriginalStatement),
            ]
        );
        assert!(missing_required_fields(&mappings).is_empty());
    }

    #[test]
    fn test_second_description_falls_through_to_statement() {
        let mappings = suggest_mappings(&columns(&[
            "Date",
            "Description",
            "Original Description",
            "Amount",
        ]));
        assert_eq!(
            targets(&mappings),
            vec![
                Some(CanonicalField::Date),
                Some(CanonicalField::Merchant),
                Some(CanonicalField::OriginalStatement),
                Some(CanonicalField::Amount),
            ]
        );
    }

    #[test]
    fn test_each_field_used_once() {
        let mappings = suggest_mappings(&columns(&["Amount", "Amount (USD)", "Total"]));
        assert_eq!(
            targets(&mappings),
            vec![Some(CanonicalField::Amount), None, None]
        );
    }

    #[test]
    fn test_missing_required_fields() {
        let mappings = suggest_mappings(&columns(&["colA", "colB", "Amount"]));
        assert_eq!(
            missing_required_fields(&mappings),
            vec![CanonicalField::Date, CanonicalField::Merchant]
        );
        assert_eq!(column_for(&mappings, CanonicalField::Amount), Some("Amount"));
    }
}
