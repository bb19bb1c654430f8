//! Turn raw import rows into transaction inputs
//!
//! Parsing here is lenient by policy: a malformed amount becomes `0.0` and a
//! missing or malformed date becomes today. Nothing in this module fails.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate};
use tracing::warn;

use super::{ImportDefaults, RawRow};
use crate::import::mapping::column_for;
use crate::models::{CanonicalField, ColumnMapping, CreateTransactionInput};

/// Parse an amount, keeping only digits, the decimal point and a leading minus
///
/// `"$1,234.56"` parses to `1234.56`, `"-4.50"` to `-4.5`. Anything that
/// still fails to parse yields `0.0`.
pub fn parse_amount(s: &str) -> f64 {
    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let (negative, rest) = match kept.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, kept.as_str()),
    };
    // minus signs anywhere but the front are dropped
    let digits: String = rest.chars().filter(|c| *c != '-').collect();

    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if negative {
                -value
            } else {
                value
            }
        }
        _ => {
            if !s.trim().is_empty() {
                warn!("Unparsable amount {:?}, using 0.0", s);
            }
            0.0
        }
    }
}

/// Split comma-separated tags, trimming each and dropping empty ones
pub fn parse_tags(s: &str) -> BTreeSet<String> {
    s.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a date string in various common formats
///
/// `%Y` also accepts a two-digit year, so any match before year 1000 is
/// skipped and the next format gets a chance (`01/15/24` reaches `%m/%d/%y`).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%m-%d-%Y", // 01-15-2024
        "%d/%m/%Y", // 15/01/2024 (European)
        "%Y/%m/%d", // 2024/01/15
        "%d.%m.%Y", // 15.01.2024
    ];

    for fmt in formats {
        match NaiveDate::parse_from_str(s, fmt) {
            Ok(date) if date.year() >= 1000 => return Some(date),
            _ => continue,
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}

fn cell<'a>(
    row: &'a RawRow,
    mappings: &[ColumnMapping],
    field: CanonicalField,
) -> Option<&'a str> {
    let column = column_for(mappings, field)?;
    Some(row.get(column).map(|v| v.trim()).unwrap_or(""))
}

fn text(row: &RawRow, mappings: &[ColumnMapping], field: CanonicalField) -> String {
    cell(row, mappings, field).unwrap_or("").to_string()
}

/// Text of a mapped field, or the default when the field is unmapped
fn text_or(
    row: &RawRow,
    mappings: &[ColumnMapping],
    field: CanonicalField,
    default: Option<&str>,
) -> String {
    match cell(row, mappings, field) {
        Some(value) => value.to_string(),
        None => default.unwrap_or("").to_string(),
    }
}

/// Build one input from one row
pub fn transform_row(
    row: &RawRow,
    mappings: &[ColumnMapping],
    defaults: &ImportDefaults,
    today: NaiveDate,
) -> CreateTransactionInput {
    let date = cell(row, mappings, CanonicalField::Date)
        .and_then(parse_date)
        .unwrap_or(today);
    let amount = cell(row, mappings, CanonicalField::Amount)
        .map(parse_amount)
        .unwrap_or(0.0);
    let tags = cell(row, mappings, CanonicalField::Tags)
        .map(parse_tags)
        .unwrap_or_default();

    CreateTransactionInput {
        date,
        merchant: text(row, mappings, CanonicalField::Merchant),
        amount,
        institution_name: text_or(
            row,
            mappings,
            CanonicalField::InstitutionName,
            defaults.institution_name.as_deref(),
        ),
        account_name: text_or(
            row,
            mappings,
            CanonicalField::AccountName,
            defaults.account_name.as_deref(),
        ),
        category: text(row, mappings, CanonicalField::Category),
        original_statement: text(row, mappings, CanonicalField::OriginalStatement),
        notes: text(row, mappings, CanonicalField::Notes),
        tags,
        source_file: defaults.source_file.clone().unwrap_or_default(),
    }
}

/// Build one input per row, in row order
pub fn transform_rows(
    rows: &[RawRow],
    mappings: &[ColumnMapping],
    defaults: &ImportDefaults,
    today: NaiveDate,
) -> Vec<CreateTransactionInput> {
    rows.iter()
        .map(|row| transform_row(row, mappings, defaults, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::mapping::suggest_mappings;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn mapping(pairs: &[(&str, Option<CanonicalField>)]) -> Vec<ColumnMapping> {
        pairs
            .iter()
            .map(|(column, field)| ColumnMapping {
                source_column: column.to_string(),
                target_field: *field,
            })
            .collect()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56"), 1234.56);
        assert_eq!(parse_amount("-4.50"), -4.5);
        assert_eq!(parse_amount("$-4.50"), -4.5);
        assert_eq!(parse_amount(" 12 "), 12.0);
        assert_eq!(parse_amount("(100.00)"), 100.0);
    }

    #[test]
    fn test_parse_amount_lenient() {
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("1.2.3"), 0.0);
        assert_eq!(parse_amount("-"), 0.0);
    }

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags(" food, travel ,,work ");
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["food", "travel", "work"]
        );
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("01/15/2024"), expected);
        assert_eq!(parse_date("01/15/24"), expected);
        assert_eq!(parse_date("15/01/2024"), expected);
        assert_eq!(parse_date("2024-01-15T08:30:00Z"), expected);
        assert_eq!(parse_date("someday"), None);
        // no day-first short-year format, so this stays unparsed
        assert_eq!(parse_date("15/01/24"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_date_short_year() {
        assert_eq!(parse_date("12/31/99"), NaiveDate::from_ymd_opt(1999, 12, 31));
        assert_eq!(parse_date("3/5/25"), NaiveDate::from_ymd_opt(2025, 3, 5));
        assert_eq!(parse_date("01/15/0999"), None);
    }

    #[test]
    fn test_transform_required_fields() {
        let mappings = mapping(&[
            ("colA", Some(CanonicalField::Date)),
            ("colB", Some(CanonicalField::Merchant)),
            ("colC", Some(CanonicalField::Amount)),
        ]);
        let rows = vec![row(&[
            ("colA", "2024-01-01"),
            ("colB", "Coffee Shop"),
            ("colC", "-4.50"),
        ])];

        let inputs = transform_rows(&rows, &mappings, &ImportDefaults::default(), today());
        assert_eq!(inputs.len(), 1);
        let tx = &inputs[0];
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(tx.merchant, "Coffee Shop");
        assert_eq!(tx.amount, -4.5);
        assert_eq!(tx.category, "");
        assert_eq!(tx.original_statement, "");
        assert!(tx.tags.is_empty());
    }

    #[test]
    fn test_missing_date_defaults_to_today() {
        let mappings = mapping(&[
            ("Date", Some(CanonicalField::Date)),
            ("Payee", Some(CanonicalField::Merchant)),
            ("Amount", Some(CanonicalField::Amount)),
        ]);
        let rows = vec![
            row(&[("Payee", "Shop"), ("Amount", "1")]),
            row(&[("Date", "  "), ("Payee", "Shop"), ("Amount", "1")]),
        ];
        let inputs = transform_rows(&rows, &mappings, &ImportDefaults::default(), today());
        assert!(inputs.iter().all(|tx| tx.date == today()));
    }

    #[test]
    fn test_defaults_fill_unmapped_fields() {
        let mappings = suggest_mappings(&[
            "Date".to_string(),
            "Description".to_string(),
            "Amount".to_string(),
            "Account".to_string(),
        ]);
        let defaults = ImportDefaults {
            institution_name: Some("First Bank".into()),
            account_name: Some("Ignored".into()),
            source_file: Some("june.csv".into()),
        };
        let rows = vec![row(&[
            ("Date", "06/01/2025"),
            ("Description", "Grocer"),
            ("Amount", "-20"),
            ("Account", "Visa"),
        ])];

        let tx = &transform_rows(&rows, &mappings, &defaults, today())[0];
        assert_eq!(tx.institution_name, "First Bank");
        // mapped column wins over the default
        assert_eq!(tx.account_name, "Visa");
        assert_eq!(tx.source_file, "june.csv");
    }

    #[test]
    fn test_transform_preserves_row_order_and_count() {
        let mappings = mapping(&[
            ("d", Some(CanonicalField::Date)),
            ("m", Some(CanonicalField::Merchant)),
            ("a", Some(CanonicalField::Amount)),
            ("t", Some(CanonicalField::Tags)),
        ]);
        let rows: Vec<RawRow> = (1..=12)
            .map(|i| {
                let amount = i.to_string();
                let merchant = format!("Shop {}", i);
                row(&[
                    ("d", "2024-03-01"),
                    ("m", merchant.as_str()),
                    ("a", amount.as_str()),
                    ("t", "a, b"),
                ])
            })
            .collect();

        let inputs = transform_rows(&rows, &mappings, &ImportDefaults::default(), today());
        assert_eq!(inputs.len(), 12);
        for (i, tx) in inputs.iter().enumerate() {
            assert_eq!(tx.merchant, format!("Shop {}", i + 1));
            assert_eq!(tx.amount, (i + 1) as f64);
            assert_eq!(tx.tags.len(), 2);
        }
    }
}
