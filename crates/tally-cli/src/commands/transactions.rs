//! Transaction command implementations

use std::collections::HashSet;

use anyhow::Result;
use chrono::NaiveDate;
use tally_core::import::parse_tags;
use tally_core::query::{self, SortDirection, SortField, SortSpec, TransactionFilters};
use tally_core::{CreateTransactionInput, Transaction, TransactionStore, TransactionUpdate};

use super::{format_amount, truncate};
use crate::cli::{ListArgs, OptionalFields};

/// Assemble a manual entry from command-line fields
pub fn build_input(
    date: NaiveDate,
    merchant: String,
    amount: f64,
    fields: OptionalFields,
) -> CreateTransactionInput {
    let mut input = CreateTransactionInput::new(date, merchant, amount);
    input.institution_name = fields.institution.unwrap_or_default();
    input.account_name = fields.account.unwrap_or_default();
    input.category = fields.category.unwrap_or_default();
    input.original_statement = fields.statement.unwrap_or_default();
    input.notes = fields.notes.unwrap_or_default();
    input.tags = fields.tags.as_deref().map(parse_tags).unwrap_or_default();
    input.source_file = "manual".to_string();
    input
}

/// Collect only the fields given on the command line
pub fn build_update(
    date: Option<NaiveDate>,
    merchant: Option<String>,
    amount: Option<f64>,
    fields: OptionalFields,
) -> TransactionUpdate {
    TransactionUpdate {
        date,
        merchant,
        amount,
        institution_name: fields.institution,
        account_name: fields.account,
        category: fields.category,
        original_statement: fields.statement,
        notes: fields.notes,
        tags: fields.tags.as_deref().map(parse_tags),
        source_file: None,
    }
}

fn print_transaction(tx: &Transaction) {
    println!(
        "   {} │ {:>10} │ {} │ {}",
        tx.date,
        format_amount(tx.amount),
        truncate(&tx.merchant, 30),
        tx.id
    );
}

pub async fn cmd_list(
    store: &TransactionStore,
    args: &ListArgs,
    default_page_size: usize,
) -> Result<()> {
    let filters = TransactionFilters::new()
        .date_range(args.from, args.to)
        .institution(args.institution.as_deref())
        .account(args.account.as_deref())
        .category(args.category.as_deref())
        .amount_range(args.min, args.max)
        .tag(args.tag.as_deref())
        .search(args.search.as_deref());

    let sort_spec = match args.sort.as_deref() {
        Some(field) => Some(SortSpec {
            field: field.parse::<SortField>().map_err(|e| anyhow::anyhow!(e))?,
            direction: if args.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        }),
        None => None,
    };
    let page_size = args.page_size.unwrap_or(default_page_size);
    if page_size == 0 {
        anyhow::bail!("--page-size must be at least 1");
    }

    let transactions = store.list_transactions().await;
    if transactions.is_empty() {
        println!("No transactions found. Import some with:");
        println!("  tally import --file statement.csv");
        return Ok(());
    }

    let page = query::query(&transactions, &filters, sort_spec, args.page, page_size);

    println!();
    println!(
        "📝 Transactions ({} matching, page {} of {})",
        page.total,
        page.page,
        page.total_pages.max(1)
    );
    println!("   ─────────────────────────────────────────────────────────────");

    if page.items.is_empty() {
        println!("   (no transactions on this page)");
    }
    for tx in &page.items {
        print_transaction(tx);
    }

    Ok(())
}

pub async fn cmd_add(store: &TransactionStore, input: CreateTransactionInput) -> Result<()> {
    let created = store.add_transactions(vec![input]).await?;

    println!("✅ Added transaction:");
    for tx in &created {
        print_transaction(tx);
    }

    Ok(())
}

pub async fn cmd_update(
    store: &TransactionStore,
    id: &str,
    update: TransactionUpdate,
) -> Result<()> {
    if update.is_empty() {
        anyhow::bail!("Nothing to update. Pass at least one field option.");
    }

    let tx = store.update_transaction(id, update).await?;

    println!("✅ Updated transaction {}:", id);
    print_transaction(&tx);

    Ok(())
}

/// Drop repeated ids, keeping first occurrences in order
pub fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Delete one transaction strictly, or several leniently
///
/// A single unknown id is an error; in a batch, unknown ids are skipped.
pub async fn cmd_delete(store: &TransactionStore, ids: &[String]) -> Result<()> {
    match ids {
        [] => anyhow::bail!("No transaction IDs given"),
        [id] => {
            store.delete_transaction(id).await?;
            println!("🗑️  Deleted transaction {}", id);
        }
        _ => {
            let requested = unique_ids(ids);
            let removed = store.delete_transactions(&requested).await?;
            println!("🗑️  Deleted {} of {} transactions", removed, requested.len());
            if removed < requested.len() {
                println!("   {} IDs were not found", requested.len() - removed);
            }
        }
    }

    Ok(())
}
