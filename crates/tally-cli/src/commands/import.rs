//! CSV import command implementation

use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{CanonicalField, ImportDefaults, ImportPipeline, RawRow, TransactionStore};

use super::{format_amount, truncate};

/// Flags controlling one import run
#[derive(Debug, Default)]
pub struct ImportOptions {
    /// `COLUMN=FIELD` overrides of the suggested mappings
    pub mappings: Vec<String>,
    /// Columns to leave unmapped
    pub unmapped: Vec<String>,
    pub institution: Option<String>,
    pub account: Option<String>,
    pub include_duplicates: bool,
    pub dry_run: bool,
    pub yes: bool,
}

/// Tokenize a CSV file into its header row and data rows
pub fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<RawRow>)> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    read_csv_from(file).with_context(|| format!("Failed to parse CSV: {}", path.display()))
}

pub fn read_csv_from<R: Read>(reader: R) -> Result<(Vec<String>, Vec<RawRow>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", i + 2))?;
        let row: RawRow = columns
            .iter()
            .zip(record.iter())
            .map(|(column, value)| (column.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok((columns, rows))
}

/// Split a `COLUMN=FIELD` argument
///
/// The last `=` separates the field, so column names may contain `=`.
pub fn parse_mapping_arg(arg: &str) -> Result<(String, CanonicalField)> {
    let (column, field) = arg
        .rsplit_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid mapping '{}', expected COLUMN=FIELD", arg))?;
    let field: CanonicalField = field.trim().parse().map_err(|e: String| anyhow::anyhow!(e))?;
    Ok((column.trim().to_string(), field))
}

fn apply_overrides(pipeline: &mut ImportPipeline, options: &ImportOptions) -> Result<()> {
    for column in &options.unmapped {
        pipeline.set_mapping(column, None)?;
    }

    for arg in &options.mappings {
        let (column, field) = parse_mapping_arg(arg)?;
        // an explicit mapping takes the field away from whichever column had it
        let holder = pipeline
            .mappings()
            .iter()
            .find(|m| m.target_field == Some(field) && m.source_column != column)
            .map(|m| m.source_column.clone());
        if let Some(holder) = holder {
            pipeline.set_mapping(&holder, None)?;
        }
        pipeline.set_mapping(&column, Some(field))?;
    }

    Ok(())
}

fn print_mappings(pipeline: &ImportPipeline) {
    println!();
    println!("🧭 Column Mapping");
    println!("   ─────────────────────────────");
    for mapping in pipeline.mappings() {
        match mapping.target_field {
            Some(field) => println!("   {:<24} → {}", truncate(&mapping.source_column, 24), field),
            None => println!("   {:<24}   (ignored)", truncate(&mapping.source_column, 24)),
        }
    }
}

fn print_preview(pipeline: &ImportPipeline) {
    println!();
    println!("👀 Preview");
    println!("   ─────────────────────────────────────────────────────────────");
    for (i, row) in pipeline.preview_rows().iter().enumerate() {
        let mark = if pipeline.is_selected(i) { "✓" } else { " " };
        let dup = if row.is_duplicate { " (duplicate)" } else { "" };
        println!(
            "   [{}] {} │ {:>10} │ {}{}",
            mark,
            row.input.date,
            format_amount(row.input.amount),
            truncate(&row.input.merchant, 40),
            dup
        );
    }

    let summary = pipeline.summary();
    println!();
    println!(
        "   {} rows, {} duplicates, {} selected",
        summary.total, summary.duplicates, summary.selected
    );
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub async fn cmd_import(
    store: &TransactionStore,
    file: &Path,
    options: &ImportOptions,
) -> Result<()> {
    println!("📥 Importing from {}...", file.display());

    let (columns, rows) = read_csv(file)?;
    println!("   Found {} rows in {} columns", rows.len(), columns.len());

    let defaults = ImportDefaults {
        institution_name: options.institution.clone(),
        account_name: options.account.clone(),
        source_file: file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    };
    let mut pipeline = ImportPipeline::new(columns, rows).with_defaults(defaults);
    apply_overrides(&mut pipeline, options)?;
    print_mappings(&pipeline);

    let missing = pipeline.missing_required_fields();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
        anyhow::bail!(
            "Required fields are not mapped: {}\n\
             Map them with --map \"COLUMN=FIELD\"",
            names.join(", ")
        );
    }

    pipeline.preview(store).await?;
    if options.include_duplicates {
        pipeline.select_duplicates()?;
    }
    print_preview(&pipeline);

    if options.dry_run {
        pipeline.cancel()?;
        println!();
        println!("Dry run: nothing was saved.");
        return Ok(());
    }

    if pipeline.selected_count() == 0 {
        let duplicates = pipeline.summary().duplicates;
        pipeline.cancel()?;
        println!();
        println!("Nothing to import: no rows are selected.");
        if duplicates > 0 {
            println!("   Use --include-duplicates to import duplicates anyway.");
        }
        return Ok(());
    }

    if !options.yes
        && !confirm(&format!("Import {} transactions?", pipeline.selected_count()))?
    {
        pipeline.cancel()?;
        println!("Import cancelled.");
        return Ok(());
    }

    let created = pipeline.commit(store).await?;
    let skipped = pipeline.row_count() - created.len();

    println!();
    println!("✅ Import complete!");
    println!("   Imported: {}", created.len());
    println!("   Skipped: {}", skipped);

    Ok(())
}
