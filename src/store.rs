//! SQLite loaders and report writer used by the CLI.
//!
//! Everything the engine sees is loaded here once, up front, into plain
//! in-memory tables. Columns are resolved by header name, so a renamed or
//! missing column fails the load instead of silently shifting facts.

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};

use crate::config::{InputSchema, ReferenceSchema};
use crate::index::StatusVocabulary;
use crate::models::{CompanyRecord, EnrichedRow, InputRow, RawTable};
use crate::progress::{create_progress_bar, create_spinner};

const WRITE_BATCH_SIZE: usize = 10_000;

/// Output table name.
pub const REPORT_TABLE: &str = "account_plan";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Cell as text; NULL, blobs and blank strings are absent.
fn cell_text(value: ValueRef<'_>) -> Option<String> {
    let text = match value {
        ValueRef::Null | ValueRef::Blob(_) => return None,
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Read a whole table in rowid order.
pub fn read_table(conn: &Connection, table: &str) -> Result<RawTable> {
    let sql = format!("SELECT * FROM {}", quote_ident(table));
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("Failed to read table '{}'", table))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            cells.push(cell_text(row.get_ref(i)?));
        }
        rows.push(cells);
    }

    Ok(RawTable {
        name: table.to_string(),
        columns,
        rows,
    })
}

/// Load the reference directory. Rows without a site are skipped.
pub fn load_reference(
    conn: &Connection,
    schema: &ReferenceSchema,
    vocabulary: &StatusVocabulary,
) -> Result<Vec<CompanyRecord>> {
    let spinner = create_spinner("Loading reference directory");
    let raw = read_table(conn, &schema.table)?;
    let name_idx = raw.column_index(&schema.name_column)?;
    let country_idx = raw.column_index(&schema.country_column)?;
    let site_idx = raw.column_index(&schema.site_column)?;
    let status_idx = raw.column_index(&schema.status_column)?;

    let mut records = Vec::with_capacity(raw.rows.len());
    let mut skipped = 0usize;
    for row in 0..raw.rows.len() {
        let Some(site) = raw.cell(row, site_idx) else {
            skipped += 1;
            continue;
        };
        records.push(CompanyRecord::new(
            raw.cell(row, name_idx).unwrap_or(""),
            raw.cell(row, country_idx).unwrap_or(""),
            site,
            raw.cell(row, status_idx),
            vocabulary,
        ));
    }

    if skipped > 0 {
        log::warn!("Skipped {} reference rows without a site", skipped);
    }
    spinner.finish_with_message(format!("Loaded {} reference companies", records.len()));
    Ok(records)
}

/// Load the user list, keeping every original column.
pub fn load_input(conn: &Connection, schema: &InputSchema) -> Result<(Vec<String>, Vec<InputRow>)> {
    let raw = read_table(conn, &schema.table)?;
    let name_idx = raw.column_index(&schema.name_column)?;

    let rows = (0..raw.rows.len())
        .map(|row| InputRow {
            name: raw.cell(row, name_idx).map(str::to_string),
            fields: raw
                .columns
                .iter()
                .cloned()
                .zip(raw.rows[row].iter().cloned())
                .collect(),
        })
        .collect();

    log::info!("Loaded {} input rows from '{}'", raw.rows.len(), schema.table);
    Ok((raw.columns, rows))
}

/// Load secondary report tables, preserving their row order.
pub fn load_secondary(conn: &Connection, tables: &[&str]) -> Result<Vec<RawTable>> {
    let spinner = create_spinner("Loading secondary reports");
    let loaded = tables
        .iter()
        .map(|t| read_table(conn, t))
        .collect::<Result<Vec<_>>>()?;
    spinner.finish_with_message(format!("Loaded {} secondary reports", loaded.len()));
    Ok(loaded)
}

// ============================================================================
// Writing
// ============================================================================

/// Computed report columns, in output order.
pub fn report_columns(product_lines: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = [
        "Normalized Name",
        "Website",
        "Match Stage",
        "Match Score",
        "Account Owner",
        "Account Status",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    for line in product_lines {
        columns.push(format!("{} Won", line));
        columns.push(format!("{} Opportunity", line));
        columns.push(format!("{} Status", line));
    }
    columns.push("Suggestions".to_string());
    columns.push("Error".to_string());
    columns
}

fn report_values(row: &EnrichedRow, input_columns: &[String]) -> Result<Vec<Option<String>>> {
    let mut values: Vec<Option<String>> = input_columns
        .iter()
        .map(|column| {
            row.input
                .fields
                .iter()
                .find(|(name, _)| name == column)
                .and_then(|(_, value)| value.clone())
        })
        .collect();

    let resolution = row.query.outcome.resolution.as_ref();
    values.push(Some(row.query.name_norm.clone()));
    values.push(resolution.map(|r| r.site.clone()));
    values.push(resolution.map(|r| r.stage.as_str().to_string()));
    values.push(resolution.map(|r| r.score.to_string()));
    values.push(row.facts.owner.clone());
    values.push(row.facts.account_status.clone());
    for product in &row.facts.products {
        values.push(product.won.clone());
        values.push(product.opportunity.clone());
        values.push(Some(product.status.as_str().to_string()));
    }
    let suggestions = &row.query.outcome.suggestions;
    values.push(if suggestions.is_empty() {
        None
    } else {
        Some(serde_json::to_string(suggestions)?)
    });
    values.push(row.error.clone());
    Ok(values)
}

/// Write the report table. Input columns that share a name with a computed
/// column are replaced by the computed value.
pub fn write_report(
    conn: &mut Connection,
    input_columns: &[String],
    product_lines: &[String],
    rows: &[EnrichedRow],
) -> Result<()> {
    let computed = report_columns(product_lines);
    let kept_inputs: Vec<String> = input_columns
        .iter()
        .filter(|c| !computed.contains(c))
        .cloned()
        .collect();
    let all_columns: Vec<String> = kept_inputs.iter().chain(computed.iter()).cloned().collect();

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;",
    )?;

    let column_defs: Vec<String> = all_columns
        .iter()
        .map(|c| {
            let kind = if c == "Match Score" { "INTEGER" } else { "TEXT" };
            format!("{} {}", quote_ident(c), kind)
        })
        .collect();
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} (row_id INTEGER PRIMARY KEY, {defs});",
        table = quote_ident(REPORT_TABLE),
        defs = column_defs.join(", ")
    ))?;

    let placeholders: Vec<String> =
        (1..=all_columns.len() + 1).map(|i| format!("?{}", i)).collect();
    let insert_sql = format!(
        "INSERT INTO {} (row_id, {}) VALUES ({})",
        quote_ident(REPORT_TABLE),
        all_columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
        placeholders.join(", ")
    );

    let pb = create_progress_bar(rows.len() as u64, "Writing report");
    for (chunk_idx, chunk) in rows.chunks(WRITE_BATCH_SIZE).enumerate() {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&insert_sql)?;
            for (i, row) in chunk.iter().enumerate() {
                let row_id = (chunk_idx * WRITE_BATCH_SIZE + i) as i64;
                let mut values = vec![Some(row_id.to_string())];
                values.extend(report_values(row, &kept_inputs)?);
                stmt.execute(params_from_iter(values.iter()))?;
                pb.inc(1);
            }
        }
        tx.commit()?;
    }

    pb.finish_with_message(format!("Wrote {} report rows", rows.len()));
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_product_lines, AccountsSchema, ReconcileConfig};
    use crate::enrich::Enricher;
    use crate::error::{ReconcileError, Threshold};
    use crate::pipeline::{Pipeline, PipelineOptions};

    fn seed(conn: &Connection) {
        conn.execute_batch(
            r#"
            CREATE TABLE companies (
                "Account Name" TEXT, "Primary Country" TEXT, "Website" TEXT, "Account Status" TEXT
            );
            INSERT INTO companies VALUES ('Acme do Brasil Ltda', 'Brazil', 'acme.com', 'Customer');
            INSERT INTO companies VALUES ('Acme Mining', 'Brazil', 'mining.com', NULL);
            INSERT INTO companies VALUES ('No Site Co', 'Brazil', '  ', NULL);
            INSERT INTO companies VALUES ('Acme Chile', 'Chile', 'acme.cl', NULL);

            CREATE TABLE input ("EMPRESA" TEXT, "Region" TEXT, "Website" TEXT);
            INSERT INTO input VALUES ('ACME DO BRASIL', 'South', 'stale');
            INSERT INTO input VALUES (NULL, 'North', NULL);
            INSERT INTO input VALUES ('Unknown Widgets', 'East', NULL);

            CREATE TABLE newacc ("Website" TEXT, "Account Owner" TEXT, "Account Status" TEXT);
            INSERT INTO newacc VALUES ('acme.com', 'Ana', 'Customer');
            "#,
        )
        .unwrap();
        for table in ["wafwon", "wafopps", "apiwon", "apiopps", "gcwon", "gcopps"] {
            conn.execute_batch(&format!(
                r#"CREATE TABLE {} ("Website" TEXT, "Opportunity Name" TEXT);"#,
                table
            ))
            .unwrap();
        }
        conn.execute_batch(
            r#"INSERT INTO wafopps VALUES ('acme.com', 'WAF pilot');
               INSERT INTO apiwon VALUES ('acme.com', 42);"#,
        )
        .unwrap();
    }

    #[test]
    fn test_read_table_converts_cells() {
        let conn = Connection::open_in_memory().unwrap();
        seed(&conn);
        let raw = read_table(&conn, "apiwon").unwrap();
        assert_eq!(raw.columns, vec!["Website", "Opportunity Name"]);
        assert_eq!(raw.cell(0, 1), Some("42"));
    }

    #[test]
    fn test_read_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = read_table(&conn, "nope").unwrap_err();
        assert!(err.to_string().contains("Failed to read table 'nope'"));
    }

    #[test]
    fn test_load_reference_skips_blank_sites() {
        let conn = Connection::open_in_memory().unwrap();
        seed(&conn);
        let records =
            load_reference(&conn, &ReferenceSchema::default(), &StatusVocabulary::default())
                .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name_norm, "acme do brasil");
        assert_eq!(records[0].priority, 6);
        assert_eq!(records[2].country, "Chile");
    }

    #[test]
    fn test_load_reference_missing_column() {
        let conn = Connection::open_in_memory().unwrap();
        seed(&conn);
        let schema = ReferenceSchema {
            site_column: "Domain".to_string(),
            ..Default::default()
        };
        let err = load_reference(&conn, &schema, &StatusVocabulary::default()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReconcileError>(),
            Some(&ReconcileError::MissingColumn {
                table: "companies".to_string(),
                column: "Domain".to_string(),
            })
        );
    }

    #[test]
    fn test_load_input_keeps_fields() {
        let conn = Connection::open_in_memory().unwrap();
        seed(&conn);
        let (columns, rows) = load_input(&conn, &InputSchema::default()).unwrap();
        assert_eq!(columns, vec!["EMPRESA", "Region", "Website"]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name.as_deref(), Some("ACME DO BRASIL"));
        assert_eq!(rows[1].name, None);
        assert_eq!(rows[1].fields[1], ("Region".to_string(), Some("North".to_string())));
    }

    #[test]
    fn test_end_to_end_report() {
        let mut conn = Connection::open_in_memory().unwrap();
        seed(&conn);
        let config = ReconcileConfig::default();
        let vocabulary = config.vocabulary().unwrap();
        let records = load_reference(&conn, &config.reference, &vocabulary).unwrap();
        let (columns, rows) = load_input(&conn, &config.input).unwrap();
        let tables = load_secondary(&conn, &config.secondary_tables()).unwrap();
        let enricher =
            Enricher::from_tables(&tables, &AccountsSchema::default(), &default_product_lines())
                .unwrap();
        let lines: Vec<String> = enricher.product_lines().map(str::to_string).collect();

        let pipeline = Pipeline::new(
            &records,
            enricher,
            PipelineOptions::new("Brazil", Threshold::new(85).unwrap()),
        );
        let (results, _) = pipeline.run(&rows);
        write_report(&mut conn, &columns, &lines, &results).unwrap();

        let report = read_table(&conn, REPORT_TABLE).unwrap();
        assert_eq!(report.rows.len(), 3);
        // Input "Website" is replaced by the computed column
        assert_eq!(report.columns.iter().filter(|c| *c == "Website").count(), 1);

        let col = |name: &str| report.column_index(name).unwrap();
        assert_eq!(report.cell(0, col("Website")), Some("acme.com"));
        assert_eq!(report.cell(0, col("Region")), Some("South"));
        assert_eq!(report.cell(0, col("Match Stage")), Some("exact"));
        assert_eq!(report.cell(0, col("Account Owner")), Some("Ana"));
        assert_eq!(report.cell(0, col("WAF Status")), Some("Partner"));
        assert_eq!(report.cell(0, col("API Status")), Some("Customer"));
        assert_eq!(report.cell(0, col("GC Status")), Some("Free"));

        assert_eq!(report.cell(1, col("Error")), Some("missing company name"));
        assert_eq!(report.cell(1, col("Website")), None);

        assert_eq!(report.cell(2, col("Website")), None);
        assert_eq!(report.cell(2, col("Account Owner")), None);
        assert_eq!(report.cell(2, col("WAF Status")), Some("Free"));
        assert_eq!(report.cell(2, col("Error")), None);
    }

    #[test]
    fn test_report_columns() {
        let columns = report_columns(&["WAF".to_string()]);
        assert_eq!(
            &columns[6..9],
            &["WAF Won".to_string(), "WAF Opportunity".to_string(), "WAF Status".to_string()]
        );
        assert_eq!(columns.last().map(String::as_str), Some("Error"));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("Account Name"), "\"Account Name\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
