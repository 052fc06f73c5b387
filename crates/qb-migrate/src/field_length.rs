//! Field-length normalization of the target app's plain text fields.

use std::path::PathBuf;
use tracing::info;

use crate::api::{Field, QuickbaseClient};
use crate::config::MigrationOptions;
use crate::error::Result;
use crate::fanout::fan_out;
use crate::store::Store;

/// Report written to the working directory.
pub const REPORT_FILE: &str = "fields.txt";

/// Labels of the resized fields, per table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLengthReport {
    tables: Vec<(String, Vec<String>)>,
}

impl FieldLengthReport {
    /// Records the fields resized in one table.
    pub fn add_table(&mut self, name: impl Into<String>, labels: Vec<String>) {
        self.tables.push((name.into(), labels));
    }

    /// Total number of resized fields.
    #[must_use]
    pub fn resized(&self) -> usize {
        self.tables.iter().map(|(_, labels)| labels.len()).sum()
    }

    /// Renders the report, tables in name order.
    #[must_use]
    pub fn render(&self) -> String {
        let mut tables: Vec<_> = self.tables.iter().collect();
        tables.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();
        for (name, labels) in tables {
            out.push_str(&format!("{name}\n--------------\n"));
            for label in labels {
                out.push_str(label);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    /// Writes the report to `fields.txt` in the store's root.
    pub fn save(&self, store: &Store) -> Result<PathBuf> {
        let path = store.root().join(REPORT_FILE);
        std::fs::write(&path, self.render())?;
        Ok(path)
    }
}

/// Sets `maxLength` on every plain text field of the target app.
///
/// Tables are processed one after another; the fields of a table are
/// updated concurrently.
pub async fn normalize_field_lengths(
    target: &QuickbaseClient,
    store: &Store,
    options: &MigrationOptions,
) -> Result<FieldLengthReport> {
    info!("Updating fields length...");

    let tables = target.get_tables().await?;
    let lengths = options.field_length;
    let dry_run = options.dry_run;
    let mut report = FieldLengthReport::default();

    for table in &tables.tables {
        let fields: Vec<Field> = target
            .get_fields(&table.id)
            .await?
            .into_iter()
            .filter(Field::is_plain_text)
            .collect();

        let table_id = table.id.as_str();
        let table_name = table.name.as_str();
        let labels = fan_out(fields, options.concurrency, move |field| async move {
            let max_length = lengths.for_field_type(&field.field_type).unwrap_or_default();
            info!(
                "Updating field length for field {}/{} in table {}",
                field.id, field.label, table_name
            );
            if !dry_run {
                target
                    .update_field_length(table_id, field.id, max_length)
                    .await?;
            }
            Ok(field.label)
        })
        .await?;

        report.add_table(table_name, labels);
    }

    report.save(store)?;
    info!("Updated fields length ({} fields)", report.resized());
    Ok(report)
}
