//! Formula field stages: collect from the source app, rewrite, push.

use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::api::{Field, QuickbaseClient, Table};
use crate::config::MigrationOptions;
use crate::error::{Error, Result};
use crate::fanout::fan_out;
use crate::mapping::Mapping;
use crate::store::{unique_file_stems, Store, FIELDS_SOURCE_DIR, FIELDS_TARGET_DIR, TABLES_DIR};

const JSON_EXT: &str = ".json";

/// Keeps formula fields that reference at least one mapping key.
pub fn referencing_fields(fields: Vec<Field>, mapping: &Mapping) -> Vec<Field> {
    fields
        .into_iter()
        .filter(|field| !field.formula().is_empty() && mapping.matches(field.formula()))
        .collect()
}

/// Saves the formula fields of every mapped source table that reference a
/// mapping key to `fields/source/<tableId>.json`.
///
/// Tables come from the listing persisted by the mapping stage. Returns the
/// number of fields found.
pub async fn collect_source_fields(
    source: &QuickbaseClient,
    mapping: &Mapping,
    store: &Store,
    options: &MigrationOptions,
) -> Result<usize> {
    info!("Saving fields...");

    let tables: Vec<Table> = store.read_json(TABLES_DIR, &source.app().id)?;
    let table_ids: Vec<&str> = mapping
        .mapped_tables(&tables)
        .into_iter()
        .map(|table| table.id.as_str())
        .collect();

    let counts = fan_out(table_ids, options.concurrency, move |table_id| async move {
        let fields = referencing_fields(source.get_fields(table_id).await?, mapping);
        if fields.is_empty() {
            debug!("Table {} has no formulas to migrate", table_id);
            return Ok(0);
        }

        info!("Saving {} fields of table {}", fields.len(), table_id);
        store.save_json(FIELDS_SOURCE_DIR, table_id, &fields)?;
        Ok(fields.len())
    })
    .await?;

    Ok(counts.into_iter().sum())
}

/// Rewrites every collected formula and updates the field in the mapped
/// target table.
///
/// Every file is resolved before the first update, so a table without a
/// mapping fails the stage without touching the target. Returns the number
/// of fields updated.
pub async fn push_fields(
    target: &QuickbaseClient,
    mapping: &Mapping,
    store: &Store,
    options: &MigrationOptions,
    progress: &ProgressBar,
) -> Result<usize> {
    info!("Updating fields...");

    let mut jobs = Vec::new();
    for file in store.list(FIELDS_SOURCE_DIR)? {
        let Some(table_id) = file.strip_suffix(JSON_EXT) else {
            continue;
        };
        let target_table = mapping
            .get(table_id)
            .ok_or_else(|| Error::MissingMapping(table_id.to_string()))?
            .to_string();

        let fields: Vec<Field> = store.read_json(FIELDS_SOURCE_DIR, table_id)?;
        jobs.extend(fields.into_iter().map(|field| (target_table.clone(), field)));
    }

    let names = unique_file_stems(
        jobs.iter()
            .map(|(table_id, field)| format!("{}_{}_{}", table_id, field.id, field.label)),
    );
    let jobs = jobs.into_iter().zip(names);

    progress.set_length(jobs.len() as u64);
    let dry_run = options.dry_run;

    let updated = fan_out(jobs, options.concurrency, move |((table_id, mut field), name)| async move {
        let rewritten = mapping.rewrite(field.formula());
        field.properties.formula = rewritten.text;

        info!(
            "Updating field {}/{} in table {}",
            field.id, field.label, table_id
        );
        if !dry_run {
            target
                .update_field(&table_id, field.id, field.formula())
                .await?;
        }

        store.save_json(FIELDS_TARGET_DIR, &name, &field)?;
        progress.inc(1);
        Ok(())
    })
    .await?;

    Ok(updated.len())
}

#[cfg(test)]
#[path = "fields_tests.rs"]
mod tests;
