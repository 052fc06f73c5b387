//! Code page stages: fetch from the source app, rewrite, push to the target.

use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::api::QuickbaseClient;
use crate::config::MigrationOptions;
use crate::error::Result;
use crate::fanout::fan_out;
use crate::mapping::Mapping;
use crate::store::{Store, PAGES_SOURCE_DIR, PAGES_TARGET_DIR};

const PAGE_EXT: &str = ".txt";

/// Fetches every listed page and saves it to `pages/source/<id>.txt`.
///
/// Returns the number of pages saved.
pub async fn save_pages(
    source: &QuickbaseClient,
    page_ids: &[u64],
    store: &Store,
    options: &MigrationOptions,
) -> Result<usize> {
    info!("Saving code pages...");

    let saved = fan_out(page_ids, options.concurrency, move |page_id| async move {
        let id = page_id.to_string();
        info!("Saving code page {}", id);
        let page = source.get_page(&id).await?;
        store.save_text(PAGES_SOURCE_DIR, &format!("{id}{PAGE_EXT}"), page.pagebody.trim())?;
        Ok(())
    })
    .await?;

    Ok(saved.len())
}

/// Rewrites every saved page and pushes the ones that reference a mapping key.
///
/// Pages without any key are left alone. Returns the number of pages updated.
pub async fn replace_pages(
    target: &QuickbaseClient,
    mapping: &Mapping,
    store: &Store,
    options: &MigrationOptions,
    progress: &ProgressBar,
) -> Result<usize> {
    info!("Updating code pages...");

    let files = store.list(PAGES_SOURCE_DIR)?;
    progress.set_length(files.len() as u64);
    let dry_run = options.dry_run;

    let updated = fan_out(files, options.concurrency, move |file| async move {
        let rewritten = mapping.rewrite(&store.read_text(PAGES_SOURCE_DIR, &file)?);
        let page_id = file.strip_suffix(PAGE_EXT).unwrap_or(&file);

        let changed = rewritten.changed();
        if changed {
            info!("Updating code page {}", page_id);
            if !dry_run {
                target.replace_page(page_id, &rewritten.text).await?;
            }
            store.save_text(PAGES_TARGET_DIR, &file, &rewritten.text)?;
        } else {
            debug!("Code page {} has no mapped references", page_id);
        }

        progress.inc(1);
        Ok(changed)
    })
    .await?;

    Ok(updated.into_iter().filter(|changed| *changed).count())
}
