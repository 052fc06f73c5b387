//! Migration pipeline orchestration.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::info;

use crate::api::{App, QuickbaseClient, Table};
use crate::config::Config;
use crate::error::Result;
use crate::field_length::normalize_field_lengths;
use crate::fields::{collect_source_fields, push_fields};
use crate::mapping::{create_mapping, Mapping};
use crate::pages::{replace_pages, save_pages};
use crate::rules::generate_rules;
use crate::store::{
    Store, FIELDS_SOURCE_DIR, FIELDS_TARGET_DIR, MAPPING_DIR, PAGES_SOURCE_DIR, PAGES_TARGET_DIR,
    RULES_DIR, STAGE_DIRS, TABLES_DIR,
};

/// Migration statistics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MigrationStats {
    /// Source tables paired with a target table.
    pub tables_mapped: usize,
    /// Code pages fetched from the source app.
    pub pages_saved: usize,
    /// Code pages pushed to the target app.
    pub pages_updated: usize,
    /// Formula fields that reference a mapping key.
    pub fields_found: usize,
    /// Formula fields pushed to the target app.
    pub fields_updated: usize,
    /// Text fields whose max length was set.
    pub fields_resized: usize,
    /// Rule files written.
    pub rules_written: usize,
    /// Duration in seconds.
    pub duration_secs: f64,
}

/// A migration command that runs one or more stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Build the mapping only.
    Mapping,
    /// Mapping, then code pages.
    Pages,
    /// Mapping, then formula fields.
    Fields,
    /// Mapping, code pages and formula fields.
    Run,
}

impl Job {
    /// Folders cleared before the job starts.
    #[must_use]
    pub fn folders(self) -> &'static [&'static str] {
        match self {
            Self::Mapping => &[MAPPING_DIR, TABLES_DIR],
            Self::Pages => &[MAPPING_DIR, TABLES_DIR, PAGES_SOURCE_DIR, PAGES_TARGET_DIR],
            Self::Fields => &[MAPPING_DIR, TABLES_DIR, FIELDS_SOURCE_DIR, FIELDS_TARGET_DIR],
            Self::Run => &STAGE_DIRS,
        }
    }

    fn runs_pages(self) -> bool {
        matches!(self, Self::Pages | Self::Run)
    }

    fn runs_fields(self) -> bool {
        matches!(self, Self::Fields | Self::Run)
    }
}

/// Migration pipeline.
pub struct Pipeline {
    config: Config,
    store: Store,
    source: QuickbaseClient,
    target: QuickbaseClient,
    show_progress: bool,
}

impl Pipeline {
    /// Create a new migration pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or a base URL is
    /// malformed.
    pub fn new(config: Config, store: Store) -> Result<Self> {
        config.validate()?;
        let source = QuickbaseClient::new(config.source.clone(), &config.options)?;
        let target = QuickbaseClient::new(config.target.clone(), &config.options)?;

        Ok(Self {
            config,
            store,
            source,
            target,
            show_progress: true,
        })
    }

    /// Enables or disables progress bars.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetches the source and target app metadata.
    pub async fn apps(&self) -> Result<(App, App)> {
        futures::try_join!(self.source.get_app(), self.target.get_app())
    }

    /// Run a migration job.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage; later stages are not started.
    pub async fn run(&self, job: Job) -> Result<MigrationStats> {
        let start = Instant::now();
        let mut stats = MigrationStats::default();
        let options = &self.config.options;

        info!("Starting {:?} job", job);
        if options.dry_run {
            info!("Dry run mode - not writing to the target app");
        }

        self.store.clear_all(job.folders())?;

        let mapping = create_mapping(&self.source, &self.target, &self.store).await?;
        stats.tables_mapped = self.count_mapped_tables(&mapping)?;

        if job.runs_pages() {
            stats.pages_saved =
                save_pages(&self.source, &self.config.pages, &self.store, options).await?;

            let progress = self.progress_bar();
            stats.pages_updated =
                replace_pages(&self.target, &mapping, &self.store, options, &progress).await?;
            progress.finish_with_message("Code pages updated");
        }

        if job.runs_fields() {
            stats.fields_found =
                collect_source_fields(&self.source, &mapping, &self.store, options).await?;

            let progress = self.progress_bar();
            stats.fields_updated =
                push_fields(&self.target, &mapping, &self.store, options, &progress).await?;
            progress.finish_with_message("Fields updated");
        }

        stats.duration_secs = start.elapsed().as_secs_f64();
        info!(
            "{:?} complete: {} tables mapped, {} pages updated, {} fields updated in {:.2}s",
            job, stats.tables_mapped, stats.pages_updated, stats.fields_updated, stats.duration_secs
        );

        Ok(stats)
    }

    /// Sets the max length of every plain text field in the target app.
    pub async fn normalize_field_lengths(&self) -> Result<MigrationStats> {
        let start = Instant::now();
        let report =
            normalize_field_lengths(&self.target, &self.store, &self.config.options).await?;

        Ok(MigrationStats {
            fields_resized: report.resized(),
            duration_secs: start.elapsed().as_secs_f64(),
            ..Default::default()
        })
    }

    /// Regenerates the custom text rules from the target app.
    pub async fn generate_rules(&self) -> Result<MigrationStats> {
        let start = Instant::now();
        let written = generate_rules(&self.target, &self.store, &self.config.options).await?;

        Ok(MigrationStats {
            rules_written: written,
            duration_secs: start.elapsed().as_secs_f64(),
            ..Default::default()
        })
    }

    fn count_mapped_tables(&self, mapping: &Mapping) -> Result<usize> {
        let tables: Vec<Table> = self
            .store
            .read_json(TABLES_DIR, &self.config.source.id)?;
        Ok(mapping.mapped_tables(&tables).len())
    }

    fn progress_bar(&self) -> ProgressBar {
        if self.show_progress {
            create_progress_bar()
        } else {
            ProgressBar::hidden()
        }
    }
}

/// Clears the rule output folder and every stage folder.
pub fn clear_all(store: &Store) -> Result<()> {
    store.clear_all(&STAGE_DIRS)?;
    store.clear(RULES_DIR)
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
