//! File-based intermediate storage shared by the pipeline stages.
//!
//! Every stage writes its output below the working directory and the next
//! stage reads it back, so a stage can be re-run on its own.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::warn;

use crate::error::Result;

/// Mapping output folder.
pub const MAPPING_DIR: &str = "mapping";
/// Table listings, one file per app.
pub const TABLES_DIR: &str = "tables";
/// Code pages fetched from the source app.
pub const PAGES_SOURCE_DIR: &str = "pages/source";
/// Code pages as pushed to the target app.
pub const PAGES_TARGET_DIR: &str = "pages/target";
/// Formula fields that reference a mapping key, one file per source table.
pub const FIELDS_SOURCE_DIR: &str = "fields/source";
/// Rewritten fields as pushed to the target app.
pub const FIELDS_TARGET_DIR: &str = "fields/target";
/// Generated custom text rules.
pub const RULES_DIR: &str = "rules";
/// Rule templates.
pub const PLACEHOLDERS_DIR: &str = "placeholders";

/// Every folder written by the migration stages.
pub const STAGE_DIRS: [&str; 6] = [
    MAPPING_DIR,
    TABLES_DIR,
    PAGES_SOURCE_DIR,
    PAGES_TARGET_DIR,
    FIELDS_SOURCE_DIR,
    FIELDS_TARGET_DIR,
];

const MAPPING_FILE: &str = "mapping";

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?!&*/]").expect("static pattern"))
}

/// Replaces characters that are unsafe in file names with `_`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    unsafe_chars().replace_all(name, "_").into_owned()
}

/// Sanitizes `stems` and appends `_2`, `_3`, ... to the ones that would
/// land on a file already claimed earlier in the list.
pub fn unique_file_stems<I, S>(stems: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut taken = HashSet::new();
    stems
        .into_iter()
        .map(|stem| {
            let clean = sanitize_file_name(stem.as_ref());
            let mut name = clean.clone();
            let mut n = 1;
            while !taken.insert(name.clone()) {
                n += 1;
                name = format!("{clean}_{n}");
            }
            if n > 1 {
                warn!(
                    "'{}' collides with an earlier file name, saving it as '{}'",
                    stem.as_ref(),
                    name
                );
            }
            name
        })
        .collect()
}

/// Working directory holding the intermediate files.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root of the working directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a folder.
    #[must_use]
    pub fn dir(&self, folder: &str) -> PathBuf {
        self.root.join(folder)
    }

    /// Path of `name` inside `folder`, with the name sanitized.
    #[must_use]
    pub fn file_path(&self, folder: &str, name: &str) -> PathBuf {
        self.dir(folder).join(sanitize_file_name(name))
    }

    /// Saves `content` as pretty JSON to `<folder>/<name>.json`.
    pub fn save_json<T: Serialize + ?Sized>(
        &self,
        folder: &str,
        name: &str,
        content: &T,
    ) -> Result<PathBuf> {
        let path = self.file_path(folder, &format!("{name}.json"));
        ensure_parent(&path)?;
        std::fs::write(&path, serde_json::to_string_pretty(content)?)?;
        Ok(path)
    }

    /// Saves raw text to `<folder>/<name>`.
    pub fn save_text(&self, folder: &str, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.file_path(folder, name);
        ensure_parent(&path)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Reads `<folder>/<name>.json`.
    pub fn read_json<T: DeserializeOwned>(&self, folder: &str, name: &str) -> Result<T> {
        let path = self.file_path(folder, &format!("{name}.json"));
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Reads `<folder>/<name>` as text.
    pub fn read_text(&self, folder: &str, name: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.file_path(folder, name))?)
    }

    /// Persists the mapping to `mapping/mapping.json`.
    pub fn save_mapping(&self, entries: &BTreeMap<String, String>) -> Result<PathBuf> {
        self.save_json(MAPPING_DIR, MAPPING_FILE, entries)
    }

    /// Reads the mapping written by [`Store::save_mapping`].
    pub fn read_mapping(&self) -> Result<BTreeMap<String, String>> {
        self.read_json(MAPPING_DIR, MAPPING_FILE)
    }

    /// Lists file names in a folder, sorted. A missing folder is empty.
    pub fn list(&self, folder: &str) -> Result<Vec<String>> {
        let dir = self.dir(folder);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Removes everything inside a folder, creating it when missing.
    pub fn clear(&self, folder: &str) -> Result<()> {
        let dir = self.dir(folder);
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            return Ok(());
        }

        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Clears several folders in order.
    pub fn clear_all(&self, folders: &[&str]) -> Result<()> {
        for folder in folders {
            self.clear(folder)?;
        }
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
