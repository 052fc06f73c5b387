//! Old → new identifier mapping between the source and target apps.

use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use crate::api::{AppTables, QuickbaseClient, Table};
use crate::config::AppConfig;
use crate::error::Result;
use crate::rewrite::{Rewriter, Rewritten};
use crate::store::{Store, TABLES_DIR};

/// Mapping of source identifiers, token and realm to their target values.
#[derive(Debug, Clone)]
pub struct Mapping {
    entries: BTreeMap<String, String>,
    rewriter: Rewriter,
}

impl Mapping {
    /// Wraps raw entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the keys cannot be compiled for substitution.
    pub fn new(entries: BTreeMap<String, String>) -> Result<Self> {
        let rewriter = Rewriter::new(&entries)?;
        Ok(Self { entries, rewriter })
    }

    /// Raw entries in key order.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Target value for a source key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `text` references any source key.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.rewriter.matches(text)
    }

    /// Rewrites every source key in `text` to its target value.
    #[must_use]
    pub fn rewrite(&self, text: &str) -> Rewritten {
        self.rewriter.rewrite(text)
    }

    /// Source tables that have a counterpart in the target app.
    pub fn mapped_tables<'a>(&self, tables: &'a [Table]) -> Vec<&'a Table> {
        tables
            .iter()
            .filter(|table| self.entries.contains_key(&table.id))
            .collect()
    }
}

/// Joins source and target tables on their exact name.
///
/// A name that appears more than once on either side cannot be paired
/// unambiguously and is skipped, so the table part of the result is a
/// bijection. App ID, user token and realm are added as well. Empty keys and
/// pairs that map a value onto itself are dropped.
pub fn build_entries(
    source: &AppTables,
    target: &AppTables,
    source_app: &AppConfig,
    target_app: &AppConfig,
) -> BTreeMap<String, String> {
    let source_names = count_names(&source.tables);
    let target_names = count_names(&target.tables);
    let mut entries = BTreeMap::new();

    for source_table in &source.tables {
        let name = source_table.name.as_str();
        let Some(target_table) = target.tables.iter().find(|t| t.name == name) else {
            continue;
        };

        if source_names[name] > 1 || target_names[name] > 1 {
            warn!("Skipping table '{}': name is not unique", name);
            continue;
        }

        insert_pair(&mut entries, &source_table.id, &target_table.id);
    }

    insert_pair(&mut entries, &source.app_id, &target.app_id);
    insert_pair(&mut entries, &source_app.token, &target_app.token);
    insert_pair(&mut entries, &source_app.realm, &target_app.realm);

    entries
}

fn count_names(tables: &[Table]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for table in tables {
        *counts.entry(table.name.as_str()).or_insert(0) += 1;
    }
    counts
}

fn insert_pair(entries: &mut BTreeMap<String, String>, from: &str, to: &str) {
    if from.is_empty() || from == to {
        return;
    }
    entries.insert(from.to_string(), to.to_string());
}

/// Fetches both table lists, persists them and writes the mapping.
pub async fn create_mapping(
    source: &QuickbaseClient,
    target: &QuickbaseClient,
    store: &Store,
) -> Result<Mapping> {
    info!("Creating mapping...");

    let (source_tables, target_tables) =
        futures::try_join!(source.get_tables(), target.get_tables())?;

    store.save_json(TABLES_DIR, &source_tables.app_id, &source_tables.tables)?;
    store.save_json(TABLES_DIR, &target_tables.app_id, &target_tables.tables)?;

    let mapping = Mapping::new(build_entries(
        &source_tables,
        &target_tables,
        source.app(),
        target.app(),
    ))?;
    store.save_mapping(mapping.entries())?;

    if mapping.is_empty() {
        warn!("Mapping is empty: no table names, IDs or credentials differ");
    }
    info!("Mapping saved ({} entries)", mapping.len());
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(id: &str, name: &str) -> Table {
        Table {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn app(id: &str, token: &str, realm: &str) -> AppConfig {
        AppConfig {
            id: id.to_string(),
            token: token.to_string(),
            realm: realm.to_string(),
        }
    }

    fn tables(app_id: &str, tables: Vec<Table>) -> AppTables {
        AppTables {
            app_id: app_id.to_string(),
            tables,
        }
    }

    #[test]
    fn test_build_entries_joins_on_name() {
        let source = tables(
            "bq1",
            vec![table("bq1aaa", "Projects"), table("bq1bbb", "Tasks"), table("bq1ccc", "Old")],
        );
        let target = tables(
            "bq2",
            vec![table("bq2yyy", "Tasks"), table("bq2xxx", "Projects"), table("bq2zzz", "New")],
        );

        let entries = build_entries(
            &source,
            &target,
            &app("bq1", "tok-a", "a.quickbase.com"),
            &app("bq2", "tok-b", "b.quickbase.com"),
        );

        assert_eq!(entries.get("bq1aaa").map(String::as_str), Some("bq2xxx"));
        assert_eq!(entries.get("bq1bbb").map(String::as_str), Some("bq2yyy"));
        assert!(!entries.contains_key("bq1ccc"));
        assert_eq!(entries.get("bq1").map(String::as_str), Some("bq2"));
        assert_eq!(entries.get("tok-a").map(String::as_str), Some("tok-b"));
        assert_eq!(
            entries.get("a.quickbase.com").map(String::as_str),
            Some("b.quickbase.com")
        );
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn test_build_entries_name_match_is_exact() {
        let source = tables("bq1", vec![table("bq1aaa", "Projects")]);
        let target = tables("bq2", vec![table("bq2xxx", "projects"), table("bq2yyy", "Projects ")]);

        let entries = build_entries(&source, &target, &AppConfig::default(), &AppConfig::default());

        assert!(!entries.contains_key("bq1aaa"));
    }

    #[test]
    fn test_build_entries_skips_ambiguous_names() {
        let source = tables("bq1", vec![table("bq1aaa", "Tasks"), table("bq1bbb", "Notes")]);
        let target = tables(
            "bq2",
            vec![table("bq2xxx", "Tasks"), table("bq2yyy", "Tasks"), table("bq2zzz", "Notes")],
        );

        let entries = build_entries(&source, &target, &AppConfig::default(), &AppConfig::default());

        assert!(!entries.contains_key("bq1aaa"));
        assert_eq!(entries.get("bq1bbb").map(String::as_str), Some("bq2zzz"));
    }

    #[test]
    fn test_table_pairs_form_a_bijection() {
        let source = tables(
            "bq1",
            (0..20).map(|i| table(&format!("bq1t{i}"), &format!("T{}", i % 15))).collect(),
        );
        let target = tables(
            "bq2",
            (0..20).map(|i| table(&format!("bq2t{i}"), &format!("T{}", i % 12))).collect(),
        );

        let entries = build_entries(&source, &target, &AppConfig::default(), &AppConfig::default());
        let table_pairs: Vec<_> = entries.iter().filter(|(k, _)| k.starts_with("bq1t")).collect();

        let mut values: Vec<_> = table_pairs.iter().map(|(_, v)| v.as_str()).collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), table_pairs.len());
        // Names T0..T4 repeat in source, T0..T7 in target; T8..T11 are unique on both sides.
        assert_eq!(table_pairs.len(), 4);
    }

    #[test]
    fn test_build_entries_drops_empty_and_identity_pairs() {
        let source = tables("bq1", vec![]);
        let target = tables("bq2", vec![]);

        let entries = build_entries(
            &source,
            &target,
            &app("bq1", "", "same.quickbase.com"),
            &app("bq2", "tok-b", "same.quickbase.com"),
        );

        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get("bq1").map(String::as_str), Some("bq2"));
    }

    #[test]
    fn test_mapping_rewrite_and_lookup() {
        let entries = BTreeMap::from([
            ("bq1aaa".to_string(), "bq2xxx".to_string()),
            ("bq1".to_string(), "bq2".to_string()),
        ]);
        let mapping = Mapping::new(entries).unwrap();

        assert_eq!(mapping.get("bq1aaa"), Some("bq2xxx"));
        assert!(mapping.matches("dbid=bq1"));
        assert_eq!(mapping.rewrite("bq1/bq1aaa").text, "bq2/bq2xxx");

        let all = vec![table("bq1aaa", "Projects"), table("bq1zzz", "Unmapped")];
        let mapped = mapping.mapped_tables(&all);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].id, "bq1aaa");
    }

    async fn mount_tables(server: &wiremock::MockServer, app_id: &str, body: serde_json::Value) {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, ResponseTemplate};

        Mock::given(method("GET"))
            .and(path("/v1/tables"))
            .and(query_param("appId", app_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn client(server: &wiremock::MockServer, app: AppConfig) -> QuickbaseClient {
        let options = crate::config::MigrationOptions {
            api_url: format!("{}/v1", server.uri()),
            legacy_url: Some(server.uri()),
            ..Default::default()
        };
        QuickbaseClient::new(app, &options).unwrap()
    }

    #[tokio::test]
    async fn test_create_mapping_saves_entries() {
        let server = wiremock::MockServer::start().await;
        mount_tables(&server, "bq1", serde_json::json!([{"id": "bq1aaa", "name": "Projects"}])).await;
        mount_tables(&server, "bq2", serde_json::json!([{"id": "bq2xxx", "name": "Projects"}])).await;
        let dir = tempfile::TempDir::new().unwrap();
        let store = Store::new(dir.path());

        let mapping = create_mapping(
            &client(&server, app("bq1", "tok-a", "a.quickbase.com")),
            &client(&server, app("bq2", "tok-b", "a.quickbase.com")),
            &store,
        )
        .await
        .unwrap();

        assert_eq!(mapping.len(), 3);
        assert!(!mapping.is_empty());
        assert_eq!(&store.read_mapping().unwrap(), mapping.entries());
        assert_eq!(mapping.get("bq1aaa"), Some("bq2xxx"));
    }

    #[tokio::test]
    async fn test_create_mapping_same_app_is_empty() {
        let server = wiremock::MockServer::start().await;
        mount_tables(&server, "bq1", serde_json::json!([{"id": "bq1aaa", "name": "Projects"}])).await;
        let dir = tempfile::TempDir::new().unwrap();
        let store = Store::new(dir.path());
        let same = app("bq1", "tok-a", "a.quickbase.com");

        let mapping = create_mapping(&client(&server, same.clone()), &client(&server, same), &store)
            .await
            .unwrap();

        assert!(mapping.is_empty());
        assert_eq!(mapping.len(), 0);
        assert!(store.read_mapping().unwrap().is_empty());
    }
}
