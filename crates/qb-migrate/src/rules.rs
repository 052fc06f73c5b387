//! Custom text rules generated from the target app's fields.
//!
//! Templates live in `placeholders/`. In every template `[ABCDName]` becomes
//! the bracketed field label and `ABCDVarName` the label without spaces.

use tracing::info;

use crate::api::{Field, QuickbaseClient};
use crate::config::MigrationOptions;
use crate::error::{Error, Result};
use crate::fanout::fan_out;
use crate::store::{unique_file_stems, Store, PLACEHOLDERS_DIR, RULES_DIR};

/// Header written once per rule file.
pub const HEADER_TEMPLATE: &str = "custom_text_header.txt";
/// Rule written per text field.
pub const TEXT_TEMPLATE: &str = "custom_text.txt";
/// Rule written per file attachment field.
pub const FILE_TEMPLATE: &str = "custom_file.txt";

const NAME_PLACEHOLDER: &str = "[ABCDName]";
const VAR_PLACEHOLDER: &str = "ABCDVarName";

/// The three rule templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTemplates {
    /// File header.
    pub header: String,
    /// Text field rule.
    pub text: String,
    /// File field rule.
    pub file: String,
}

impl RuleTemplates {
    /// Reads the templates from `placeholders/`.
    pub fn load(store: &Store) -> Result<Self> {
        let read = |name: &str| {
            store.read_text(PLACEHOLDERS_DIR, name).map_err(|e| {
                Error::Config(format!(
                    "cannot read template {}: {}",
                    store.file_path(PLACEHOLDERS_DIR, name).display(),
                    e
                ))
            })
        };

        Ok(Self {
            header: read(HEADER_TEMPLATE)?,
            text: read(TEXT_TEMPLATE)?,
            file: read(FILE_TEMPLATE)?,
        })
    }

    /// Renders the rule file of one table, or `None` when it has neither
    /// text nor file fields.
    #[must_use]
    pub fn render(&self, fields: &[Field]) -> Option<String> {
        let text_fields: Vec<&Field> = fields.iter().filter(|f| f.is_plain_text()).collect();
        let file_fields: Vec<&Field> = fields.iter().filter(|f| f.is_file()).collect();
        if text_fields.is_empty() && file_fields.is_empty() {
            return None;
        }

        let mut out = String::new();
        if !text_fields.is_empty() {
            out.push_str(&self.header);
            out.push_str("\n\n");

            let mut vars = String::new();
            for field in &text_fields {
                out.push_str(&fill(&self.text, &field.label));
                out.push_str("\n\n");
                vars.push_str(&format!("${}, ", var_name(&field.label)));
            }
            out.push_str(&vars);
            out.push_str("\n\n");
        }

        for field in &file_fields {
            out.push_str(&fill(&self.file, &field.label));
            out.push_str("\n\n");
        }

        Some(out)
    }
}

fn var_name(label: &str) -> String {
    label.replace(' ', "")
}

fn fill(template: &str, label: &str) -> String {
    template
        .replace(NAME_PLACEHOLDER, &format!("[{label}]"))
        .replace(VAR_PLACEHOLDER, &var_name(label))
}

/// Writes `rules/<tableName>.txt` for every target table with text or file
/// fields. Names that clash once sanitized get a numeric suffix. Returns the
/// number of rule files written.
pub async fn generate_rules(
    target: &QuickbaseClient,
    store: &Store,
    options: &MigrationOptions,
) -> Result<usize> {
    info!("Processing custom text rules...");

    let templates = RuleTemplates::load(store)?;
    store.clear(RULES_DIR)?;

    let tables = target.get_tables().await?.tables;
    let files = unique_file_stems(tables.iter().map(|table| &table.name));
    let templates = &templates;

    let jobs = tables.iter().zip(files);
    let written = fan_out(jobs, options.concurrency, move |(table, file)| async move {
        let fields = target.get_fields(&table.id).await?;
        let Some(content) = templates.render(&fields) else {
            return Ok(false);
        };

        info!("Writing rules for table {}", table.name);
        store.save_text(RULES_DIR, &format!("{file}.txt"), &content)?;
        Ok(true)
    })
    .await?;

    Ok(written.into_iter().filter(|w| *w).count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn field(label: &str, field_type: &str) -> Field {
        Field {
            label: label.to_string(),
            field_type: field_type.to_string(),
            ..Default::default()
        }
    }

    fn templates() -> RuleTemplates {
        RuleTemplates {
            header: "HEADER".to_string(),
            text: "rule [ABCDName] -> $ABCDVarName".to_string(),
            file: "file [ABCDName] -> $ABCDVarName".to_string(),
        }
    }

    #[test]
    fn test_render_text_and_file_fields() {
        let fields = vec![
            field("First Name", "text"),
            field("Notes", "text-multi-line"),
            field("Amount", "numeric"),
            field("Signed Contract", "file"),
        ];

        let out = templates().render(&fields).unwrap();

        assert_eq!(
            out,
            "HEADER\n\n\
             rule [First Name] -> $FirstName\n\n\
             rule [Notes] -> $Notes\n\n\
             $FirstName, $Notes, \n\n\
             file [Signed Contract] -> $SignedContract\n\n"
        );
    }

    #[test]
    fn test_render_file_fields_only_has_no_header() {
        let out = templates().render(&[field("Photo", "file")]).unwrap();
        assert_eq!(out, "file [Photo] -> $Photo\n\n");
    }

    #[test]
    fn test_render_skips_tables_without_rules() {
        let mut derived = field("Full Name", "text");
        derived.mode = "formula".to_string();
        assert!(templates().render(&[derived, field("Qty", "numeric")]).is_none());
    }

    #[test]
    fn test_load_missing_template_is_config_error() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        assert!(matches!(RuleTemplates::load(&store), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_generate_rules_writes_one_file_per_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tables"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "bq2aaa", "name": "Customers"},
                {"id": "bq2bbb", "name": "Totals"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/fields"))
            .and(query_param("tableId", "bq2aaa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 6, "label": "Company", "fieldType": "text"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/fields"))
            .and(query_param("tableId", "bq2bbb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 6, "label": "Sum", "fieldType": "numeric"}
            ])))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        store.save_text(PLACEHOLDERS_DIR, HEADER_TEMPLATE, "H").unwrap();
        store.save_text(PLACEHOLDERS_DIR, TEXT_TEMPLATE, "T [ABCDName]").unwrap();
        store.save_text(PLACEHOLDERS_DIR, FILE_TEMPLATE, "F [ABCDName]").unwrap();
        store.save_text(RULES_DIR, "Stale.txt", "old").unwrap();

        let options = MigrationOptions {
            api_url: format!("{}/v1", server.uri()),
            ..Default::default()
        };
        let app = AppConfig {
            id: "bq2".to_string(),
            token: "tok".to_string(),
            realm: "b.quickbase.com".to_string(),
        };
        let target = QuickbaseClient::new(app, &options).unwrap();

        let written = generate_rules(&target, &store, &options).await.unwrap();

        assert_eq!(written, 1);
        assert_eq!(store.list(RULES_DIR).unwrap(), vec!["Customers.txt"]);
        assert_eq!(
            store.read_text(RULES_DIR, "Customers.txt").unwrap(),
            "H\n\nT [Company]\n\n$Company, \n\n"
        );
    }

    #[tokio::test]
    async fn test_generate_rules_keeps_clashing_table_names_apart() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tables"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "bq2aaa", "name": "Buy/Sell"},
                {"id": "bq2bbb", "name": "Buy?Sell"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/fields"))
            .and(query_param("tableId", "bq2aaa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 6, "label": "Buyer", "fieldType": "text"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/fields"))
            .and(query_param("tableId", "bq2bbb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 6, "label": "Seller", "fieldType": "text"}
            ])))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        store.save_text(PLACEHOLDERS_DIR, HEADER_TEMPLATE, "H").unwrap();
        store.save_text(PLACEHOLDERS_DIR, TEXT_TEMPLATE, "T [ABCDName]").unwrap();
        store.save_text(PLACEHOLDERS_DIR, FILE_TEMPLATE, "F [ABCDName]").unwrap();

        let options = MigrationOptions {
            api_url: format!("{}/v1", server.uri()),
            ..Default::default()
        };
        let app = AppConfig {
            id: "bq2".to_string(),
            token: "tok".to_string(),
            realm: "b.quickbase.com".to_string(),
        };
        let target = QuickbaseClient::new(app, &options).unwrap();

        let written = generate_rules(&target, &store, &options).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            store.list(RULES_DIR).unwrap(),
            vec!["Buy_Sell.txt", "Buy_Sell_2.txt"]
        );
        assert!(store
            .read_text(RULES_DIR, "Buy_Sell.txt")
            .unwrap()
            .contains("[Buyer]"));
        assert!(store
            .read_text(RULES_DIR, "Buy_Sell_2.txt")
            .unwrap()
            .contains("[Seller]"));
    }
}
