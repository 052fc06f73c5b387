//! Client for the platform's REST and legacy XML APIs.
//!
//! One [`QuickbaseClient`] talks to one app. REST calls authenticate with
//! the `QB-Realm-Hostname` and `Authorization: QB-USER-TOKEN` headers; legacy
//! calls carry the user token inside the XML body.

pub mod http;
pub mod legacy;
pub mod types;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::{AppConfig, MigrationOptions};
use crate::error::Result;
use crate::retry::{with_retry, RetryPolicy};

use self::http::{check_status, create_http_client, validate_url};
use self::legacy::{
    GetPageRequest, GetPageResponse, LegacyResponse, ReplacePageRequest, ReplacePageResponse,
    SetFieldPropertiesRequest, SetFieldPropertiesResponse, ACTION_GET_PAGE, ACTION_REPLACE_PAGE,
    ACTION_SET_FIELD_PROPERTIES,
};
pub use self::types::{App, AppTables, Field, FieldProperties, Table};

const REALM_HEADER: &str = "QB-Realm-Hostname";
const ACTION_HEADER: &str = "QUICKBASE-ACTION";

/// Client bound to one app's credentials.
#[derive(Debug, Clone)]
pub struct QuickbaseClient {
    app: AppConfig,
    client: Client,
    api_url: String,
    legacy_url: String,
    retry: RetryPolicy,
}

impl QuickbaseClient {
    /// Creates a client for `app` using the base URLs and limits in `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if a base URL is malformed.
    pub fn new(app: AppConfig, options: &MigrationOptions) -> Result<Self> {
        let api_url = options.api_url.trim_end_matches('/').to_string();
        let legacy_url = options
            .legacy_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", app.realm))
            .trim_end_matches('/')
            .to_string();

        validate_url(&api_url)?;
        validate_url(&legacy_url)?;

        Ok(Self {
            app,
            client: create_http_client(Duration::from_secs(options.timeout_secs)),
            api_url,
            legacy_url,
            retry: RetryPolicy::new(options.max_retries),
        })
    }

    /// Credentials this client uses.
    #[must_use]
    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Fetches the app's metadata.
    pub async fn get_app(&self) -> Result<App> {
        let url = format!("{}/apps/{}", self.api_url, self.app.id);
        self.get_json(&url, &[], "get app").await
    }

    /// Lists the app's tables.
    pub async fn get_tables(&self) -> Result<AppTables> {
        let url = format!("{}/tables", self.api_url);
        let tables = self
            .get_json(&url, &[("appId", self.app.id.as_str())], "get tables")
            .await?;
        Ok(AppTables {
            app_id: self.app.id.clone(),
            tables,
        })
    }

    /// Lists the fields of a table.
    pub async fn get_fields(&self, table_id: &str) -> Result<Vec<Field>> {
        let url = format!("{}/fields", self.api_url);
        self.get_json(&url, &[("tableId", table_id)], "get fields")
            .await
    }

    /// Sets `maxLength` on a text field.
    pub async fn update_field_length(
        &self,
        table_id: &str,
        field_id: u64,
        max_length: u32,
    ) -> Result<Field> {
        let url = format!("{}/fields/{}", self.api_url, field_id);
        let body = serde_json::json!({ "properties": { "maxLength": max_length } });
        let (this, url, body) = (self, url.as_str(), &body);

        with_retry(&self.retry, "update field length", move || async move {
            let response = this
                .rest(this.client.post(url))
                .query(&[("tableId", table_id)])
                .json(body)
                .send()
                .await?;
            let response = check_status(response, "update field length").await?;
            Ok(response.json().await?)
        })
        .await
    }

    /// Fetches a code page's body.
    pub async fn get_page(&self, page_id: &str) -> Result<GetPageResponse> {
        let body = GetPageRequest {
            usertoken: &self.app.token,
            page_id,
        };
        self.legacy(&self.app.id, ACTION_GET_PAGE, &body).await
    }

    /// Replaces (or creates) a code page.
    pub async fn replace_page(&self, page_id: &str, page_body: &str) -> Result<ReplacePageResponse> {
        let body = ReplacePageRequest::code_page(&self.app.token, page_id, page_body);
        self.legacy(&self.app.id, ACTION_REPLACE_PAGE, &body).await
    }

    /// Replaces a field's formula.
    pub async fn update_field(
        &self,
        table_id: &str,
        field_id: u64,
        formula: &str,
    ) -> Result<SetFieldPropertiesResponse> {
        let fid = field_id.to_string();
        let body = SetFieldPropertiesRequest {
            fid: &fid,
            formula,
            usertoken: &self.app.token,
        };
        self.legacy(table_id, ACTION_SET_FIELD_PROPERTIES, &body)
            .await
    }

    fn rest(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(REALM_HEADER, &self.app.realm)
            .header("Authorization", format!("QB-USER-TOKEN {}", self.app.token))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        operation: &str,
    ) -> Result<T> {
        debug!("GET {} {:?}", url, query);
        let this = self;

        with_retry(&self.retry, operation, move || async move {
            let response = this.rest(this.client.get(url)).query(query).send().await?;
            let response = check_status(response, operation).await?;
            Ok(response.json().await?)
        })
        .await
    }

    async fn legacy<B, R>(&self, dbid: &str, action: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned + LegacyResponse,
    {
        let url = format!("{}/db/{}", self.legacy_url, dbid);
        let xml = quick_xml::se::to_string(body)?;
        debug!("POST {} {}", url, action);
        let (this, url, xml) = (self, url.as_str(), xml.as_str());

        let response: R = with_retry(&self.retry, action, move || async move {
            let response = this
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/xml")
                .header(ACTION_HEADER, action)
                .body(xml.to_owned())
                .send()
                .await?;
            let text = check_status(response, action).await?.text().await?;
            Ok(quick_xml::de::from_str(&text)?)
        })
        .await?;

        response.check(action)?;
        Ok(response)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
