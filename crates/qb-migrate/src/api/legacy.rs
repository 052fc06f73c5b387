//! Payloads of the legacy XML API.
//!
//! Requests are `<qdbapi>` documents POSTed to `/db/<dbid>` with the action
//! named in the `QUICKBASE-ACTION` header. Every response carries an
//! `errcode`/`errtext` pair; `errcode` 0 means success.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `API_GetDBPage`.
pub const ACTION_GET_PAGE: &str = "API_GetDBPage";
/// `API_AddReplaceDBPage`.
pub const ACTION_REPLACE_PAGE: &str = "API_AddReplaceDBPage";
/// `API_SetFieldProperties`.
pub const ACTION_SET_FIELD_PROPERTIES: &str = "API_SetFieldProperties";

/// Page type for code pages (as opposed to exact forms).
const CODE_PAGE_TYPE: &str = "1";

/// Access to the status pair every legacy response carries.
pub trait LegacyResponse {
    /// `errcode` as sent by the server.
    fn error_code(&self) -> &str;
    /// `errtext` as sent by the server.
    fn error_text(&self) -> &str;

    /// Converts a non-zero `errcode` into [`Error::Api`].
    fn check(&self, action: &str) -> Result<()> {
        let code = self.error_code().trim();
        if code == "0" {
            return Ok(());
        }
        Err(Error::Api {
            action: action.to_string(),
            code: code.to_string(),
            text: self.error_text().to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "qdbapi")]
pub(crate) struct GetPageRequest<'a> {
    pub usertoken: &'a str,
    #[serde(rename = "pageID")]
    pub page_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename = "qdbapi")]
pub(crate) struct ReplacePageRequest<'a> {
    pub usertoken: &'a str,
    pub pagetype: &'a str,
    #[serde(rename = "pageID")]
    pub page_id: &'a str,
    pub pagebody: &'a str,
}

impl<'a> ReplacePageRequest<'a> {
    pub(crate) fn code_page(usertoken: &'a str, page_id: &'a str, pagebody: &'a str) -> Self {
        Self {
            usertoken,
            pagetype: CODE_PAGE_TYPE,
            page_id,
            pagebody,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "qdbapi")]
pub(crate) struct SetFieldPropertiesRequest<'a> {
    pub fid: &'a str,
    pub formula: &'a str,
    pub usertoken: &'a str,
}

/// Response of `API_GetDBPage`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetPageResponse {
    /// Error code (`0` on success).
    pub errcode: String,
    /// Error text.
    pub errtext: String,
    /// Page content.
    pub pagebody: String,
}

/// Response of `API_AddReplaceDBPage`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReplacePageResponse {
    /// Echoed action name.
    pub action: String,
    /// Error code (`0` on success).
    pub errcode: String,
    /// Error text.
    pub errtext: String,
    /// ID of the replaced (or created) page.
    #[serde(rename = "pageID")]
    pub page_id: String,
}

/// Response of `API_SetFieldProperties`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SetFieldPropertiesResponse {
    /// Updated field ID.
    pub fid: String,
    /// Updated field name.
    pub fname: String,
    /// Error code (`0` on success).
    pub errcode: String,
    /// Error text.
    pub errtext: String,
}

macro_rules! impl_legacy_response {
    ($($ty:ty),*) => {
        $(
            impl LegacyResponse for $ty {
                fn error_code(&self) -> &str {
                    &self.errcode
                }

                fn error_text(&self) -> &str {
                    &self.errtext
                }
            }
        )*
    };
}

impl_legacy_response!(GetPageResponse, ReplacePageResponse, SetFieldPropertiesResponse);
