//! Authenticated SharePoint session.

use serde_json::Value;
use std::fmt;

use crate::error::{DashError, DashResult};

/// An authenticated handle to one SharePoint site and list.
///
/// Lives only in process memory: dropped on logout or exit, never persisted.
pub struct Session {
    site_url: String,
    list_name: String,
    access_token: String,
    http: reqwest::Client,
}

impl Session {
    pub fn new(
        site_url: impl Into<String>,
        list_name: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Session {
            site_url: trim_trailing_slash(site_url.into()),
            list_name: list_name.into(),
            access_token: access_token.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn list_name(&self) -> &str {
        &self.list_name
    }

    async fn get_json(&self, url: &str) -> DashResult<Value> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json;odata=nometadata")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DashError::RemoteFetch(format!(
                "{url} returned {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Lightweight check that the token actually grants site access.
    /// Returns the site title for the status message.
    pub async fn probe(&self) -> DashResult<String> {
        let url = format!("{}/_api/web?$select=Title", self.site_url);
        let body = self.get_json(&url).await?;

        Ok(body
            .get("Title")
            .and_then(Value::as_str)
            .unwrap_or("SharePoint")
            .to_string())
    }

    /// Fetch every item of the configured list as raw JSON objects.
    pub async fn list_items(&self) -> DashResult<Vec<Value>> {
        let url = format!(
            "{}/_api/web/lists/GetByTitle('{}')/items",
            self.site_url, self.list_name
        );
        let body = self.get_json(&url).await?;

        match body.get("value").and_then(Value::as_array) {
            Some(items) => Ok(items.clone()),
            None => Err(DashError::RemoteFetch(
                "list response had no item collection".to_string(),
            )),
        }
    }
}

// The bearer token must never end up in logs or panic messages.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("site_url", &self.site_url)
            .field("list_name", &self.list_name)
            .field("access_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn trim_trailing_slash(mut s: String) -> String {
    while s.ends_with('/') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_url_is_normalized_without_trailing_slash() {
        let session = Session::new("https://contoso.sharepoint.com/sites/Team/", "Cal", "tok");
        assert_eq!(session.site_url(), "https://contoso.sharepoint.com/sites/Team");
    }

    #[test]
    fn debug_output_redacts_the_access_token() {
        let session = Session::new(
            "https://contoso.sharepoint.com/sites/Team",
            "Cal",
            "secret-token",
        );

        let dump = format!("{session:?}");
        assert!(dump.contains("contoso.sharepoint.com"));
        assert!(!dump.contains("secret-token"));
    }
}
