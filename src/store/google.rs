//! Google Sheets `values` API adapter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::auth::{fetch_access_token, ServiceCredentials};
use super::SheetStore;
use crate::error::{Result, SyncError};

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Remote store backed by the Sheets v4 `values` endpoints.
///
/// One instance serves one request: the bearer token is fetched when the
/// store is built and reused for the handful of calls that follow, matching
/// the per-request credential model of the service.
pub struct GoogleSheetsStore {
    client: reqwest::Client,
    spreadsheet_id: String,
    token: String,
}

#[derive(Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: Option<UpdateSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSummary {
    #[serde(default)]
    updated_rows: usize,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GoogleSheetsStore {
    pub async fn connect(
        client: reqwest::Client,
        spreadsheet_id: String,
        creds: &ServiceCredentials,
    ) -> Result<Self> {
        let token = fetch_access_token(&client, creds).await?;
        Ok(Self {
            client,
            spreadsheet_id,
            token,
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!("{SHEETS_BASE}/{}/values/{range}", self.spreadsheet_id)
    }

    /// Surfaces the upstream's own error text so callers can debug rejected
    /// calls without access to the server logs.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = match response.json::<ApiErrorBody>().await {
            Ok(body) => body
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| format!("request failed with status {status}")),
            Err(_) => format!("request failed with status {status}"),
        };
        Err(SyncError::Upstream(detail))
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    async fn read_rows(&self, sheet: &str, first_row: u32) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(&format!("'{sheet}'!A{first_row}:AB"));
        let response = self.client.get(&url).bearer_auth(&self.token).send().await?;
        let response = Self::check(response).await?;
        let body: ValuesResponse = response.json().await?;
        debug!(sheet, rows = body.values.len(), "read sheet rows");
        Ok(body.values)
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<usize> {
        let url = format!(
            "{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.values_url(&format!("'{sheet}'!A1"))
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let body: AppendResponse = response.json().await?;
        let written = body.updates.map(|u| u.updated_rows).unwrap_or(0);
        debug!(sheet, written, "appended sheet rows");
        Ok(written)
    }

    async fn write_rows(
        &self,
        sheet: &str,
        first_row: u32,
        rows: &[Vec<String>],
    ) -> Result<usize> {
        let url = format!(
            "{}?valueInputOption=USER_ENTERED",
            self.values_url(&format!("'{sheet}'!A{first_row}"))
        );
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(rows.len())
    }

    async fn clear_rows(&self, sheet: &str, first_row: u32) -> Result<()> {
        let url = format!(
            "{}:clear",
            self.values_url(&format!("'{sheet}'!A{first_row}:AB"))
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({}))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn set_cell(&self, sheet: &str, cell: &str, value: &str) -> Result<()> {
        let url = format!(
            "{}?valueInputOption=USER_ENTERED",
            self.values_url(&format!("'{sheet}'!{cell}"))
        );
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": [[value]] }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
