use std::fs;

use serde::Deserialize;

use crate::error::{Result, SyncError};
use crate::normalize::dates::DateRender;
use crate::reconcile::SheetLayout;

/// Service configuration, loaded from `config.toml`.
///
/// Credentials are deliberately NOT part of this file; they come from the
/// environment and are only resolved at request time.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub spreadsheet: SpreadsheetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpreadsheetConfig {
    /// The document id from the sheet URL.
    pub spreadsheet_id: String,
    /// Tab holding the expense rows.
    pub data_sheet: String,
    /// First row of the data region (1-based); row 1 is the template
    /// header.
    #[serde(default = "default_first_data_row")]
    pub first_data_row: u32,
    /// Tab holding the append-only upload log.
    pub log_sheet: String,
    /// Tab and A1 address of the "last updated" cell.
    pub last_updated_sheet: String,
    pub last_updated_cell: String,
    /// Slashed (`DD/MM/YYYY`) or compact (`DDMMYYYY`) date rendering.
    /// A deployment-wide choice; the destination sheet mixes both styles
    /// badly if this ever changes mid-flight.
    #[serde(default)]
    pub date_render: DateRender,
}

impl SpreadsheetConfig {
    pub fn layout(&self) -> SheetLayout {
        SheetLayout {
            data_sheet: self.data_sheet.clone(),
            first_data_row: self.first_data_row,
            log_sheet: self.log_sheet.clone(),
            last_updated_sheet: self.last_updated_sheet.clone(),
            last_updated_cell: self.last_updated_cell.clone(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_first_data_row() -> u32 {
    2
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Failed to read config file '{}': {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9090

            [spreadsheet]
            spreadsheet_id = "abc123"
            data_sheet = "All expense"
            first_data_row = 2
            log_sheet = "UploadLog"
            last_updated_sheet = "All expense"
            last_updated_cell = "AD1"
            date_render = "compact"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.spreadsheet.layout().data_sheet, "All expense");
        assert_eq!(config.spreadsheet.date_render, DateRender::Compact);
    }

    #[test]
    fn server_section_render_and_first_row_are_optional() {
        let config: Config = toml::from_str(
            r#"
            [spreadsheet]
            spreadsheet_id = "abc123"
            data_sheet = "All expense"
            log_sheet = "UploadLog"
            last_updated_sheet = "All expense"
            last_updated_cell = "AD1"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.spreadsheet.first_data_row, 2);
        assert_eq!(config.spreadsheet.date_render, DateRender::Slashed);
    }
}
