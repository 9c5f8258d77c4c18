use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use shared_types::TaskField;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one synchronization run.
///
/// Every section has defaults, so an empty file (or no file at all) yields
/// the stock deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub sheet: SheetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Subject phrases; a message matching ANY of them is considered
    #[serde(default = "default_subjects")]
    pub subjects: Vec<String>,

    /// Only look at unread mail, and mark what was looked at as read
    #[serde(default = "default_only_unread")]
    pub only_unread: bool,

    /// Only consider mail received after this date; `""` disables the filter
    #[serde(
        default = "default_after_date",
        deserialize_with = "deserialize_after_date"
    )]
    pub after_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Letter prefixes of task ids; each is matched followed by digits
    #[serde(default = "default_id_prefixes")]
    pub id_prefixes: Vec<String>,

    #[serde(default = "default_title_label")]
    pub title_label: String,

    #[serde(default = "default_comment_label")]
    pub comment_label: String,

    #[serde(default = "default_priority_label")]
    pub priority_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetConfig {
    #[serde(default = "default_sheet_name")]
    pub name: String,

    /// 1-based row holding the column titles
    #[serde(default = "default_header_row")]
    pub header_row: usize,

    #[serde(default)]
    pub columns: ColumnTitles,

    /// Written when the email carries no recognizable priority
    #[serde(default = "default_priority")]
    pub default_priority: String,
}

/// Exact header text of each logical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTitles {
    #[serde(default = "default_task_id_title")]
    pub task_id: String,

    #[serde(default = "default_start_date_title")]
    pub start_date: String,

    #[serde(default = "default_title_title")]
    pub title: String,

    #[serde(default = "default_comment_title")]
    pub comment: String,

    #[serde(default = "default_priority_title")]
    pub priority: String,
}

impl ColumnTitles {
    pub fn title_for(&self, field: TaskField) -> &str {
        match field {
            TaskField::TaskId => &self.task_id,
            TaskField::StartDate => &self.start_date,
            TaskField::Title => &self.title,
            TaskField::Comment => &self.comment,
            TaskField::Priority => &self.priority,
        }
    }
}

fn default_subjects() -> Vec<String> {
    vec![
        "You have been assigned".to_string(),
        "has been assigned to you".to_string(),
    ]
}

fn default_only_unread() -> bool {
    true
}

fn default_after_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2025, 4, 30)
}

/// Accepts `YYYY/MM/DD` or `YYYY-MM-DD`; blank means no date
pub fn parse_after_date(raw: &str) -> Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(raw, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map(Some)
        .map_err(|_| format!("invalid date {:?}, expected YYYY/MM/DD or YYYY-MM-DD", raw))
}

fn deserialize_after_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_after_date(&raw).map_err(serde::de::Error::custom)
}

fn default_id_prefixes() -> Vec<String> {
    vec!["INC".to_string(), "WO".to_string(), "TAS".to_string()]
}

fn default_title_label() -> String {
    "Título:".to_string()
}

fn default_comment_label() -> String {
    "Descripción detallada:".to_string()
}

fn default_priority_label() -> String {
    "Priority:".to_string()
}

fn default_sheet_name() -> String {
    "Remedy".to_string()
}

fn default_header_row() -> usize {
    1
}

fn default_priority() -> String {
    "BACKLOG".to_string()
}

fn default_task_id_title() -> String {
    "TAREA".to_string()
}

fn default_start_date_title() -> String {
    "START".to_string()
}

fn default_title_title() -> String {
    "TITULO".to_string()
}

fn default_comment_title() -> String {
    "Comentario".to_string()
}

fn default_priority_title() -> String {
    "PRIORITY".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            subjects: default_subjects(),
            only_unread: default_only_unread(),
            after_date: default_after_date(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            id_prefixes: default_id_prefixes(),
            title_label: default_title_label(),
            comment_label: default_comment_label(),
            priority_label: default_priority_label(),
        }
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            name: default_sheet_name(),
            header_row: default_header_row(),
            columns: ColumnTitles::default(),
            default_priority: default_priority(),
        }
    }
}

impl Default for ColumnTitles {
    fn default() -> Self {
        Self {
            task_id: default_task_id_title(),
            start_date: default_start_date_title(),
            title: default_title_title(),
            comment: default_comment_title(),
            priority: default_priority_title(),
        }
    }
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sheet.header_row == 0 {
            return Err(ConfigError::Invalid(
                "sheet.header_row is 1-based and must be at least 1".to_string(),
            ));
        }
        if self.sheet.name.trim().is_empty() {
            return Err(ConfigError::Invalid("sheet.name must not be empty".to_string()));
        }
        for field in TaskField::ALL {
            if self.sheet.columns.title_for(field).trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "sheet.columns.{} must not be empty",
                    field
                )));
            }
        }

        let labels = [
            ("extract.title_label", &self.extract.title_label),
            ("extract.comment_label", &self.extract.comment_label),
            ("extract.priority_label", &self.extract.priority_label),
        ];
        for (key, label) in labels {
            if label.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_deployment() {
        let config = SyncConfig::default();
        assert_eq!(
            config.search.subjects,
            vec!["You have been assigned", "has been assigned to you"]
        );
        assert!(config.search.only_unread);
        assert_eq!(config.search.after_date, NaiveDate::from_ymd_opt(2025, 4, 30));
        assert_eq!(config.extract.id_prefixes, vec!["INC", "WO", "TAS"]);
        assert_eq!(config.sheet.name, "Remedy");
        assert_eq!(config.sheet.header_row, 1);
        assert_eq!(config.sheet.columns.title_for(TaskField::Comment), "Comentario");
        assert_eq!(config.sheet.default_priority, "BACKLOG");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_example_file_spells_out_defaults() {
        let config = SyncConfig::from_toml_str(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = SyncConfig::from_toml_str(
            r#"
            [search]
            only_unread = false
            after_date = "2024-01-15"

            [extract]
            id_prefixes = ["REQ"]

            [sheet]
            name = "Tasks"
            header_row = 3

            [sheet.columns]
            task_id = "ID"
            "#,
        )
        .unwrap();

        assert!(!config.search.only_unread);
        assert_eq!(config.search.after_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(config.search.subjects.len(), 2);
        assert_eq!(config.extract.id_prefixes, vec!["REQ"]);
        assert_eq!(config.extract.title_label, "Título:");
        assert_eq!(config.sheet.name, "Tasks");
        assert_eq!(config.sheet.header_row, 3);
        assert_eq!(config.sheet.columns.task_id, "ID");
        assert_eq!(config.sheet.columns.start_date, "START");
    }

    #[test]
    fn test_after_date_formats() {
        let slashed = SyncConfig::from_toml_str("[search]\nafter_date = \"2025/04/30\"\n").unwrap();
        assert_eq!(slashed.search.after_date, NaiveDate::from_ymd_opt(2025, 4, 30));

        let disabled = SyncConfig::from_toml_str("[search]\nafter_date = \"\"\n").unwrap();
        assert_eq!(disabled.search.after_date, None);

        let err = SyncConfig::from_toml_str("[search]\nafter_date = \"30/04/2025\"\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_header_row_zero_rejected() {
        let err = SyncConfig::from_toml_str("[sheet]\nheader_row = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_blank_column_title_rejected() {
        let err = SyncConfig::from_toml_str("[sheet.columns]\npriority = \" \"\n").unwrap_err();
        assert!(err.to_string().contains("sheet.columns.priority"));
    }

    #[test]
    fn test_blank_label_rejected() {
        let err = SyncConfig::from_toml_str("[extract]\ntitle_label = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("extract.title_label"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = SyncConfig::from_toml_str("[search\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
