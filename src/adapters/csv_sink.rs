use crate::core::{ReportSink, ReportTable, Storage};
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use serde_json::Value;

/// Writes each tab to `<title>.csv`, overwriting the previous snapshot.
pub struct CsvSink<S: Storage> {
    storage: S,
    display_root: String,
}

impl<S: Storage> CsvSink<S> {
    pub fn new(storage: S, display_root: impl Into<String>) -> Self {
        Self {
            storage,
            display_root: display_root.into(),
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Tab titles come from player names; keep them filesystem-safe.
pub fn file_name_for(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' { c } else { '_' })
        .collect();
    format!("{}.csv", cleaned.trim())
}

pub fn render_csv(table: &ReportTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(cell_text))?;
    }
    writer
        .into_inner()
        .map_err(|e| TrackerError::processing(format!("CSV flush failed: {}", e)))
}

#[async_trait]
impl<S: Storage> ReportSink for CsvSink<S> {
    async fn publish(&self, table: &ReportTable) -> Result<String> {
        let file_name = file_name_for(&table.title);
        let data = render_csv(table)?;
        self.storage.write_file(&file_name, &data).await?;
        Ok(format!("{}/{}", self.display_root.trim_end_matches('/'), file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use tempfile::TempDir;

    fn sample() -> ReportTable {
        let mut table = ReportTable::new("World", &["Item", "Total Count", "Last Updated (UTC)"]);
        table.rows.push(vec!["Wood".into(), 75.into(), "10:00:00".into()]);
        table.rows.push(vec!["Bronze, nails".into(), 3.into(), "10:00:00".into()]);
        table
    }

    #[test]
    fn test_render_csv_quotes_commas() {
        let text = String::from_utf8(render_csv(&sample()).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Item,Total Count,Last Updated (UTC)");
        assert_eq!(lines[1], "Wood,75,10:00:00");
        assert_eq!(lines[2], "\"Bronze, nails\",3,10:00:00");
    }

    #[test]
    fn test_file_name_sanitised() {
        assert_eq!(file_name_for("World"), "World.csv");
        assert_eq!(file_name_for("../Ragnar"), "___Ragnar.csv");
    }

    #[tokio::test]
    async fn test_publish_overwrites_snapshot() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(LocalStorage::new(dir.path()), "out");

        let location = sink.publish(&sample()).await.unwrap();
        assert_eq!(location, "out/World.csv");

        let mut smaller = sample();
        smaller.rows.truncate(1);
        sink.publish(&smaller).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("World.csv")).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
