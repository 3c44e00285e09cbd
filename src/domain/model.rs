use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Holds the world save; publishes chest totals as well as skills.
    Host,
    Player,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(Role::Host),
            "player" => Ok(Role::Player),
            other => Err(format!("unknown role '{}', expected 'host' or 'player'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => write!(f, "host"),
            Role::Player => write!(f, "player"),
        }
    }
}

/// One raw `(id, level, accumulator)` record from a character file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillEntry {
    pub id: i32,
    pub level: f32,
    pub accumulator: f32,
}

/// Skill name -> level, ordered by name.
pub type SkillLevels = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChestItem {
    pub name: String,
    pub stack: i32,
    pub durability: f32,
    pub equipped: bool,
    pub quality: i32,
    pub variant: i32,
    pub crafter_id: u64,
    pub crafter_name: Option<String>,
}

/// Item name -> summed stack count across every chest.
pub type ItemTotals = BTreeMap<String, i64>;

/// A tab's worth of rows, header first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header followed by the rows, in the shape the Sheets API expects.
    pub fn values(&self) -> Vec<Vec<serde_json::Value>> {
        let mut values = Vec::with_capacity(self.rows.len() + 1);
        values.push(
            self.headers
                .iter()
                .map(|h| serde_json::Value::String(h.clone()))
                .collect(),
        );
        values.extend(self.rows.iter().cloned());
        values
    }
}
