use crate::core::inventory::decode_items_b64;
use crate::domain::model::{ItemTotals, ReportTable};
use crate::utils::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use serde_json::Value;

pub const WORLD_TAB: &str = "World";
const CHEST_PREFAB_MARKER: &str = "piece_chest";

fn is_chest(zdo: &Value) -> bool {
    zdo.get("prefabName")
        .and_then(Value::as_str)
        .map(|prefab| prefab.to_lowercase().contains(CHEST_PREFAB_MARKER))
        .unwrap_or(false)
}

fn chest_items(zdo: &Value) -> Option<&str> {
    zdo.get("stringsByName")?
        .get("items")?
        .as_str()
        .filter(|s| !s.is_empty())
}

/// Sums item stacks over every chest in an exported world.
pub fn aggregate_chests(world: &Value) -> Result<ItemTotals> {
    let mut totals = ItemTotals::new();
    let zdos: &[Value] = match world.get("zdoList") {
        Some(Value::Array(zdos)) => zdos.as_slice(),
        Some(Value::Null) | None => &[],
        Some(_) => return Err(TrackerError::processing("zdoList is not an array")),
    };

    let mut chests = 0usize;
    for (index, zdo) in zdos.iter().enumerate() {
        if !is_chest(zdo) {
            continue;
        }
        chests += 1;

        let Some(items_b64) = chest_items(zdo) else {
            tracing::debug!("Chest has no inventory (zdo #{})", index);
            continue;
        };

        let items = decode_items_b64(items_b64).map_err(|e| match e {
            TrackerError::DecodeError { message } => {
                TrackerError::decode(format!("chest zdo #{}: {}", index, message))
            }
            other => other,
        })?;

        for item in items {
            *totals.entry(item.name).or_insert(0) += i64::from(item.stack);
        }
    }

    tracing::debug!("Scanned {} zdos, {} chests", zdos.len(), chests);
    Ok(totals)
}

pub fn totals_table(totals: &ItemTotals, now: DateTime<Utc>) -> ReportTable {
    let stamp = now.format("%H:%M:%S").to_string();
    let mut sorted: Vec<(&String, &i64)> = totals.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut table = ReportTable::new(WORLD_TAB, &["Item", "Total Count", "Last Updated (UTC)"]);
    table.rows = sorted
        .into_iter()
        .map(|(item, count)| {
            vec![
                Value::from(item.as_str()),
                Value::from(*count),
                Value::from(stamp.as_str()),
            ]
        })
        .collect();
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inventory::tests::{encode_inventory, ItemSpec};
    use chrono::TimeZone;
    use serde_json::json;

    fn chest(prefab: &str, items: &[ItemSpec<'_>]) -> Value {
        json!({
            "prefabName": prefab,
            "stringsByName": { "items": encode_inventory(items) }
        })
    }

    #[test]
    fn test_aggregate_sums_across_chests() {
        let world = json!({
            "zdoList": [
                chest("piece_chest_wood", &[
                    ItemSpec { name: "Wood", stack: 50, crafter: None },
                    ItemSpec { name: "Stone", stack: 20, crafter: None },
                ]),
                chest("Piece_Chest_Private", &[
                    ItemSpec { name: "Wood", stack: 25, crafter: None },
                ]),
                chest("Player_tombstone", &[
                    ItemSpec { name: "Wood", stack: 1000, crafter: None },
                ]),
                { "prefabName": "piece_chest", "stringsByName": {} },
                { "prefabName": "piece_chest" },
                { "stringsByName": { "items": "" } }
            ]
        });

        let totals = aggregate_chests(&world).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals["Wood"], 75);
        assert_eq!(totals["Stone"], 20);
    }

    #[test]
    fn test_missing_zdo_list_is_empty() {
        assert!(aggregate_chests(&json!({})).unwrap().is_empty());
        assert!(aggregate_chests(&json!({ "zdoList": null })).unwrap().is_empty());
        assert!(aggregate_chests(&json!({ "zdoList": 3 })).is_err());
    }

    #[test]
    fn test_corrupt_chest_reports_index() {
        let world = json!({
            "zdoList": [
                { "prefabName": "rock" },
                { "prefabName": "piece_chest", "stringsByName": { "items": "AAAAAAEAAAA=" } }
            ]
        });
        let err = aggregate_chests(&world).unwrap_err();
        assert!(err.to_string().contains("chest zdo #1"));
    }

    #[test]
    fn test_totals_table_ordering() {
        let mut totals = ItemTotals::new();
        totals.insert("Resin".to_string(), 10);
        totals.insert("Wood".to_string(), 75);
        totals.insert("Flint".to_string(), 10);
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

        let table = totals_table(&totals, now);
        assert_eq!(table.title, WORLD_TAB);
        let names: Vec<&str> = table.rows.iter().map(|r| r[0].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Wood", "Flint", "Resin"]);
        assert_eq!(table.rows[0][1], 75);
        assert_eq!(table.rows[0][2], "03:04:05");
    }
}
