// Skills extraction from Valheim character files (`.fch`). The format is not
// parsed; the file is scanned for the longest run of plausible
// `(id: i32, level: f32, accumulator: f32)` little-endian records.

use crate::domain::model::{ReportTable, SkillEntry, SkillLevels};
use crate::utils::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use std::borrow::Cow;

pub const ENTRY_SIZE: usize = 12;

/// Upper bound on how far a single candidate run is followed while scanning.
pub const MAX_SCAN_RUN: usize = 64;

const SKILL_NAMES: &[(i32, &str)] = &[
    (1, "Swords"),
    (2, "Knives"),
    (3, "Clubs"),
    (4, "Polearms"),
    (5, "Spears"),
    (6, "Blocking"),
    (7, "Axes"),
    (8, "Bows"),
    (9, "ElementalMagic"),
    (10, "BloodMagic"),
    (11, "Unarmed"),
    (12, "Pickaxes"),
    (13, "WoodCutting"),
    (14, "Crossbows"),
    (100, "Jump"),
    (101, "Sneak"),
    (102, "Run"),
    (103, "Swim"),
    (104, "Fishing"),
    (105, "Cooking"),
    (106, "Farming"),
    (107, "Crafting"),
    (110, "Ride"),
];

pub fn skill_name(id: i32) -> Cow<'static, str> {
    SKILL_NAMES
        .iter()
        .find(|(sid, _)| *sid == id)
        .map(|(_, name)| Cow::Borrowed(*name))
        .unwrap_or_else(|| Cow::Owned(format!("Skill_{}", id)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillsBlock {
    pub start: usize,
    pub count: usize,
}

impl SkillEntry {
    /// NaN levels fail the range check.
    pub fn is_plausible(&self) -> bool {
        self.id > 0 && self.id < 200 && (0.0..=1000.0).contains(&self.level)
    }
}

fn read_entry(data: &[u8], pos: usize) -> Option<SkillEntry> {
    let raw = data.get(pos..pos.checked_add(ENTRY_SIZE)?)?;
    Some(SkillEntry {
        id: i32::from_le_bytes(raw[0..4].try_into().ok()?),
        level: f32::from_le_bytes(raw[4..8].try_into().ok()?),
        accumulator: f32::from_le_bytes(raw[8..12].try_into().ok()?),
    })
}

fn run_length(data: &[u8], start: usize, limit: usize) -> usize {
    let mut count = 0;
    let mut pos = start;
    while count < limit {
        match read_entry(data, pos) {
            Some(entry) if entry.is_plausible() => {
                count += 1;
                pos += ENTRY_SIZE;
            }
            _ => break,
        }
    }
    count
}

/// Finds the start of the longest plausible run; the earliest start wins ties.
pub fn find_skills_block(data: &[u8]) -> Option<SkillsBlock> {
    let mut best: Option<SkillsBlock> = None;

    for start in 0..data.len().saturating_sub(ENTRY_SIZE) {
        let count = run_length(data, start, MAX_SCAN_RUN);
        if count > best.map_or(0, |b| b.count) {
            best = Some(SkillsBlock { start, count });
        }
    }

    best
}

/// Reads every entry of the located block. Unlike the scan this is not capped.
pub fn read_skill_entries(data: &[u8], block: SkillsBlock) -> Vec<SkillEntry> {
    let mut entries = Vec::new();
    let mut pos = block.start;
    while let Some(entry) = read_entry(data, pos) {
        if !entry.is_plausible() {
            break;
        }
        entries.push(entry);
        pos += ENTRY_SIZE;
    }
    entries
}

pub fn decode_skills(data: &[u8]) -> Result<SkillLevels> {
    let block = find_skills_block(data)
        .ok_or_else(|| TrackerError::processing("Could not locate skills block"))?;

    tracing::debug!(
        "Skills block at offset {} ({} entries in scan window)",
        block.start,
        block.count
    );

    let skills = read_skill_entries(data, block)
        .into_iter()
        .map(|entry| (skill_name(entry.id).into_owned(), round2(entry.level)))
        .collect();

    Ok(skills)
}

/// Two decimals, ties to even on the exact binary value (`0.125` -> `0.12`).
fn round2(level: f32) -> f64 {
    let level = f64::from(level);
    format!("{:.2}", level).parse().unwrap_or(level)
}

pub fn skills_table(title: &str, skills: &SkillLevels, now: DateTime<Utc>) -> ReportTable {
    let stamp = now.format("%H:%M:%S").to_string();
    let mut table = ReportTable::new(title, &["Skill", "Level", "Last Updated (UTC)"]);
    table.rows = skills
        .iter()
        .map(|(skill, level)| {
            vec![
                serde_json::Value::from(skill.as_str()),
                serde_json::Value::from(*level),
                serde_json::Value::from(stamp.as_str()),
            ]
        })
        .collect();
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: i32, level: f32, acc: f32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ENTRY_SIZE);
        bytes.extend_from_slice(&id.to_le_bytes());
        bytes.extend_from_slice(&level.to_le_bytes());
        bytes.extend_from_slice(&acc.to_le_bytes());
        bytes
    }

    /// Bytes that never form a plausible entry at any alignment.
    fn noise(len: usize) -> Vec<u8> {
        vec![0xFF; len]
    }

    #[test]
    fn test_skill_name_lookup() {
        assert_eq!(skill_name(1), "Swords");
        assert_eq!(skill_name(110), "Ride");
        assert_eq!(skill_name(42), "Skill_42");
    }

    #[test]
    fn test_plausibility_bounds() {
        let ok = SkillEntry { id: 199, level: 1000.0, accumulator: 0.0 };
        assert!(ok.is_plausible());
        assert!(!SkillEntry { id: 0, level: 1.0, accumulator: 0.0 }.is_plausible());
        assert!(!SkillEntry { id: 200, level: 1.0, accumulator: 0.0 }.is_plausible());
        assert!(!SkillEntry { id: 5, level: -0.5, accumulator: 0.0 }.is_plausible());
        assert!(!SkillEntry { id: 5, level: f32::NAN, accumulator: 0.0 }.is_plausible());
    }

    #[test]
    fn test_decode_skills_from_embedded_block() {
        let mut data = noise(7);
        data.extend(entry(1, 12.345, 0.5));
        data.extend(entry(13, 40.0, 1.0));
        data.extend(entry(102, 7.999, 0.0));
        data.extend(noise(9));

        let skills = decode_skills(&data).unwrap();
        assert_eq!(skills.len(), 3);
        assert_eq!(skills["Swords"], 12.35);
        assert_eq!(skills["WoodCutting"], 40.0);
        assert_eq!(skills["Run"], 8.0);
    }

    #[test]
    fn test_longest_run_wins() {
        let mut data = noise(4);
        data.extend(entry(1, 1.0, 0.0));
        data.extend(noise(5));
        let long_start = data.len();
        data.extend(entry(2, 2.0, 0.0));
        data.extend(entry(3, 3.0, 0.0));
        data.extend(noise(5));

        let block = find_skills_block(&data).unwrap();
        assert_eq!(block, SkillsBlock { start: long_start, count: 2 });
    }

    #[test]
    fn test_tie_keeps_earliest_start() {
        let mut data = noise(3);
        data.extend(entry(1, 1.0, 0.0));
        data.extend(noise(5));
        data.extend(entry(2, 2.0, 0.0));
        data.extend(noise(13));

        let block = find_skills_block(&data).unwrap();
        assert_eq!(block.start, 3);
        assert_eq!(block.count, 1);
    }

    #[test]
    fn test_decode_reads_past_scan_cap() {
        let mut data = Vec::new();
        for i in 0..70 {
            data.extend(entry(1 + (i % 150), 1.0, 0.0));
        }
        data.extend(noise(16));

        let block = find_skills_block(&data).unwrap();
        assert_eq!(block.count, MAX_SCAN_RUN);
        assert_eq!(read_skill_entries(&data, block).len(), 70);
    }

    #[test]
    fn test_duplicate_ids_keep_last_level() {
        let mut data = entry(8, 10.0, 0.0);
        data.extend(entry(8, 20.0, 0.0));
        data.extend(noise(13));

        let skills = decode_skills(&data).unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills["Bows"], 20.0);
    }

    #[test]
    fn test_levels_round_ties_to_even() {
        let mut data = noise(5);
        data.extend(entry(1, 0.125, 0.0));
        data.extend(entry(2, 1.125, 0.0));
        data.extend(entry(3, 0.625, 0.0));
        data.extend(noise(5));

        let skills = decode_skills(&data).unwrap();
        assert_eq!(skills["Swords"], 0.12);
        assert_eq!(skills["Knives"], 1.12);
        assert_eq!(skills["Clubs"], 0.62);
        assert_eq!(round2(12.345), 12.35);
        assert_eq!(round2(30.0), 30.0);
    }

    #[test]
    fn test_no_block_is_an_error() {
        let err = decode_skills(&noise(64)).unwrap_err();
        assert_eq!(err.to_string(), "Data processing error: Could not locate skills block");
        assert!(find_skills_block(&entry(1, 1.0, 0.0)).is_none());
        assert!(find_skills_block(&[]).is_none());
    }

    #[test]
    fn test_skills_table_sorted_by_name() {
        let mut skills = SkillLevels::new();
        skills.insert("Swords".to_string(), 3.0);
        skills.insert("Axes".to_string(), 1.5);
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 18, 4, 5).unwrap();

        let table = skills_table("Ragnar", &skills, now);
        assert_eq!(table.title, "Ragnar");
        assert_eq!(table.headers, vec!["Skill", "Level", "Last Updated (UTC)"]);
        assert_eq!(table.rows[0][0], "Axes");
        assert_eq!(table.rows[0][1], 1.5);
        assert_eq!(table.rows[1][2], "18:04:05");
    }
}
