// Chest inventory decoding. Chests carry their contents as a base64 blob
// under `stringsByName.items`; each item record ends in a fixed 35-byte tail,
// part of which may be consumed by a crafter name.

use crate::domain::model::ChestItem;
use crate::utils::error::{Result, TrackerError};
use base64::Engine;

/// Bytes following `durability` in every item record.
const ITEM_TAIL: usize = 35;
/// `equipped` + `quality` + `variant` + `crafter_id` + `has_crafter_name`.
const ITEM_META: usize = 1 + 4 + 4 + 8 + 1;

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let bytes = &self.data[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(TrackerError::decode(format!(
                "inventory truncated reading {} at byte {} ({} bytes total)",
                what,
                self.pos,
                self.data.len()
            ))),
        }
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let bytes = self.take(N, what)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.array::<1>(what)?[0])
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    fn i32(&mut self, what: &str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array(what)?))
    }

    fn f32(&mut self, what: &str) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array(what)?))
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array(what)?))
    }

    fn short_string(&mut self, what: &str) -> Result<String> {
        let len = self.u8(what)? as usize;
        let bytes = self.take(len, what)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Skips up to `len` bytes, stopping quietly at the end of the buffer.
    fn skip(&mut self, len: usize) {
        self.pos = self.pos.saturating_add(len).min(self.data.len());
    }
}

pub fn decode_items_b64(items_b64: &str) -> Result<Vec<ChestItem>> {
    if items_b64.is_empty() {
        return Ok(Vec::new());
    }
    let raw = base64::engine::general_purpose::STANDARD.decode(items_b64)?;
    decode_items(&raw)
}

pub fn decode_items(raw: &[u8]) -> Result<Vec<ChestItem>> {
    let mut reader = ByteReader::new(raw);
    let _header = reader.u32("header")?;
    let count = reader.u32("item count")?;

    // Count comes from the file; don't let a corrupt value drive the allocation.
    let mut items = Vec::with_capacity((count as usize).min(raw.len()));
    for _ in 0..count {
        items.push(decode_item(&mut reader)?);
    }
    Ok(items)
}

fn decode_item(reader: &mut ByteReader<'_>) -> Result<ChestItem> {
    let name = reader.short_string("item name")?;
    let stack = reader.i32("stack")?;
    let durability = reader.f32("durability")?;

    let equipped = reader.u8("equipped")? != 0;
    let quality = reader.i32("quality")?;
    let variant = reader.i32("variant")?;
    let crafter_id = reader.u64("crafter id")?;

    let crafter_name = if reader.u8("crafter flag")? != 0 {
        Some(reader.short_string("crafter name")?)
    } else {
        None
    };

    // The save tool counts the crafter name in characters, not bytes.
    let mut padding = ITEM_TAIL - ITEM_META;
    if let Some(crafter) = crafter_name.as_deref().filter(|c| !c.is_empty()) {
        padding = padding.saturating_sub(1 + crafter.chars().count());
    }
    reader.skip(padding);

    Ok(ChestItem {
        name,
        stack,
        durability,
        equipped,
        quality,
        variant,
        crafter_id,
        crafter_name,
    })
}
