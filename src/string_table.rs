use crate::fast_hash_map::FastHashMap;

/// The deduplicated string table of the binary format: nul-terminated
/// strings, back to back, with the empty string pinned at offset 0.
///
/// Offsets are relative to the start of the table. Function records store
/// them in their `name` and `suffix` fields.
#[derive(Debug)]
pub(crate) struct StringTable {
    bytes: Vec<u8>,
    index: FastHashMap<String, u32>,
}

impl StringTable {
    pub fn new() -> Self {
        let mut table = StringTable {
            bytes: vec![0],
            index: FastHashMap::default(),
        };
        table.index.insert(String::new(), 0);
        table
    }

    /// The offset of `s`, appending it if this is the first time it is seen.
    pub fn offset_for(&mut self, s: &str) -> u32 {
        if let Some(&offset) = self.index.get(s) {
            return offset;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        self.index.insert(s.to_string(), offset);
        offset
    }

    /// Unpadded byte size of the table.
    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
