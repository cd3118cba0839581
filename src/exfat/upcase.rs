/// Up-case table as stored in the cluster heap, decompressed.
///
/// The on-disk form may compress identity runs as `0xFFFF, <count>`; code points
/// beyond the end of the table map to themselves.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct UpcaseTable(Vec<u16>);

const MAX_ENTRIES: usize = 0x10000;

impl UpcaseTable {
    pub fn decode(units: &[u16]) -> Self {
        let mut table = Vec::with_capacity(units.len());
        let mut iter = units.iter().copied();
        while let Some(unit) = iter.next() {
            if table.len() >= MAX_ENTRIES {
                break;
            }
            if unit != 0xFFFF {
                table.push(unit);
                continue;
            }
            let count = match iter.next() {
                Some(count) => count as usize,
                None => break,
            };
            let start = table.len();
            let end = (start + count).min(MAX_ENTRIES);
            table.extend((start..end).map(|ch| ch as u16));
        }
        Self(table)
    }

    pub fn lookup(&self, ch: u16) -> u16 {
        self.0.get(ch as usize).copied().unwrap_or(ch)
    }

    pub fn to_upper(&self, name: &str) -> Vec<u16> {
        name.encode_utf16().map(|ch| self.lookup(ch)).collect()
    }
}

impl Default for UpcaseTable {
    fn default() -> Self {
        let table = (0..128u16).map(|ch| if (0x61..=0x7A).contains(&ch) { ch - 0x20 } else { ch });
        Self(table.collect())
    }
}
