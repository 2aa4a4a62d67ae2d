//! `PositionBook`: UNFIXED snapshot of both position maps for one account
//! (spec §3.3), sent on sync-reset so a CP engine can reconcile the Book
//! against what the broker actually reports.

use std::collections::HashMap;

use crate::journal::FixedBytes;

use super::control::{ACCOUNT_LEN, INSTITUTION_LEN};
use super::fixed_str::FixedStr;
use super::trading::Position;

#[derive(Debug, Clone)]
pub struct PositionBook {
    pub institution: FixedStr<INSTITUTION_LEN>,
    pub account: FixedStr<ACCOUNT_LEN>,
    pub long: HashMap<u32, Position>,
    pub short: HashMap<u32, Position>,
}

fn push_str<const N: usize>(out: &mut Vec<u8>, s: &FixedStr<N>) {
    let bytes = s.as_str().as_bytes();
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn read_str<const N: usize>(buf: &[u8], cursor: &mut usize) -> FixedStr<N> {
    let len = u32::from_le_bytes(buf[*cursor..*cursor + 4].try_into().unwrap()) as usize;
    *cursor += 4;
    let s = std::str::from_utf8(&buf[*cursor..*cursor + len]).unwrap_or_default();
    let out = FixedStr::new(s);
    *cursor += len;
    out
}

fn push_map(out: &mut Vec<u8>, map: &HashMap<u32, Position>) {
    out.extend_from_slice(&(map.len() as u32).to_le_bytes());
    for (key, position) in map {
        out.extend_from_slice(&key.to_le_bytes());
        out.extend_from_slice(position.as_bytes());
    }
}

fn read_map(buf: &[u8], cursor: &mut usize) -> HashMap<u32, Position> {
    let count = u32::from_le_bytes(buf[*cursor..*cursor + 4].try_into().unwrap()) as usize;
    *cursor += 4;
    let mut map = HashMap::with_capacity(count);
    let position_size = std::mem::size_of::<Position>();
    for _ in 0..count {
        let key = u32::from_le_bytes(buf[*cursor..*cursor + 4].try_into().unwrap());
        *cursor += 4;
        let position = Position::from_bytes(&buf[*cursor..*cursor + position_size]);
        *cursor += position_size;
        map.insert(key, position);
    }
    map
}

impl PositionBook {
    /// Serialize to the compact byte string a `Writer` publishes (spec §3.3).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_str(&mut out, &self.institution);
        push_str(&mut out, &self.account);
        push_map(&mut out, &self.long);
        push_map(&mut out, &self.short);
        out
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut cursor = 0;
        let institution = read_str(buf, &mut cursor);
        let account = read_str(buf, &mut cursor);
        let long = read_map(buf, &mut cursor);
        let short = read_map(buf, &mut cursor);
        Self {
            institution,
            account,
            long,
            short,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::market::{Direction, InstrumentKey};

    #[test]
    fn encode_decode_round_trips_both_maps() {
        let mut long = HashMap::new();
        long.insert(
            7,
            Position {
                instrument: InstrumentKey::new("CME", "ESZ4"),
                direction: Direction::Long,
                volume: 10,
                cost_price: 100.0,
                unrealized_pnl: 0.0,
                update_time: 1,
                trading_day: 20260101,
            },
        );
        let book = PositionBook {
            institution: FixedStr::new("X"),
            account: FixedStr::new("Y"),
            long,
            short: HashMap::new(),
        };
        let bytes = book.encode();
        let back = PositionBook::decode(&bytes);
        assert_eq!(back.institution.as_str(), "X");
        assert_eq!(back.long.len(), 1);
        assert_eq!(back.long[&7].volume, 10);
        assert!(back.short.is_empty());
    }
}
