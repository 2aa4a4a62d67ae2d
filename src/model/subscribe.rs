//! `MDSubscribe`: UNFIXED subscription request, a request id plus a list of
//! instrument keys (spec §3.3).

use crate::journal::FixedBytes;

use super::market::InstrumentKey;

#[derive(Debug, Clone)]
pub struct MdSubscribe {
    pub id: u32,
    pub instruments: Vec<InstrumentKey>,
}

impl MdSubscribe {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.instruments.len() * std::mem::size_of::<InstrumentKey>());
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&(self.instruments.len() as u32).to_le_bytes());
        for key in &self.instruments {
            out.extend_from_slice(key.as_bytes());
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Self {
        let id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let count = u32::from_le_bytes(buf[4..8].try_into().unwrap()) as usize;
        let key_size = std::mem::size_of::<InstrumentKey>();
        let mut instruments = Vec::with_capacity(count);
        let mut cursor = 8;
        for _ in 0..count {
            instruments.push(InstrumentKey::from_bytes(&buf[cursor..cursor + key_size]));
            cursor += key_size;
        }
        Self { id, instruments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_preserves_instrument_order() {
        let sub = MdSubscribe {
            id: 42,
            instruments: vec![InstrumentKey::new("CME", "ESZ4"), InstrumentKey::new("CBOT", "ZNZ4")],
        };
        let bytes = sub.encode();
        let back = MdSubscribe::decode(&bytes);
        assert_eq!(back.id, 42);
        assert_eq!(back.instruments.len(), 2);
        assert_eq!(back.instruments[1].instrument_id.as_str(), "ZNZ4");
    }
}
