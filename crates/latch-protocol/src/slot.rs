//! Slot identifiers and the passphrase wordlist codec
//!
//! A slot is a decimal integer the rendezvous server hands out on first
//! connect. The out-of-band passphrase is that slot number plus two random
//! bytes (to stop a bystander from guessing a live slot and racing the real
//! joiner), encoded word-per-byte over a 256-entry list so it types cleanly
//! over voice or chat.

use crate::error::{ProtocolError, Result};

/// A rendezvous slot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub u64);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SlotId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<u64>()
            .map(SlotId)
            .map_err(|_| ProtocolError::ProtocolViolation(format!("invalid slot id: {s}")))
    }
}

/// 256-entry wordlist; index `i` is transmitted as exactly one byte, `i`.
const WORDS: [&str; 256] = [
    "bab", "bac", "bad", "baf", "bag", "bak", "bal", "bam", "ban", "bap", "bar", "bas", "bat",
    "bav", "baz", "beb", "bec", "bed", "bef", "beg", "bek", "bel", "bem", "ben", "bep", "ber",
    "bes", "bet", "bev", "bez", "bib", "bic", "bid", "bif", "big", "bik", "bil", "bim", "bin",
    "bip", "bir", "bis", "bit", "biv", "biz", "bob", "boc", "bod", "bof", "bog", "bok", "bol",
    "bom", "bon", "bop", "bor", "bos", "bot", "bov", "boz", "bub", "buc", "bud", "buf", "bug",
    "buk", "bul", "bum", "bun", "bup", "bur", "bus", "but", "buv", "buz", "cab", "cac", "cad",
    "caf", "cag", "cak", "cal", "cam", "can", "cap", "car", "cas", "cat", "cav", "caz", "ceb",
    "cec", "ced", "cef", "ceg", "cek", "cel", "cem", "cen", "cep", "cer", "ces", "cet", "cev",
    "cez", "cib", "cic", "cid", "cif", "cig", "cik", "cil", "cim", "cin", "cip", "cir", "cis",
    "cit", "civ", "ciz", "cob", "coc", "cod", "cof", "cog", "cok", "col", "com", "con", "cop",
    "cor", "cos", "cot", "cov", "coz", "cub", "cuc", "cud", "cuf", "cug", "cuk", "cul", "cum",
    "cun", "cup", "cur", "cus", "cut", "cuv", "cuz", "dab", "dac", "dad", "daf", "dag", "dak",
    "dal", "dam", "dan", "dap", "dar", "das", "dat", "dav", "daz", "deb", "dec", "ded", "def",
    "deg", "dek", "del", "dem", "den", "dep", "der", "des", "det", "dev", "dez", "dib", "dic",
    "did", "dif", "dig", "dik", "dil", "dim", "din", "dip", "dir", "dis", "dit", "div", "diz",
    "dob", "doc", "dod", "dof", "dog", "dok", "dol", "dom", "don", "dop", "dor", "dos", "dot",
    "dov", "doz", "dub", "duc", "dud", "duf", "dug", "duk", "dul", "dum", "dun", "dup", "dur",
    "dus", "dut", "duv", "duz", "fab", "fac", "fad", "faf", "fag", "fak", "fal", "fam", "fan",
    "fap", "far", "fas", "fat", "fav", "faz", "feb", "fec", "fed", "fef", "feg", "fek", "fel",
    "fem", "fen", "fep", "fer", "fes", "fet", "fev", "fez", "fib",
];

fn word_index(word: &str) -> Option<u8> {
    WORDS.iter().position(|w| *w == word).map(|i| i as u8)
}

/// Encode `random_bytes` (length 2) followed by the slot id's minimal
/// big-endian byte string into a hyphen-separated word phrase.
///
/// The random prefix means a slot's existence and number don't by
/// themselves let a bystander construct a valid passphrase.
pub fn encode(slot: SlotId, random_bytes: [u8; 2]) -> String {
    let mut bytes = random_bytes.to_vec();
    bytes.extend_from_slice(&slot_to_minimal_be_bytes(slot.0));

    bytes
        .iter()
        .map(|b| WORDS[*b as usize])
        .collect::<Vec<_>>()
        .join("-")
}

/// Decode a passphrase produced by [`encode`] back into its random prefix
/// and slot id.
pub fn decode(phrase: &str) -> Result<(SlotId, [u8; 2])> {
    let bytes: Vec<u8> = phrase
        .split('-')
        .map(|w| {
            word_index(w)
                .ok_or_else(|| ProtocolError::ProtocolViolation(format!("unknown word: {w}")))
        })
        .collect::<Result<_>>()?;

    if bytes.len() < 3 {
        return Err(ProtocolError::ProtocolViolation(
            "passphrase too short".into(),
        ));
    }

    let random_bytes = [bytes[0], bytes[1]];
    let slot = minimal_be_bytes_to_slot(&bytes[2..]);
    Ok((SlotId(slot), random_bytes))
}

fn slot_to_minimal_be_bytes(slot: u64) -> Vec<u8> {
    if slot == 0 {
        return vec![0];
    }
    let full = slot.to_be_bytes();
    let first_nonzero = full.iter().position(|b| *b != 0).unwrap();
    full[first_nonzero..].to_vec()
}

fn minimal_be_bytes_to_slot(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wordlist_has_256_unique_entries() {
        let mut sorted = WORDS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 256);
    }

    #[test]
    fn encode_decode_roundtrip() {
        for slot in [0u64, 1, 42, 255, 256, 65535, 1_000_000] {
            let random = [0x12, 0x34];
            let phrase = encode(SlotId(slot), random);
            let (decoded_slot, decoded_random) = decode(&phrase).unwrap();
            assert_eq!(decoded_slot, SlotId(slot));
            assert_eq!(decoded_random, random);
        }
    }

    #[test]
    fn decode_rejects_unknown_word() {
        assert!(decode("bab-bac-notaword").is_err());
    }

    #[test]
    fn decode_rejects_too_short() {
        assert!(decode("bab").is_err());
    }

    #[test]
    fn different_slots_encode_to_different_phrases() {
        let a = encode(SlotId(1), [0, 0]);
        let b = encode(SlotId(2), [0, 0]);
        assert_ne!(a, b);
    }
}
