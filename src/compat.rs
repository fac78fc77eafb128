//! # compat
//!
//! Some CHIP-8 titles were written against interpreters that behaved
//! differently from the COSMAC VIP. Rather than guess, we recognise those
//! titles by an Adler-32 checksum of the raw program image and switch on
//! exactly the quirks recorded for them. Unknown images run with every quirk
//! off.
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;
use thiserror::Error;

const MOD_ADLER: u32 = 65521;

/// Adler-32 over the raw image bytes
pub fn adler32(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;
    for &byte in data {
        a = (a + byte as u32) % MOD_ADLER;
        b = (b + a) % MOD_ADLER;
    }
    (b << 16) | a
}

/// per-title behaviour switches
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Quirks {
    /// sprites wrap around the screen edges instead of being clipped
    pub wrap_sprites: bool,
    /// FX55/FX65 leave the index register where it was
    pub keep_index_on_transfer: bool,
}

/// one entry in the compatibility database
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct KnownTitle {
    pub title: String,
    pub checksum: u32,
    #[serde(default)]
    pub quirks: Quirks,
}

#[derive(Debug, Error)]
pub enum CompatError {
    #[error("can't read quirks file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed quirks file: {0}")]
    Parse(#[from] serde_json::Error),
}

// TODO: seed with checksums of stock title images once they've been verified
//       against known-good dumps; until then titles come from a quirks file
const BUILTIN_TITLES: &[(&str, u32, Quirks)] = &[];

/// exact-match lookup from image checksum to title
#[derive(Clone, Debug, Default)]
pub struct CompatDb {
    titles: HashMap<u32, KnownTitle>,
}

impl CompatDb {
    /// the titles compiled into the interpreter
    pub fn builtin() -> Self {
        let mut db = CompatDb::default();
        for &(title, checksum, quirks) in BUILTIN_TITLES {
            db.insert(KnownTitle {
                title: title.to_string(),
                checksum,
                quirks,
            });
        }
        db
    }

    /// read a JSON array of titles, e.g.
    /// `[{"title": "BLINKY", "checksum": 123456, "quirks": {"wrap_sprites": true}}]`
    pub fn from_json(reader: impl io::Read) -> Result<Self, CompatError> {
        let titles: Vec<KnownTitle> = serde_json::from_reader(reader)?;
        let mut db = CompatDb::default();
        db.extend(titles);
        Ok(db)
    }

    /// builtin titles plus whatever is in the file at `path`
    pub fn builtin_with_file(path: impl AsRef<Path>) -> Result<Self, CompatError> {
        let mut db = CompatDb::builtin();
        let extra = CompatDb::from_json(io::BufReader::new(File::open(path)?))?;
        db.extend(extra.titles.into_values());
        Ok(db)
    }

    /// add (or replace) a title
    pub fn insert(&mut self, title: KnownTitle) {
        debug!("compat: {} => {:08x} {:?}", title.title, title.checksum, title.quirks);
        self.titles.insert(title.checksum, title);
    }

    pub fn lookup(&self, checksum: u32) -> Option<&KnownTitle> {
        self.titles.get(&checksum)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl Extend<KnownTitle> for CompatDb {
    fn extend<T: IntoIterator<Item = KnownTitle>>(&mut self, iter: T) {
        for title in iter {
            self.insert(title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adler32_known_vectors() {
        assert_eq!(adler32(&[]), 1);
        assert_eq!(adler32(b"Wikipedia"), 0x11e6_0398);
    }

    #[test]
    fn test_adler32_high_bytes_are_unsigned() {
        // a = 1 + 0xff, b = a
        assert_eq!(adler32(&[0xff]), (0x100 << 16) | 0x100);
    }

    #[test]
    fn test_adler32_wraps_modulo() {
        let data = vec![0xffu8; 5552];
        let a = (1 + 0xff * 5552u64) % MOD_ADLER as u64;
        let b = (1..=5552u64)
            .map(|i| (1 + 0xff * i) % MOD_ADLER as u64)
            .sum::<u64>()
            % MOD_ADLER as u64;
        assert_eq!(adler32(&data), ((b as u32) << 16) | a as u32);
    }

    #[test]
    fn test_lookup_exact_match_only() {
        let mut db = CompatDb::default();
        db.insert(KnownTitle {
            title: "WIKI".into(),
            checksum: adler32(b"Wikipedia"),
            quirks: Quirks {
                wrap_sprites: true,
                keep_index_on_transfer: false,
            },
        });
        assert_eq!(db.lookup(0x11e6_0398).map(|t| t.title.as_str()), Some("WIKI"));
        assert!(db.lookup(0x11e6_0399).is_none());
    }

    #[test]
    fn test_from_json() -> Result<(), CompatError> {
        let json = r#"[
            {"title": "A", "checksum": 1, "quirks": {"wrap_sprites": true}},
            {"title": "B", "checksum": 2, "quirks": {"keep_index_on_transfer": true}},
            {"title": "C", "checksum": 3}
        ]"#;
        let db = CompatDb::from_json(json.as_bytes())?;
        assert_eq!(db.len(), 3);
        assert_eq!(
            db.lookup(1).map(|t| t.quirks),
            Some(Quirks {
                wrap_sprites: true,
                keep_index_on_transfer: false
            })
        );
        assert_eq!(
            db.lookup(2).map(|t| t.quirks),
            Some(Quirks {
                wrap_sprites: false,
                keep_index_on_transfer: true
            })
        );
        assert_eq!(db.lookup(3).map(|t| t.quirks), Some(Quirks::default()));
        Ok(())
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            CompatDb::from_json(&b"{not json"[..]),
            Err(CompatError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CompatDb::builtin_with_file("/definitely/not/here.json"),
            Err(CompatError::Io(_))
        ));
    }
}
