use std::collections::HashMap;
use std::io;
use std::net::{AddrParseError, Ipv4Addr};
use std::path::{Path, PathBuf};

/// One configured machine.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceEntry {
    /// Lookup key, matched exactly against wake requests.
    pub key: String,
    /// Human-readable name for listings.
    pub display_name: String,
    /// Hardware address as written in the file. Parsed when a wake is
    /// attempted, so one bad address does not block the rest of the
    /// registry from loading.
    pub hardware_addr: String,
    /// Per-device broadcast address, when the device sits on a subnet
    /// the default broadcast does not reach.
    pub broadcast: Option<Ipv4Addr>,
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: expected 3 or 4 comma-separated fields, found {found}")]
    FieldCount { line: usize, found: usize },
    #[error("line {line}: empty {field} field")]
    EmptyField { line: usize, field: &'static str },
    #[error("line {line}: duplicate key {key:?}")]
    DuplicateKey { line: usize, key: String },
    #[error("line {line}: bad broadcast address {addr:?}: {source}")]
    BadBroadcast {
        line: usize,
        addr: String,
        #[source]
        source: AddrParseError,
    },
}

/// Devices loaded from a registry file. Immutable once built; reloading
/// means building a new one and swapping it in.
#[derive(Debug)]
pub struct Registry {
    entries: Vec<DeviceEntry>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn load(path: &Path) -> Result<Registry, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Registry::parse(&text)
    }

    /// Parses `key,display name,hardware address[,broadcast]` lines.
    /// Blank lines and lines starting with `#` are skipped. Any
    /// malformed line fails the whole registry, so a running service
    /// never ends up with half a file.
    pub fn parse(text: &str) -> Result<Registry, LoadError> {
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for (i, raw_line) in text.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            if fields.len() < 3 || fields.len() > 4 {
                return Err(LoadError::FieldCount {
                    line,
                    found: fields.len(),
                });
            }
            if fields[0].is_empty() {
                return Err(LoadError::EmptyField { line, field: "key" });
            }
            if fields[2].is_empty() {
                return Err(LoadError::EmptyField {
                    line,
                    field: "hardware address",
                });
            }
            let broadcast = match fields.get(3) {
                None => None,
                Some(&"") => {
                    return Err(LoadError::EmptyField {
                        line,
                        field: "broadcast",
                    })
                }
                Some(addr) => Some(addr.parse().map_err(|source| LoadError::BadBroadcast {
                    line,
                    addr: addr.to_string(),
                    source,
                })?),
            };
            let key = fields[0].to_string();
            if index.contains_key(&key) {
                return Err(LoadError::DuplicateKey { line, key });
            }
            index.insert(key.clone(), entries.len());
            entries.push(DeviceEntry {
                key,
                display_name: fields[1].to_string(),
                hardware_addr: fields[2].to_string(),
                broadcast,
            });
        }
        Ok(Registry { entries, index })
    }

    /// Exact-match lookup. The key is never trimmed, case-folded, or
    /// prefix-matched.
    pub fn lookup(&self, key: &str) -> Option<&DeviceEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
