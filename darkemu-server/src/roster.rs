//! Server roster.
//!
//! The catalog of game servers advertised by the connect server. Records
//! come from a JSON document; each one is validated on its own so a bad
//! record costs only itself.

use darkemu_core::{DEFAULT_LIST_TAG, ServerListEntry, ServerListResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for roster loading.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The roster file could not be read.
    #[error("failed to read roster {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON.
    #[error("roster is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is JSON but not a list of records.
    #[error("invalid roster document: {message}")]
    InvalidDocument {
        /// Error message.
        message: String,
    },

    /// No record survived validation.
    #[error("roster has no valid entries ({skipped} skipped)")]
    Empty {
        /// Records rejected.
        skipped: usize,
    },
}

/// One advertised game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Server code. Not required to be unique.
    pub code: u16,
    /// Display name.
    pub name: String,
    /// Dotted IPv4 address.
    pub ip: String,
    /// Game-server port.
    pub port: u16,
    /// Load indicator.
    #[serde(default)]
    pub load: u8,
    /// List-type tag byte.
    #[serde(default = "default_tag")]
    pub tag: u8,
    /// Whether the server is advertised in the list.
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_tag() -> u8 {
    DEFAULT_LIST_TAG
}

fn default_visible() -> bool {
    true
}

impl RosterEntry {
    /// Creates a visible entry with default load and tag.
    pub fn new(code: u16, name: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            code,
            name: name.into(),
            ip: ip.into(),
            port,
            load: 0,
            tag: DEFAULT_LIST_TAG,
            visible: true,
        }
    }

    /// Sets the load indicator.
    #[must_use]
    pub fn with_load(mut self, load: u8) -> Self {
        self.load = load;
        self
    }

    /// Sets the list-type tag.
    #[must_use]
    pub fn with_tag(mut self, tag: u8) -> Self {
        self.tag = tag;
        self
    }

    /// Sets visibility.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    fn list_entry(&self) -> ServerListEntry {
        ServerListEntry::new(self.code, self.load, self.tag)
    }
}

/// A record rejected during [`ServerRoster::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position in the source document.
    pub index: usize,
    /// Why it was rejected.
    pub reason: String,
}

/// Outcome of a successful load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Entries now in the roster.
    pub loaded: usize,
    /// Records that were rejected.
    pub skipped: Vec<SkippedRecord>,
}

/// In-memory catalog of game servers.
#[derive(Debug, Clone, Default)]
pub struct ServerRoster {
    entries: Vec<RosterEntry>,
}

impl ServerRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a roster from ready-made entries.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = RosterEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: RosterEntry) {
        self.entries.push(entry);
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the roster has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns all entries in load order.
    #[must_use]
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Returns the number of entries advertised in the list.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.entries.iter().filter(|e| e.visible).count()
    }

    /// Finds the first entry with `code`, visible or not.
    #[must_use]
    pub fn find_by_code(&self, code: u16) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    /// Replaces the roster with the valid records in `records`.
    ///
    /// Invalid records are logged and reported, not fatal.
    ///
    /// # Errors
    /// Returns [`RosterError::Empty`] if no record is valid; the previous
    /// entries are kept in that case.
    pub fn load(&mut self, records: &[Value]) -> Result<LoadReport, RosterError> {
        let mut entries = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match parse_record(record) {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    tracing::warn!(index, %reason, "skipping roster record");
                    skipped.push(SkippedRecord { index, reason });
                }
            }
        }

        if entries.is_empty() {
            return Err(RosterError::Empty {
                skipped: skipped.len(),
            });
        }

        self.entries = entries;
        tracing::debug!(
            loaded = self.entries.len(),
            skipped = skipped.len(),
            "roster loaded"
        );
        Ok(LoadReport {
            loaded: self.entries.len(),
            skipped,
        })
    }

    /// Loads from JSON text: either an array of records or an object with
    /// a `servers` array.
    ///
    /// # Errors
    /// Returns an error if the text is not such a document, or see
    /// [`ServerRoster::load`].
    pub fn load_json_str(&mut self, text: &str) -> Result<LoadReport, RosterError> {
        let document: Value = serde_json::from_str(text)?;
        let records = match &document {
            Value::Array(records) => records,
            Value::Object(map) => match map.get("servers") {
                Some(Value::Array(records)) => records,
                Some(_) => {
                    return Err(RosterError::InvalidDocument {
                        message: "`servers` is not an array".to_string(),
                    });
                }
                None => {
                    return Err(RosterError::InvalidDocument {
                        message: "object has no `servers` array".to_string(),
                    });
                }
            },
            _ => {
                return Err(RosterError::InvalidDocument {
                    message: "expected an array of server records".to_string(),
                });
            }
        };
        self.load(records)
    }

    /// Loads from a JSON file.
    ///
    /// # Errors
    /// Returns [`RosterError::Io`] if the file cannot be read, or see
    /// [`ServerRoster::load_json_str`].
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, RosterError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RosterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_json_str(&text)
    }

    /// Encodes the server-list response for the visible entries.
    ///
    /// A roster too large for one frame is truncated with a warning.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut entries: Vec<ServerListEntry> = self
            .entries
            .iter()
            .filter(|e| e.visible)
            .map(RosterEntry::list_entry)
            .collect();

        if entries.len() > ServerListResponse::MAX_ENTRIES {
            tracing::warn!(
                visible = entries.len(),
                max = ServerListResponse::MAX_ENTRIES,
                "server list truncated"
            );
            entries.truncate(ServerListResponse::MAX_ENTRIES);
        }

        ServerListResponse { entries }
            .encode()
            .expect("server list truncated to MAX_ENTRIES")
    }
}

fn parse_record(record: &Value) -> Result<RosterEntry, String> {
    let entry = RosterEntry::deserialize(record).map_err(|e| e.to_string())?;
    if entry.ip.parse::<Ipv4Addr>().is_err() {
        return Err(format!("`{}` is not an IPv4 address", entry.ip));
    }
    Ok(entry)
}
