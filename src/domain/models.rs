use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::convert::TryFrom;
use std::fmt;

use super::{FetchError, Result};

pub const VMESS_PREFIX: &str = "vmess://";
pub const DEFAULT_PORT: u16 = 80;

/// One candidate proxy endpoint decoded from a `vmess://` link.
///
/// The decoded JSON object is kept verbatim in `record`; the typed fields are
/// a read-only view over it (`ps`, `add`, `port`, `type`, `id`, `net`, `path`,
/// `host`, `tls`). Serialising a descriptor, and [`NodeDescriptor::to_link`],
/// emit the record exactly as it was decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor {
    name: Option<String>,
    address: String,
    port: u16,
    transport: String,
    id: String,
    network: String,
    path: Option<String>,
    host_header: Option<String>,
    tls: Option<String>,
    record: Map<String, Value>,
}

impl NodeDescriptor {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        let address = address.into();
        let mut record = Map::new();
        record.insert("add".into(), Value::String(address.clone()));
        record.insert("port".into(), Value::from(port));

        Self {
            name: None,
            address,
            port,
            transport: String::new(),
            id: String::new(),
            network: String::new(),
            path: None,
            host_header: None,
            tls: None,
            record,
        }
    }

    /// Build a descriptor from a decoded vmess JSON object.
    ///
    /// Fails when `add` is missing or blank, or when a known field holds an
    /// array or object.
    pub fn from_record(record: Map<String, Value>) -> Result<Self> {
        let address = string_field(&record, "add")?
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| FetchError::Decode("node record has no address".into()))?;

        Ok(Self {
            name: string_field(&record, "ps")?,
            address,
            port: record.get("port").map(parse_port).unwrap_or(DEFAULT_PORT),
            transport: string_field(&record, "type")?.unwrap_or_default(),
            id: string_field(&record, "id")?.unwrap_or_default(),
            network: string_field(&record, "net")?.unwrap_or_default(),
            path: string_field(&record, "path")?,
            host_header: string_field(&record, "host")?,
            tls: string_field(&record, "tls")?,
            record,
        })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with_field("ps", Value::String(name.into()))
    }

    /// Set a record field and refresh the typed view.
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        let previous = self.record.insert(key.to_string(), value);
        match Self::from_record(self.record.clone()) {
            Ok(updated) => updated,
            Err(_) => {
                match previous {
                    Some(v) => self.record.insert(key.to_string(), v),
                    None => self.record.remove(key),
                };
                self
            }
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("N/A")
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn transport(&self) -> &str {
        &self.transport
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn host_header(&self) -> Option<&str> {
        self.host_header.as_deref()
    }

    pub fn tls(&self) -> Option<&str> {
        self.tls.as_deref()
    }

    /// The decoded JSON object, including fields with no typed accessor.
    pub fn record(&self) -> &Map<String, Value> {
        &self.record
    }

    /// Re-encode the descriptor as a `vmess://` link.
    pub fn to_link(&self) -> Result<String> {
        let json = serde_json::to_vec(&self.record).map_err(|e| FetchError::Encode(e.to_string()))?;
        Ok(format!(
            "{}{}",
            VMESS_PREFIX,
            base64::prelude::BASE64_STANDARD.encode(json)
        ))
    }
}

impl Serialize for NodeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let record = Map::deserialize(deserializer)?;
        NodeDescriptor::from_record(record).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{}", self.display_name(), self.address, self.port)?;
        if !self.network.is_empty() {
            write!(f, " {}", self.network)?;
        }
        match self.tls.as_deref() {
            Some(tls) if !tls.is_empty() => write!(f, "/{})", tls),
            _ => write!(f, ")"),
        }
    }
}

/// Result of a single reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
    /// The probe task itself failed (panic, cancellation). Counts as unreachable.
    Faulted(String),
}

impl From<bool> for ProbeOutcome {
    fn from(reachable: bool) -> Self {
        if reachable {
            ProbeOutcome::Reachable
        } else {
            ProbeOutcome::Unreachable
        }
    }
}

// Numbers and booleans are stringified, null reads as absent.
fn string_field(record: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(FetchError::Decode(format!("field {} is not a string: {}", key, other))),
    }
}

// Out of range or unparsable ports fall back to DEFAULT_PORT.
fn parse_port(value: &Value) -> u16 {
    let port = match value {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    port.filter(|p| *p != 0).unwrap_or(DEFAULT_PORT)
}
