//! Instrument lookup table.
//!
//! The table is produced upstream as `const stockList = [...]` with one
//! `{code, name, pinyin, market}` record per listed security. It is read with
//! the same extractor and parser as the store and only ever used to resolve
//! display names.

use crate::domain::artifact::Artifact;
use crate::domain::error::PendtagError;
use crate::domain::literal;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_LOOKUP_BINDING: &str = "stockList";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Sz,
    Sh,
    Bj,
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SZ" => Ok(Market::Sz),
            "SH" => Ok(Market::Sh),
            "BJ" => Ok(Market::Bj),
            other => Err(format!("unknown market '{}'", other)),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Market::Sz => "SZ",
            Market::Sh => "SH",
            Market::Bj => "BJ",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    /// Six-digit zero-padded code.
    pub code: String,
    pub name: String,
    /// Lowercase phonetic search key.
    pub search_key: String,
    pub market: Market,
}

impl LookupEntry {
    fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value.as_object().ok_or("record is not an object")?;
        let code = match obj.get("code") {
            Some(Value::String(s)) => normalize_code(s)?,
            Some(Value::Number(n)) => normalize_code(&n.to_string())?,
            _ => return Err("missing code".to_string()),
        };
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| format!("{}: missing name", code))?
            .to_string();
        let search_key = obj
            .get("searchKey")
            .or_else(|| obj.get("pinyin"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        let market = obj
            .get("market")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("{}: missing market", code))?
            .parse::<Market>()
            .map_err(|e| format!("{}: {}", code, e))?;
        Ok(Self {
            code,
            name,
            search_key,
            market,
        })
    }
}

fn normalize_code(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > 6 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid code '{}'", raw));
    }
    Ok(format!("{:0>6}", raw))
}

#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
    by_code: HashMap<String, usize>,
}

impl LookupTable {
    /// Build from a parsed array literal, skipping records that fail validation.
    pub fn from_value(value: &Value) -> Result<Self, PendtagError> {
        let items = value.as_array().ok_or_else(|| PendtagError::StoreShape {
            reason: "lookup table is not an array".to_string(),
        })?;
        let mut table = Self::default();
        for (i, item) in items.iter().enumerate() {
            match LookupEntry::from_value(item) {
                Ok(entry) => table.push(entry),
                Err(reason) => tracing::warn!(index = i, %reason, "skipping lookup record"),
            }
        }
        Ok(table)
    }

    /// Extract and parse the table from artifact text.
    pub fn load(text: String, binding: &str) -> Result<Self, PendtagError> {
        let artifact = Artifact::locate(text, binding)?;
        Self::from_value(&literal::parse(artifact.literal())?)
    }

    fn push(&mut self, entry: LookupEntry) {
        if self.by_code.contains_key(&entry.code) {
            return;
        }
        self.by_code.insert(entry.code.clone(), self.entries.len());
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&LookupEntry> {
        self.by_code.get(code).map(|&i| &self.entries[i])
    }

    pub fn name_of(&self, code: &str) -> Option<&str> {
        self.get(code).map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }
}
