//! Connection profiles.
//!
//! A profile is a plain text file with one `name = value` pair per line:
//!
//! ```text
//! client = 001
//! user = bobpage
//! passwd = secret
//! ashost = 192.168.8.4
//! sysnr = 00
//! ```
//!
//! Every pair is handed to the RFC library verbatim as a connection
//! parameter; nothing is validated here.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::*;

/// Connection parameters in the order they first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionProfile {
    parms: Vec<(String, String)>,
}

impl ConnectionProfile {
    pub fn new() -> ConnectionProfile {
        ConnectionProfile { parms: Vec::new() }
    }

    /// Read and parse a profile file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ConnectionProfile> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = ConnectionProfile::parse(&text)?;
        debug!(
            "Loaded {} connection parameters from {}",
            profile.len(),
            path.display()
        );
        Ok(profile)
    }

    /// Parse profile text. Blank and whitespace-only lines are skipped,
    /// every other line is split on its first `=`.
    pub fn parse(text: &str) -> Result<ConnectionProfile> {
        let mut profile = ConnectionProfile::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| Error::ProfileParse {
                line: i + 1,
                content: line.to_string(),
            })?;
            profile.insert(key.trim(), value.trim());
        }
        Ok(profile)
    }

    /// Set a parameter. A repeated key keeps its position and takes the new value.
    pub fn insert(&mut self, key: &str, value: &str) {
        match self.parms.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.parms.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.parms
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parms.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.parms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parms.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> std::iter::FromIterator<(K, V)> for ConnectionProfile {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut profile = ConnectionProfile::new();
        for (k, v) in iter {
            profile.insert(k.as_ref(), v.as_ref());
        }
        profile
    }
}
