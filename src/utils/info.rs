//! INFO reply parsing

use std::collections::HashMap;

/// Fields of one INFO reply, keyed by field name
#[derive(Debug, Clone, Default)]
pub struct InfoSection {
    fields: HashMap<String, String>,
}

impl InfoSection {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse an INFO reply into its `key:value` fields
///
/// Section headers (`# Server`) and blank lines are skipped. Values keep
/// everything after the first colon, so `executable:/usr/bin/x:y` survives.
pub fn parse_info(text: &str) -> InfoSection {
    let fields = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    InfoSection { fields }
}
