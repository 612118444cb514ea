//! Shift-code reference table.
//!
//! The table is immutable reference data supplied from outside the engine.
//! It is loaded from a JSON array of shift codes and looked up by code,
//! category, or length label.

use crate::types::*;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

impl ShiftCodeTable {
    /// Build a table from a list of codes
    ///
    /// Duplicate codes are rejected rather than silently overwritten.
    pub fn from_codes(codes: Vec<ShiftCode>) -> Result<Self> {
        let mut map = HashMap::with_capacity(codes.len());
        for code in codes {
            let key = code.code.trim().to_string();
            if map.contains_key(&key) {
                return Err(Error::DataIntegrity(format!(
                    "Duplicate shift code '{}' in reference table",
                    key
                )));
            }
            map.insert(key, code);
        }
        Ok(Self { codes: map })
    }

    /// Load the table from a JSON file containing an array of shift codes
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let codes: Vec<ShiftCode> = serde_json::from_str(&contents)?;
        let table = Self::from_codes(codes)?;
        tracing::info!("Loaded {} shift codes from {:?}", table.len(), path);
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&ShiftCode> {
        self.codes.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains_key(code)
    }

    /// All codes whose category matches (case-insensitive)
    pub fn codes_in_category(&self, category: &str) -> BTreeSet<String> {
        self.codes
            .values()
            .filter(|c| c.category.eq_ignore_ascii_case(category.trim()))
            .map(|c| c.code.clone())
            .collect()
    }

    /// All codes whose length label matches (case-insensitive)
    pub fn codes_with_length(&self, length: &str) -> BTreeSet<String> {
        self.codes
            .values()
            .filter(|c| c.length.eq_ignore_ascii_case(length.trim()))
            .map(|c| c.code.clone())
            .collect()
    }

    /// Validate the table for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, code) in &self.codes {
            if key.is_empty() || code.code.trim().is_empty() {
                errors.push("Shift code has empty code".to_string());
                continue;
            }
            if key != code.code.trim() {
                errors.push(format!(
                    "Shift code key '{}' doesn't match code '{}'",
                    key, code.code
                ));
            }
            if code.category.trim().is_empty() {
                errors.push(format!("Shift code '{}' has empty category", key));
            }
            if code.length.trim().is_empty() {
                errors.push(format!("Shift code '{}' has empty length label", key));
            }
            for (label, time) in [("begin", &code.begins), ("end", &code.ends)] {
                if let Some(time) = time {
                    if chrono::NaiveTime::parse_from_str(time, "%H:%M").is_err() {
                        errors.push(format!(
                            "Shift code '{}' has unparseable {} time '{}'",
                            key, label, time
                        ));
                    }
                }
            }
        }

        errors.sort();
        errors
    }
}
