//! Sort specifications for batched lookups
//!
//! Reference collections may declare the order in which a cascade fetch
//! returns their targets. The text form accepts either a brace-wrapped
//! list of `field: direction` pairs (direction `1` or `-1`, field names
//! optionally quoted) or a comma-separated list of field names where a
//! leading `-` means descending:
//!
//! ```
//! use docmap_core::SortSpec;
//!
//! let a: SortSpec = "{'level': -1, name: 1}".parse().unwrap();
//! let b: SortSpec = "-level, name".parse().unwrap();
//! assert_eq!(a, b);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::value::{Document, Value};

/// Direction of one sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Ordered list of sort keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    keys: Vec<(String, SortOrder)>,
}

impl SortSpec {
    /// Empty spec (no ordering)
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an ascending key
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new().then_asc(field)
    }

    /// Start with a descending key
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new().then_desc(field)
    }

    /// Append an ascending key
    pub fn then_asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Ascending));
        self
    }

    /// Append a descending key
    pub fn then_desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Descending));
        self
    }

    /// Sort keys in priority order
    pub fn keys(&self) -> &[(String, SortOrder)] {
        &self.keys
    }

    /// Check if no keys are declared
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Compare two documents under this spec
    ///
    /// Missing fields compare as null.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, order) in &self.keys {
            let left = a.get(field).unwrap_or(&Value::Null);
            let right = b.get(field).unwrap_or(&Value::Null);
            let ord = match order {
                SortOrder::Ascending => left.sort_cmp(right),
                SortOrder::Descending => right.sort_cmp(left),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Stable-sort documents in place
    pub fn sort(&self, docs: &mut [Document]) {
        if self.is_empty() {
            return;
        }
        docs.sort_by(|a, b| self.compare(a, b));
    }
}

impl FromStr for SortSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let braced = trimmed.starts_with('{');
        let body = if braced {
            trimmed
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
                .ok_or_else(|| Error::InvalidOperation(format!("Unbalanced sort spec '{}'", s)))?
        } else {
            trimmed
        };

        let mut spec = SortSpec::new();
        for part in body.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (field, order) = if braced {
                let (name, dir) = part.split_once(':').ok_or_else(|| {
                    Error::InvalidOperation(format!("Sort key '{}' has no direction", part))
                })?;
                let order = match dir.trim() {
                    "1" => SortOrder::Ascending,
                    "-1" => SortOrder::Descending,
                    other => {
                        return Err(Error::InvalidOperation(format!(
                            "Invalid sort direction '{}' for '{}'",
                            other, name
                        )))
                    }
                };
                (unquote(name.trim()), order)
            } else if let Some(name) = part.strip_prefix('-') {
                (unquote(name.trim()), SortOrder::Descending)
            } else {
                (unquote(part.strip_prefix('+').unwrap_or(part).trim()), SortOrder::Ascending)
            };
            if field.is_empty() {
                return Err(Error::InvalidOperation(format!("Empty sort key in '{}'", s)));
            }
            spec.keys.push((field, order));
        }
        Ok(spec)
    }
}

fn unquote(s: &str) -> String {
    s.trim_matches(|c| c == '\'' || c == '"').to_string()
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (field, order)) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let dir = match order {
                SortOrder::Ascending => 1,
                SortOrder::Descending => -1,
            };
            write!(f, "{}: {}", field, dir)?;
        }
        f.write_str("}")
    }
}
