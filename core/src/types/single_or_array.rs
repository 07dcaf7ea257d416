use serde::{Deserialize, Serialize};

/// A list given either as a YAML sequence or as one comma separated string.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrArray {
    Single(String),
    Multiple(Vec<String>),
}

impl StringOrArray {
    /// Splits, trims and drops empty entries.
    pub fn to_list(&self) -> Vec<String> {
        let items: Vec<&str> = match self {
            StringOrArray::Single(value) => value.split(',').collect(),
            StringOrArray::Multiple(values) => values.iter().map(String::as_str).collect(),
        };

        items.into_iter().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
    }
}
