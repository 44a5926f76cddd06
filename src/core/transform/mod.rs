pub mod trim;

pub use trim::{trim_value, TrimDefaults, TrimMode, TrimSpec, TrimTransformer};

use crate::domain::model::{ColumnKey, ColumnRef, Value};

/// Which values of a frame a column rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    All,
    Column(ColumnKey),
}

impl ColumnSelector {
    pub fn matches(&self, key: ColumnRef<'_>) -> bool {
        match self {
            ColumnSelector::All => true,
            ColumnSelector::Column(column) => column.matches(key),
        }
    }
}

/// Text form of a value as seen by string transformers. Null becomes `None`.
pub fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selector_all_matches_everything() {
        assert!(ColumnSelector::All.matches(ColumnRef::Index(3)));
        assert!(ColumnSelector::All.matches(ColumnRef::Name("x")));
    }

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(stringify(&json!(null)), None);
        assert_eq!(stringify(&json!(" a ")), Some(" a ".to_string()));
        assert_eq!(stringify(&json!(42)), Some("42".to_string()));
        assert_eq!(stringify(&json!(true)), Some("true".to_string()));
    }
}
