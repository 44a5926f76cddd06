use crate::utils::error::{EtlError, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub use serde_json::Value;

/// 載入階段輸出的一列，形狀與 Frame 的資料相同
pub type Row = FrameData;

/// 標頭與資料長度不一致時的處理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyingPolicy {
    /// 長度不一致時回傳 `HeaderLengthMismatch`
    #[default]
    #[serde(alias = "error")]
    Strict,
    /// 依較短的一方截斷
    Truncate,
}

/// Column identifier: a header name for keyed data, a position for positional data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnKey {
    Index(usize),
    Name(String),
}

impl ColumnKey {
    pub fn matches(&self, key: ColumnRef<'_>) -> bool {
        match (self, key) {
            (ColumnKey::Name(name), ColumnRef::Name(other)) => name == other,
            (ColumnKey::Index(index), ColumnRef::Index(other)) => *index == other,
            _ => false,
        }
    }
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        ColumnKey::Name(name.to_string())
    }
}

impl From<String> for ColumnKey {
    fn from(name: String) -> Self {
        ColumnKey::Name(name)
    }
}

impl From<usize> for ColumnKey {
    fn from(index: usize) -> Self {
        ColumnKey::Index(index)
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Index(index) => write!(f, "#{}", index),
            ColumnKey::Name(name) => f.write_str(name),
        }
    }
}

/// Borrowed key of a single value while iterating frame data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Index(usize),
    Name(&'a str),
}

/// Insertion-ordered name -> value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Zips `names` with `values` positionally. A repeated name keeps its
    /// first position and takes the later value.
    pub fn zip<I>(names: &[String], values: I, policy: KeyingPolicy) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: ExactSizeIterator,
    {
        let values = values.into_iter();
        if policy == KeyingPolicy::Strict && names.len() != values.len() {
            return Err(EtlError::HeaderLengthMismatch {
                expected: names.len(),
                actual: values.len(),
            });
        }

        let mut fields = Fields(Vec::with_capacity(names.len().min(values.len())));
        for (name, value) in names.iter().zip(values) {
            fields.insert(name.clone(), value);
        }
        Ok(fields)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        let name = name.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.0.iter_mut().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Fields {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Frame payload: positional until a header gives the values names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FrameData {
    Positional(Vec<Value>),
    Keyed(Fields),
}

impl Default for FrameData {
    fn default() -> Self {
        FrameData::Positional(Vec::new())
    }
}

impl FrameData {
    pub fn len(&self) -> usize {
        match self {
            FrameData::Positional(values) => values.len(),
            FrameData::Keyed(fields) => fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self, FrameData::Keyed(_))
    }

    pub fn as_keyed(&self) -> Option<&Fields> {
        match self {
            FrameData::Keyed(fields) => Some(fields),
            FrameData::Positional(_) => None,
        }
    }

    pub fn get(&self, key: &ColumnKey) -> Option<&Value> {
        match (self, key) {
            (FrameData::Positional(values), ColumnKey::Index(index)) => values.get(*index),
            (FrameData::Keyed(fields), ColumnKey::Name(name)) => fields.get(name),
            _ => None,
        }
    }

    /// Values in order, dropping the keys of keyed data.
    pub fn values(&self) -> Vec<Value> {
        match self {
            FrameData::Positional(values) => values.clone(),
            FrameData::Keyed(fields) => fields.iter().map(|(_, value)| value.clone()).collect(),
        }
    }

    /// Re-keys the values by `names`, whatever the current shape.
    pub fn keyed_by(&self, names: &[String], policy: KeyingPolicy) -> Result<FrameData> {
        Fields::zip(names, self.values(), policy).map(FrameData::Keyed)
    }

    /// Visits every value with its key, stopping at the first error.
    pub fn try_for_each_mut<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(ColumnRef<'_>, &mut Value) -> Result<()>,
    {
        match self {
            FrameData::Positional(values) => {
                for (index, value) in values.iter_mut().enumerate() {
                    f(ColumnRef::Index(index), value)?;
                }
            }
            FrameData::Keyed(fields) => {
                for (key, value) in fields.iter_mut() {
                    f(ColumnRef::Name(key), value)?;
                }
            }
        }
        Ok(())
    }
}

/// Frame 旁路屬性（例如來源行號），不會混入資料本身
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// A single unit of data moving through the pipeline.
///
/// Data assigned while a non-empty header is set is keyed by header name;
/// otherwise it stays positional. The end-of-stream marker is a one-way
/// latch: there is no way to clear it once set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    header: Vec<String>,
    data: FrameData,
    attributes: Attributes,
    end: bool,
    keying: KeyingPolicy,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_header(names);
        self
    }

    pub fn with_keying_policy(mut self, policy: KeyingPolicy) -> Self {
        self.keying = policy;
        self
    }

    pub fn with_data(mut self, values: Vec<Value>) -> Result<Self> {
        self.set_data(values)?;
        Ok(self)
    }

    /// Replaces the header. Data already stored keeps its shape.
    pub fn set_header<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = names.into_iter().map(Into::into).collect();
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn keying_policy(&self) -> KeyingPolicy {
        self.keying
    }

    /// Stores `values`, keyed by the header when one is set.
    ///
    /// Under [`KeyingPolicy::Strict`] a header/values length mismatch is an
    /// error and the frame is left unchanged; under
    /// [`KeyingPolicy::Truncate`] the zip stops at the shorter sequence.
    pub fn set_data(&mut self, values: Vec<Value>) -> Result<&mut Self> {
        self.data = if self.header.is_empty() {
            FrameData::Positional(values)
        } else {
            FrameData::Keyed(Fields::zip(&self.header, values, self.keying)?)
        };
        Ok(self)
    }

    pub fn data(&self) -> &FrameData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut FrameData {
        &mut self.data
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.set(key, value.into());
    }

    pub fn attribute(&self, key: &str) -> Result<&Value> {
        self.attributes
            .get(key)
            .ok_or_else(|| EtlError::AttributeNotFound {
                key: key.to_string(),
            })
    }

    /// Owned copy of every attribute.
    pub fn attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    pub fn set_end(&mut self) {
        self.end = true;
    }

    pub fn is_end(&self) -> bool {
        self.end
    }
}
