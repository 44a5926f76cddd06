use super::{stringify, ColumnSelector};
use crate::domain::model::{ColumnKey, Frame, Value};
use crate::domain::ports::Transformer;
use crate::utils::error::{EtlError, Result};
use std::cmp::Ordering;
use std::str::FromStr;

/// 預設去除的字元：空白、tab、換行、歸位、NUL、垂直 tab
pub const DEFAULT_MASK: &str = " \t\n\r\0\x0B";
pub const DEFAULT_MODE: &str = "trim";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    Trim,
    LeftTrim,
    RightTrim,
}

impl TrimMode {
    pub fn apply<'a>(&self, value: &'a str, mask: &CharMask) -> &'a str {
        let strip = |c: char| mask.contains(c);
        match self {
            TrimMode::Trim => value.trim_matches(strip),
            TrimMode::LeftTrim => value.trim_start_matches(strip),
            TrimMode::RightTrim => value.trim_end_matches(strip),
        }
    }
}

impl FromStr for TrimMode {
    type Err = EtlError;

    fn from_str(mode: &str) -> Result<Self> {
        match mode {
            "trim" => Ok(TrimMode::Trim),
            "left-trim" | "ltrim" => Ok(TrimMode::LeftTrim),
            "right-trim" | "rtrim" => Ok(TrimMode::RightTrim),
            other => Err(EtlError::invalid_argument(format!(
                "Invalid trim type: {}.",
                other
            ))),
        }
    }
}

/// Set of characters eligible for stripping. `a..f` in the mask string
/// expands to the inclusive character range. Stored as sorted, merged
/// ranges so wide ranges cost no more than a single character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharMask(Vec<(char, char)>);

impl CharMask {
    pub fn parse(mask: &str) -> Self {
        let chars: Vec<char> = mask.chars().collect();
        let mut ranges = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            let is_range = i + 3 < chars.len()
                && chars[i + 1] == '.'
                && chars[i + 2] == '.'
                && chars[i] <= chars[i + 3];

            if is_range {
                ranges.push((chars[i], chars[i + 3]));
                i += 4;
            } else {
                ranges.push((chars[i], chars[i]));
                i += 1;
            }
        }

        ranges.sort_unstable();
        let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if (start as u32) <= (last.1 as u32) + 1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }

        Self(merged)
    }

    pub fn contains(&self, c: char) -> bool {
        self.0
            .binary_search_by(|&(start, end)| {
                if end < c {
                    Ordering::Less
                } else if start > c {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn ranges(&self) -> &[(char, char)] {
        &self.0
    }
}

impl Default for CharMask {
    fn default() -> Self {
        Self::parse(DEFAULT_MASK)
    }
}

/// Strips `mask` characters from `value` according to `mode`.
///
/// A null value always yields the empty string. An unknown mode fails with
/// `InvalidArgument` before anything is stripped. `None` mask means the
/// default whitespace/control set.
pub fn trim_value(value: Option<&str>, mode: &str, mask: Option<&str>) -> Result<String> {
    let Some(value) = value else {
        return Ok(String::new());
    };

    let mode: TrimMode = mode.parse()?;
    let mask = mask.map(CharMask::parse).unwrap_or_default();

    Ok(mode.apply(value, &mask).to_string())
}

/// 建構時決定的預設模式與字元遮罩
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimDefaults {
    pub mode: String,
    pub mask: String,
}

impl Default for TrimDefaults {
    fn default() -> Self {
        Self {
            mode: DEFAULT_MODE.to_string(),
            mask: DEFAULT_MASK.to_string(),
        }
    }
}

/// One registered trim rule. Mode and mask are parsed once at registration;
/// an unknown mode is kept as text and reported when a value is trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimSpec {
    pub column: ColumnSelector,
    pub mode: String,
    pub mask: String,
    parsed_mode: Option<TrimMode>,
    char_mask: CharMask,
}

impl TrimSpec {
    fn new(column: ColumnSelector, mode: &str, mask: &str) -> Self {
        Self {
            column,
            mode: mode.to_string(),
            mask: mask.to_string(),
            parsed_mode: mode.parse().ok(),
            char_mask: CharMask::parse(mask),
        }
    }

    fn trim(&self, value: &mut Value) -> Result<()> {
        let trimmed = match stringify(value) {
            None => String::new(),
            Some(text) => {
                let mode = match self.parsed_mode {
                    Some(mode) => mode,
                    // 重新解析以取得一致的錯誤訊息
                    None => self.mode.parse()?,
                };
                mode.apply(&text, &self.char_mask).to_string()
            }
        };
        *value = Value::String(trimmed);
        Ok(())
    }
}

/// Trims values of selected columns, or of every column.
///
/// Column rules are consulted in registration order and the first
/// one naming the value's key wins. Once [`transform_all_columns`] has been
/// called the per-column rules are ignored entirely.
///
/// [`transform_all_columns`]: TrimTransformer::transform_all_columns
#[derive(Debug, Clone, Default)]
pub struct TrimTransformer {
    defaults: TrimDefaults,
    specs: Vec<TrimSpec>,
}

impl TrimTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: TrimDefaults) -> Self {
        Self {
            defaults,
            specs: Vec::new(),
        }
    }

    pub fn transform_column(
        mut self,
        column: impl Into<ColumnKey>,
        mode: Option<&str>,
        mask: Option<&str>,
    ) -> Self {
        let spec = self.spec(ColumnSelector::Column(column.into()), mode, mask);
        self.specs.push(spec);
        self
    }

    pub fn transform_all_columns(mut self, mode: Option<&str>, mask: Option<&str>) -> Self {
        let spec = self.spec(ColumnSelector::All, mode, mask);
        self.specs.push(spec);
        self
    }

    pub fn specs(&self) -> &[TrimSpec] {
        &self.specs
    }

    pub fn is_all_columns(&self) -> bool {
        self.all_columns_spec().is_some()
    }

    fn spec(&self, column: ColumnSelector, mode: Option<&str>, mask: Option<&str>) -> TrimSpec {
        TrimSpec::new(
            column,
            mode.unwrap_or(self.defaults.mode.as_str()),
            mask.unwrap_or(self.defaults.mask.as_str()),
        )
    }

    fn all_columns_spec(&self) -> Option<&TrimSpec> {
        self.specs
            .iter()
            .find(|spec| spec.column == ColumnSelector::All)
    }
}

impl Transformer for TrimTransformer {
    fn apply(&self, mut frame: Frame) -> Result<Frame> {
        if let Some(spec) = self.all_columns_spec() {
            frame
                .data_mut()
                .try_for_each_mut(|_, value| spec.trim(value))?;
            return Ok(frame);
        }

        frame.data_mut().try_for_each_mut(|key, value| {
            match self.specs.iter().find(|spec| spec.column.matches(key)) {
                Some(spec) => spec.trim(value),
                None => Ok(()),
            }
        })?;

        Ok(frame)
    }

    fn name(&self) -> &str {
        "trim"
    }
}
