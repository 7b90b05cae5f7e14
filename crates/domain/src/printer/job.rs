use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::ops::RangeInclusive;

use crate::error::{DomainError, Result};

/// Horizontal alignment. Accepts `0|1|2` or `"left"|"center"|"right"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl<'de> Deserialize<'de> for Align {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(i64),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(0) => Ok(Self::Left),
            Repr::Code(1) => Ok(Self::Center),
            Repr::Code(2) => Ok(Self::Right),
            Repr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "left" => Ok(Self::Left),
                "center" | "centre" => Ok(Self::Center),
                "right" => Ok(Self::Right),
                _ => Err(serde::de::Error::custom(format!("unknown align: {}", name))),
            },
            Repr::Code(n) => Err(serde::de::Error::custom(format!("unknown align: {}", n))),
        }
    }
}

/// Accepts `true|false` or `0|1` for on/off attributes
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Bool(bool),
        Int(i64),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Bool(b) => Ok(b),
        Repr::Int(n) => Ok(n != 0),
    }
}

fn default_true() -> bool {
    true
}

fn default_scale() -> i32 {
    1
}

fn default_column_weight() -> i32 {
    1
}

/// Job-wide layout parameters. Every field is optional; each dialect reads
/// the fields it understands and validates their ranges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    /// Label width in millimetres
    pub width: Option<i32>,
    /// Label height in millimetres
    pub height: Option<i32>,
    /// Gap between labels in hundredths of a millimetre
    pub gap: Option<i32>,
    /// Print darkness (TSC 0-15, CPCL 0-3)
    pub density: Option<i32>,
    /// Feed direction (0 or 1)
    pub direction: Option<i32>,
    pub copies: Option<i32>,
    /// Raster width in dots for receipts
    pub paper_width: Option<i32>,
    /// Characters per line for table rows
    pub line_width: Option<i32>,
    /// Lines fed after a receipt
    pub feed_lines: Option<i32>,
    #[serde(deserialize_with = "flag")]
    pub cut: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub content: String,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    /// Bold
    #[serde(default, deserialize_with = "flag")]
    pub weight: bool,
    /// Horizontal font multiplier
    #[serde(default = "default_scale")]
    pub width: i32,
    /// Vertical font multiplier
    #[serde(default = "default_scale")]
    pub height: i32,
    #[serde(default, deserialize_with = "flag")]
    pub underline: bool,
    #[serde(default = "default_true", deserialize_with = "flag")]
    pub linefeed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeElement {
    pub content: String,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    /// Bar height in dots
    #[serde(default)]
    pub height: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrElement {
    pub content: String,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    /// Module size in dots
    #[serde(default)]
    pub size: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    /// Base64 encoded PNG, JPEG or BMP
    pub content: String,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    /// Target width in dots
    #[serde(default)]
    pub width: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub text: String,
    #[serde(default = "default_column_weight")]
    pub weight: i32,
    #[serde(default)]
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableElement {
    pub columns: Vec<TableColumn>,
    #[serde(default, deserialize_with = "flag")]
    pub bold: bool,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    /// Base64 encoded bytes, passed through untouched
    pub content: String,
}

/// One item of printable content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentElement {
    Text(TextElement),
    Barcode(BarcodeElement),
    #[serde(rename = "qrcode")]
    QrCode(QrElement),
    Image(ImageElement),
    Table(TableElement),
    Raw(RawElement),
}

impl ContentElement {
    /// Absolute placement if the element carries one
    pub fn position(&self) -> (Option<i32>, Option<i32>) {
        match self {
            Self::Text(e) => (e.x, e.y),
            Self::Barcode(e) => (e.x, e.y),
            Self::QrCode(e) => (e.x, e.y),
            Self::Image(e) => (e.x, e.y),
            Self::Table(e) => (e.x, e.y),
            Self::Raw(_) => (None, None),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Barcode(_) => "barcode",
            Self::QrCode(_) => "qrcode",
            Self::Image(_) => "image",
            Self::Table(_) => "table",
            Self::Raw(_) => "raw",
        }
    }
}

/// Ephemeral print request: consumed once by an encoder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    #[serde(default)]
    pub config: PrintConfig,
    #[serde(default)]
    pub elements: Vec<ContentElement>,
}

impl PrintJob {
    pub fn new(config: PrintConfig, elements: Vec<ContentElement>) -> Self {
        Self { config, elements }
    }

    /// Interpret the opaque request shapes: a config object and a list of
    /// element objects. Malformed shapes fail with `InvalidArgument`.
    pub fn from_request(config: &Value, data: &Value) -> Result<Self> {
        let config = match config {
            Value::Null => PrintConfig::default(),
            Value::Object(_) => serde_json::from_value(config.clone()).map_err(|e| {
                DomainError::InvalidArgument(format!("Invalid print config: {}", e))
            })?,
            _ => {
                return Err(DomainError::InvalidArgument(
                    "config must be an object".to_string(),
                ));
            }
        };

        let items = data
            .as_array()
            .ok_or_else(|| DomainError::InvalidArgument("data must be a list".to_string()))?;

        let elements = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<ContentElement>(item.clone()).map_err(|e| {
                    DomainError::InvalidArgument(format!("Invalid element {}: {}", index, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { config, elements })
    }
}

/// Reject values outside a dialect's accepted range
pub fn require_range(field: &str, value: i32, range: RangeInclusive<i32>) -> Result<i32> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(DomainError::ContentError(format!(
            "{} {} out of range {}..={}",
            field,
            value,
            range.start(),
            range.end()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_receipt_request() {
        let job = PrintJob::from_request(
            &json!({"cut": 1, "feed_lines": 2}),
            &json!([
                {"type": "text", "content": "Hello", "align": 1, "weight": 1},
                {"type": "qrcode", "content": "https://example.com", "size": 6},
                {"type": "barcode", "content": "12345678"},
            ]),
        )
        .unwrap();

        assert!(job.config.cut);
        assert_eq!(job.config.feed_lines, Some(2));
        assert_eq!(job.elements.len(), 3);
        match &job.elements[0] {
            ContentElement::Text(t) => {
                assert_eq!(t.align, Align::Center);
                assert!(t.weight);
                assert!(t.linefeed);
                assert_eq!(t.width, 1);
            }
            other => panic!("unexpected element {:?}", other),
        }
        assert_eq!(job.elements[1].kind(), "qrcode");
    }

    #[test]
    fn test_align_by_name() {
        let el: ContentElement =
            serde_json::from_value(json!({"type": "text", "content": "x", "align": "right"}))
                .unwrap();
        match el {
            ContentElement::Text(t) => assert_eq!(t.align, Align::Right),
            other => panic!("unexpected element {:?}", other),
        }
    }

    #[test]
    fn test_null_config_uses_defaults() {
        let job = PrintJob::from_request(&Value::Null, &json!([])).unwrap();
        assert_eq!(job.config, PrintConfig::default());
        assert!(job.elements.is_empty());
    }

    #[test]
    fn test_data_must_be_list() {
        let err = PrintJob::from_request(&json!({}), &json!({"type": "text"})).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidArgument("data must be a list".to_string())
        );
    }

    #[test]
    fn test_config_must_be_object() {
        let err = PrintJob::from_request(&json!([1, 2]), &json!([])).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_element_type_is_invalid_argument() {
        let err =
            PrintJob::from_request(&json!({}), &json!([{"type": "hologram", "content": "x"}]))
                .unwrap_err();
        match err {
            DomainError::InvalidArgument(msg) => assert!(msg.starts_with("Invalid element 0")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_content_is_invalid_argument() {
        let err = PrintJob::from_request(&json!({}), &json!([{"type": "text"}])).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn test_element_positions() {
        let el: ContentElement =
            serde_json::from_value(json!({"type": "barcode", "content": "A1", "x": 10, "y": 20}))
                .unwrap();
        assert_eq!(el.position(), (Some(10), Some(20)));
    }

    #[test]
    fn test_require_range() {
        assert_eq!(require_range("density", 15, 0..=15).unwrap(), 15);
        let err = require_range("density", 16, 0..=15).unwrap_err();
        assert_eq!(
            err,
            DomainError::ContentError("density 16 out of range 0..=15".to_string())
        );
    }
}
