use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// A print request stored on disk.
///
/// Either `{"config": {...}, "data": [...]}` or a bare element list.
#[derive(Debug, Clone, PartialEq)]
pub struct JobFile {
    pub config: Value,
    pub data: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Full {
        #[serde(default)]
        config: Value,
        data: Value,
    },
    Elements(Vec<Value>),
}

impl JobFile {
    pub fn parse(text: &str) -> Result<Self> {
        let repr: Repr = serde_json::from_str(text).context("job file is not a print request")?;
        Ok(match repr {
            Repr::Full { config, data } => Self { config, data },
            Repr::Elements(items) => Self {
                config: Value::Null,
                data: Value::Array(items),
            },
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read job file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }
}
