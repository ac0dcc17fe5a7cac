use std::collections::BTreeMap;

use serde_yaml::Value;

use crate::data::value_to_text;

pub type Fields = BTreeMap<String, Value>;

/// Per-slide metadata parsed from the YAML block above a slide body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    fields: Fields,
    /// Running merge of every `global` block up to and including this slide.
    pub global: Fields,
}

/// Why a frontmatter block could not be turned into [`Frontmatter`].
#[derive(Debug)]
pub enum FrontmatterError {
    Yaml(serde_yaml::Error),
    NotAMapping,
}

impl Frontmatter {
    /// Parse a YAML block. An empty block yields empty frontmatter.
    pub fn parse(yaml: &str) -> Result<Self, FrontmatterError> {
        let value: Value = serde_yaml::from_str(yaml).map_err(FrontmatterError::Yaml)?;
        let fields = match value {
            Value::Null => Fields::new(),
            Value::Mapping(map) => map
                .into_iter()
                .map(|(k, v)| (value_to_text(&k), v))
                .collect(),
            _ => return Err(FrontmatterError::NotAMapping),
        };
        Ok(Self {
            fields,
            global: Fields::new(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn title(&self) -> Option<String> {
        self.get("title").map(value_to_text)
    }

    pub fn class(&self) -> Option<String> {
        self.get("class").map(value_to_text)
    }

    /// Entries of the slide's own `data` block.
    pub fn data(&self) -> Fields {
        mapping_entries(self.get("data"))
    }

    /// Entries of the slide's own `global` block, before accumulation.
    pub fn own_global(&self) -> Fields {
        mapping_entries(self.get("global"))
    }

    /// `class` from the accumulated `global` block.
    pub fn global_class(&self) -> Option<String> {
        self.global.get("class").map(value_to_text)
    }
}

fn mapping_entries(value: Option<&Value>) -> Fields {
    match value {
        Some(Value::Mapping(map)) => map
            .iter()
            .map(|(k, v)| (value_to_text(k), v.clone()))
            .collect(),
        _ => Fields::new(),
    }
}
