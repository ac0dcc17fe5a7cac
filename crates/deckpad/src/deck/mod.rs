pub mod frontmatter;
pub mod splitter;

use thiserror::Error;
use tracing::debug;

use crate::data::DataStore;
use crate::template::Template;

pub use frontmatter::{Fields, Frontmatter};
use frontmatter::FrontmatterError;

#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    /// Zero-based position in the deck.
    pub index: usize,
    pub frontmatter: Frontmatter,
    pub content: Template,
}

impl Slide {
    pub fn title(&self) -> Option<String> {
        self.frontmatter.title()
    }

    /// Style classes in application order: the accumulated global class first,
    /// then the slide's own.
    pub fn classes(&self) -> Vec<String> {
        [self.frontmatter.global_class(), self.frontmatter.class()]
            .into_iter()
            .flatten()
            .flat_map(|c| {
                c.split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Frontmatter title, falling back to the first heading.
    pub fn display_title(&self) -> Option<String> {
        self.title().or_else(|| self.content.heading())
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("slide {slide} (line {line}): invalid frontmatter: {source}")]
    Frontmatter {
        slide: usize,
        line: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("slide {slide} (line {line}): frontmatter must be a mapping of keys to values")]
    NotAMapping { slide: usize, line: usize },
}

/// The ordered slides derived from one deck source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deck {
    slides: Vec<Slide>,
}

impl Deck {
    pub fn parse(text: &str, data: &mut DataStore) -> Result<Self, ParseError> {
        parse(text, data)
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn get(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Position of the first slide whose frontmatter title equals `title`.
    pub fn position_of_title(&self, title: &str) -> Option<usize> {
        self.slides
            .iter()
            .position(|s| s.title().as_deref() == Some(title))
    }
}

/// Parse deck source into slides.
///
/// Every frontmatter block is validated before anything is written to `data`,
/// so a failed parse leaves the store as it was.
pub fn parse(text: &str, data: &mut DataStore) -> Result<Deck, ParseError> {
    let raw_slides = splitter::split(text);

    let mut parsed = Vec::with_capacity(raw_slides.len());
    for (i, raw) in raw_slides.into_iter().enumerate() {
        let frontmatter = match raw.frontmatter.as_deref() {
            Some(yaml) => Frontmatter::parse(yaml).map_err(|e| match e {
                FrontmatterError::Yaml(source) => ParseError::Frontmatter {
                    slide: i + 1,
                    line: raw.line,
                    source,
                },
                FrontmatterError::NotAMapping => ParseError::NotAMapping {
                    slide: i + 1,
                    line: raw.line,
                },
            })?,
            None => Frontmatter::default(),
        };
        parsed.push((frontmatter, raw.body));
    }

    let mut global = Fields::new();
    let slides: Vec<Slide> = parsed
        .into_iter()
        .enumerate()
        .map(|(index, (mut frontmatter, body))| {
            data.merge(&frontmatter.data());
            global.extend(frontmatter.own_global());
            frontmatter.global = global.clone();
            Slide {
                index,
                frontmatter,
                content: Template::compile(&body),
            }
        })
        .collect();

    debug!(slides = slides.len(), data_keys = data.len(), "parsed deck");
    Ok(Deck { slides })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn parse_fresh(text: &str) -> (Deck, DataStore) {
        let mut data = DataStore::new();
        let deck = parse(text, &mut data).unwrap();
        (deck, data)
    }

    #[test]
    fn test_three_plain_slides() {
        let (deck, _) = parse_fresh("# A\n---\n# B\n---\n# C");
        assert_eq!(deck.len(), 3);
        let indexes: Vec<usize> = deck.slides().iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(deck.slides()[1].display_title().as_deref(), Some("B"));
    }

    #[test]
    fn test_data_last_writer_wins() {
        let text = "---\ndata:\n  x: 1\n---\n# Zero\n---\n# One\n---\ndata:\n  x: 2\n---\n# Two";
        let (deck, data) = parse_fresh(text);
        assert_eq!(deck.len(), 3);
        assert_eq!(data.get("x"), Some(&Value::from(2)));
    }

    #[test]
    fn test_global_accumulates_in_order() {
        let text = "---\nglobal:\n  class: dark\n  footer: A\n---\none\n---\ntwo\n---\nglobal:\n  footer: B\n---\nthree";
        let (deck, _) = parse_fresh(text);
        let g = |i: usize| deck.slides()[i].frontmatter.global.clone();

        assert_eq!(g(0).get("class"), Some(&Value::from("dark")));
        assert_eq!(g(1), g(0), "slides without frontmatter inherit the snapshot");
        assert_eq!(g(2).get("class"), Some(&Value::from("dark")));
        assert_eq!(g(2).get("footer"), Some(&Value::from("B")));
        assert_eq!(g(0).get("footer"), Some(&Value::from("A")), "snapshot, not live");
    }

    #[test]
    fn test_global_keys_are_superset_of_earlier() {
        let text = "---\nglobal:\n  a: 1\n---\nx\n---\nglobal:\n  b: 2\n---\ny\n---\nglobal:\n  a: 3\n---\nz";
        let (deck, _) = parse_fresh(text);
        for i in 0..deck.len() {
            for j in i..deck.len() {
                let earlier = &deck.slides()[i].frontmatter.global;
                let later = &deck.slides()[j].frontmatter.global;
                assert!(earlier.keys().all(|k| later.contains_key(k)));
            }
        }
        assert_eq!(deck.slides()[2].frontmatter.global.get("a"), Some(&Value::from(3)));
    }

    #[test]
    fn test_classes_combine_global_and_own() {
        let text = "---\nglobal:\n  class: dark\nclass: centered big\n---\n# Hi";
        let (deck, _) = parse_fresh(text);
        assert_eq!(deck.slides()[0].classes(), vec!["dark", "centered", "big"]);
        assert!(deck.slides()[0].classes().iter().any(|c| c == "big"));
    }

    #[test]
    fn test_position_of_title() {
        let text = "---\ntitle: intro\n---\nA\n---\ntitle: end\n---\nB";
        let (deck, _) = parse_fresh(text);
        assert_eq!(deck.position_of_title("end"), Some(1));
        assert_eq!(deck.position_of_title("missing"), None);
    }

    #[test]
    fn test_malformed_frontmatter_is_error() {
        let mut data = DataStore::new();
        let text = "---\ndata:\n  x: 1\n---\nok\n---\ntitle: [oops\n---\nbad";
        let err = parse(text, &mut data).unwrap_err();
        assert!(matches!(err, ParseError::Frontmatter { slide: 2, line: 7, .. }));
        assert_eq!(data.len(), 0, "failed parse must not touch the store");
    }

    #[test]
    fn test_list_after_separator_is_body() {
        let mut data = DataStore::new();
        let deck = parse("---\n- one\n---\nb", &mut data).unwrap();
        assert_eq!(deck.len(), 2);
        assert!(deck.slides()[0].frontmatter.fields().is_empty());
    }

    #[test]
    fn test_invalid_yaml_after_key_line() {
        let mut data = DataStore::new();
        let err = parse("a\n---\ntitle: x\n- y\n---\nb", &mut data).unwrap_err();
        assert!(err.to_string().starts_with("slide 2 (line 3)"));
    }

    #[test]
    fn test_reparse_reapplies_data() {
        let mut data = DataStore::new();
        let text = "---\ndata:\n  x: 1\n---\nA";
        parse(text, &mut data).unwrap();
        data.insert("x", Value::from(9));
        parse(text, &mut data).unwrap();
        assert_eq!(data.get("x"), Some(&Value::from(1)));
    }

    #[test]
    fn test_content_compiled() {
        let (deck, data) = parse_fresh("---\ndata:\n  who: Ada\n---\n# Hello {{ who }}");
        assert_eq!(deck.slides()[0].content.plain_text(&data), "Hello Ada");
    }
}
