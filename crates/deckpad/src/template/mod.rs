//! Slide bodies compiled from markdown into a block model that can be
//! rendered repeatedly against a [`DataStore`].

pub mod html;

use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{Arena, Options, parse_document};

use crate::data::DataStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        inlines: Vec<Inline>,
    },
    Paragraph {
        inlines: Vec<Inline>,
    },
    List {
        ordered: bool,
        start: usize,
        items: Vec<ListItem>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    BlockQuote {
        blocks: Vec<Block>,
    },
    Table {
        headers: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    HorizontalRule,
    Html(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    /// `{{ path }}`, looked up in the data store when rendered.
    Interpolation(String),
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(String),
    Link { text: Vec<Inline>, url: String },
    Image { alt: String, url: String },
    LineBreak,
    Html(String),
}

/// A compiled slide body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    source: String,
    blocks: Vec<Block>,
}

impl Template {
    pub fn compile(markdown: &str) -> Self {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options());
        let blocks = root.children().filter_map(lower_block).collect();
        Self {
            source: markdown.to_string(),
            blocks,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The markdown this template was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Text of the first heading, with interpolations left as `{{ path }}`.
    pub fn heading(&self) -> Option<String> {
        self.blocks.iter().find_map(|b| match b {
            Block::Heading { inlines, .. } => Some(inlines_to_text(inlines, None)),
            _ => None,
        })
    }

    pub fn render_html(&self, data: &DataStore) -> String {
        html::render(&self.blocks, data)
    }

    /// Plain-text rendering, one block per paragraph.
    pub fn plain_text(&self, data: &DataStore) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            block_to_text(block, data, 0, &mut out);
        }
        out
    }
}

fn options() -> Options {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options
}

fn lower_block<'a>(node: &'a AstNode<'a>) -> Option<Block> {
    let block = match &node.data.borrow().value {
        NodeValue::Heading(heading) => Block::Heading {
            level: heading.level,
            inlines: lower_inlines(node),
        },
        NodeValue::Paragraph => Block::Paragraph {
            inlines: lower_inlines(node),
        },
        NodeValue::List(list) => Block::List {
            ordered: list.list_type == ListType::Ordered,
            start: list.start,
            items: node
                .children()
                .map(|item| ListItem {
                    blocks: item.children().filter_map(lower_block).collect(),
                })
                .collect(),
        },
        NodeValue::CodeBlock(code) => {
            let language = code
                .info
                .split_whitespace()
                .next()
                .map(str::to_string)
                .filter(|l| !l.is_empty());
            Block::CodeBlock {
                language,
                code: code.literal.trim_end_matches('\n').to_string(),
            }
        }
        NodeValue::BlockQuote => Block::BlockQuote {
            blocks: node.children().filter_map(lower_block).collect(),
        },
        NodeValue::ThematicBreak => Block::HorizontalRule,
        NodeValue::HtmlBlock(html) => Block::Html(html.literal.trim_end().to_string()),
        NodeValue::Table(_) => lower_table(node),
        _ => return None,
    };
    Some(block)
}

fn lower_table<'a>(node: &'a AstNode<'a>) -> Block {
    let mut headers = Vec::new();
    let mut rows = Vec::new();
    for row in node.children() {
        let is_header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
        let cells: Vec<Vec<Inline>> = row.children().map(lower_inlines).collect();
        if is_header {
            headers = cells;
        } else {
            rows.push(cells);
        }
    }
    Block::Table { headers, rows }
}

fn lower_inlines<'a>(node: &'a AstNode<'a>) -> Vec<Inline> {
    let mut inlines = Vec::new();
    for child in node.children() {
        lower_inline(child, &mut inlines);
    }
    expand_interpolations(inlines)
}

fn lower_inline<'a>(node: &'a AstNode<'a>, out: &mut Vec<Inline>) {
    match &node.data.borrow().value {
        NodeValue::Text(text) => out.push(Inline::Text(text.to_string())),
        NodeValue::SoftBreak => out.push(Inline::Text(" ".to_string())),
        NodeValue::LineBreak => out.push(Inline::LineBreak),
        NodeValue::Code(code) => out.push(Inline::Code(code.literal.to_string())),
        NodeValue::HtmlInline(html) => out.push(Inline::Html(html.to_string())),
        NodeValue::Emph => out.push(Inline::Italic(lower_inlines(node))),
        NodeValue::Strong => out.push(Inline::Bold(lower_inlines(node))),
        NodeValue::Strikethrough => out.push(Inline::Strikethrough(lower_inlines(node))),
        NodeValue::Link(link) => out.push(Inline::Link {
            text: lower_inlines(node),
            url: link.url.to_string(),
        }),
        NodeValue::Image(image) => out.push(Inline::Image {
            alt: inlines_to_text(&lower_inlines(node), None),
            url: image.url.to_string(),
        }),
        _ => {
            for child in node.children() {
                lower_inline(child, out);
            }
        }
    }
}

/// Merge adjacent text runs, then split `{{ path }}` out of them.
fn expand_interpolations(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines {
        if let (Inline::Text(next), Some(Inline::Text(prev))) = (&inline, merged.last_mut()) {
            prev.push_str(next);
            continue;
        }
        merged.push(inline);
    }

    let mut out = Vec::with_capacity(merged.len());
    for inline in merged {
        match inline {
            Inline::Text(text) => split_interpolations(&text, &mut out),
            other => out.push(other),
        }
    }
    out
}

fn split_interpolations(text: &str, out: &mut Vec<Inline>) {
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        let path = rest[open + 2..open + 2 + close].trim();
        if path.is_empty() {
            push_text(out, &rest[..open + 4 + close]);
        } else {
            push_text(out, &rest[..open]);
            out.push(Inline::Interpolation(path.to_string()));
        }
        rest = &rest[open + 4 + close..];
    }
    push_text(out, rest);
}

fn push_text(out: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(prev)) = out.last_mut() {
        prev.push_str(text);
    } else {
        out.push(Inline::Text(text.to_string()));
    }
}

/// Flatten inlines to text. Interpolations resolve against `data` when given,
/// otherwise they are written back as `{{ path }}`.
pub fn inlines_to_text(inlines: &[Inline], data: Option<&DataStore>) -> String {
    let mut text = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(s) | Inline::Code(s) => text.push_str(s),
            Inline::Interpolation(path) => match data {
                Some(data) => text.push_str(&data.display(path)),
                None => {
                    text.push_str("{{ ");
                    text.push_str(path);
                    text.push_str(" }}");
                }
            },
            Inline::Bold(children)
            | Inline::Italic(children)
            | Inline::Strikethrough(children)
            | Inline::Link { text: children, .. } => {
                text.push_str(&inlines_to_text(children, data));
            }
            Inline::Image { alt, .. } => text.push_str(alt),
            Inline::LineBreak => text.push('\n'),
            Inline::Html(_) => {}
        }
    }
    text
}

fn block_to_text(block: &Block, data: &DataStore, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match block {
        Block::Heading { inlines, .. } | Block::Paragraph { inlines } => {
            out.push_str(&indent);
            out.push_str(&inlines_to_text(inlines, Some(data)));
        }
        Block::List {
            ordered,
            start,
            items,
        } => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(&indent);
                if *ordered {
                    out.push_str(&format!("{}. ", start + i));
                } else {
                    out.push_str("- ");
                }
                let mut first = true;
                for child in &item.blocks {
                    if first {
                        let mut inner = String::new();
                        block_to_text(child, data, 0, &mut inner);
                        out.push_str(&inner);
                        first = false;
                    } else {
                        out.push('\n');
                        block_to_text(child, data, depth + 1, out);
                    }
                }
            }
        }
        Block::CodeBlock { code, .. } => {
            for (i, line) in code.lines().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(&indent);
                out.push_str("    ");
                out.push_str(line);
            }
        }
        Block::BlockQuote { blocks } => {
            let mut inner = String::new();
            for (i, child) in blocks.iter().enumerate() {
                if i > 0 {
                    inner.push('\n');
                }
                block_to_text(child, data, 0, &mut inner);
            }
            for (i, line) in inner.lines().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(&indent);
                out.push_str("> ");
                out.push_str(line);
            }
        }
        Block::Table { headers, rows } => {
            let row_text = |cells: &Vec<Vec<Inline>>| {
                cells
                    .iter()
                    .map(|c| inlines_to_text(c, Some(data)))
                    .collect::<Vec<_>>()
                    .join(" | ")
            };
            out.push_str(&indent);
            out.push_str(&row_text(headers));
            for row in rows {
                out.push('\n');
                out.push_str(&indent);
                out.push_str(&row_text(row));
            }
        }
        Block::HorizontalRule => {
            out.push_str(&indent);
            out.push_str("---");
        }
        Block::Html(_) => {}
    }
}
