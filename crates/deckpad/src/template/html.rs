use crate::data::DataStore;

use super::{Block, Inline};

pub fn render(blocks: &[Block], data: &DataStore) -> String {
    let mut out = String::new();
    for block in blocks {
        write_block(block, data, &mut out);
    }
    out
}

fn write_block(block: &Block, data: &DataStore, out: &mut String) {
    match block {
        Block::Heading { level, inlines } => {
            out.push_str(&format!("<h{level}>"));
            write_inlines(inlines, data, out);
            out.push_str(&format!("</h{level}>\n"));
        }
        Block::Paragraph { inlines } => {
            out.push_str("<p>");
            write_inlines(inlines, data, out);
            out.push_str("</p>\n");
        }
        Block::List {
            ordered,
            start,
            items,
        } => {
            let tag = if *ordered { "ol" } else { "ul" };
            if *ordered && *start != 1 {
                out.push_str(&format!("<ol start=\"{start}\">\n"));
            } else {
                out.push_str(&format!("<{tag}>\n"));
            }
            for item in items {
                out.push_str("<li>");
                // Single-paragraph items render without the <p> wrapper.
                if let [Block::Paragraph { inlines }] = item.blocks.as_slice() {
                    write_inlines(inlines, data, out);
                } else {
                    for child in &item.blocks {
                        write_block(child, data, out);
                    }
                }
                out.push_str("</li>\n");
            }
            out.push_str(&format!("</{tag}>\n"));
        }
        Block::CodeBlock { language, code } => {
            match language {
                Some(lang) => out.push_str(&format!(
                    "<pre><code class=\"language-{}\">",
                    escape(lang)
                )),
                None => out.push_str("<pre><code>"),
            }
            out.push_str(&escape(code));
            out.push_str("\n</code></pre>\n");
        }
        Block::BlockQuote { blocks } => {
            out.push_str("<blockquote>\n");
            for child in blocks {
                write_block(child, data, out);
            }
            out.push_str("</blockquote>\n");
        }
        Block::Table { headers, rows } => {
            out.push_str("<table>\n<thead>\n<tr>");
            for cell in headers {
                out.push_str("<th>");
                write_inlines(cell, data, out);
                out.push_str("</th>");
            }
            out.push_str("</tr>\n</thead>\n<tbody>\n");
            for row in rows {
                out.push_str("<tr>");
                for cell in row {
                    out.push_str("<td>");
                    write_inlines(cell, data, out);
                    out.push_str("</td>");
                }
                out.push_str("</tr>\n");
            }
            out.push_str("</tbody>\n</table>\n");
        }
        Block::HorizontalRule => out.push_str("<hr />\n"),
        Block::Html(html) => {
            out.push_str(html);
            out.push('\n');
        }
    }
}

fn write_inlines(inlines: &[Inline], data: &DataStore, out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape(text)),
            Inline::Interpolation(path) => out.push_str(&escape(&data.display(path))),
            Inline::Bold(children) => {
                out.push_str("<strong>");
                write_inlines(children, data, out);
                out.push_str("</strong>");
            }
            Inline::Italic(children) => {
                out.push_str("<em>");
                write_inlines(children, data, out);
                out.push_str("</em>");
            }
            Inline::Strikethrough(children) => {
                out.push_str("<del>");
                write_inlines(children, data, out);
                out.push_str("</del>");
            }
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&escape(code));
                out.push_str("</code>");
            }
            Inline::Link { text, url } => {
                out.push_str(&format!("<a href=\"{}\">", escape(url)));
                write_inlines(text, data, out);
                out.push_str("</a>");
            }
            Inline::Image { alt, url } => {
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\" />",
                    escape(url),
                    escape(alt)
                ));
            }
            Inline::LineBreak => out.push_str("<br />\n"),
            Inline::Html(html) => out.push_str(html),
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use crate::data::DataStore;
    use crate::template::Template;

    #[test]
    fn test_basic_html() {
        let t = Template::compile("# Title\n\nHello **world**");
        assert_eq!(
            t.render_html(&DataStore::new()),
            "<h1>Title</h1>\n<p>Hello <strong>world</strong></p>\n"
        );
    }

    #[test]
    fn test_interpolated_values_are_escaped() {
        let t = Template::compile("Hi {{ who }}");
        let mut data = DataStore::new();
        data.insert("who", serde_yaml::Value::String("<b>Ada</b>".into()));
        assert_eq!(t.render_html(&data), "<p>Hi &lt;b&gt;Ada&lt;/b&gt;</p>\n");
    }

    #[test]
    fn test_raw_html_passes_through() {
        let t = Template::compile("<div class=\"box\">\nraw\n</div>");
        assert!(t.render_html(&DataStore::new()).contains("<div class=\"box\">"));
    }

    #[test]
    fn test_tight_list() {
        let t = Template::compile("- a\n- b");
        assert_eq!(
            t.render_html(&DataStore::new()),
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_code_block_escaped() {
        let t = Template::compile("```html\n<p>x</p>\n```");
        assert_eq!(
            t.render_html(&DataStore::new()),
            "<pre><code class=\"language-html\">&lt;p&gt;x&lt;/p&gt;\n</code></pre>\n"
        );
    }
}
