use std::ops::Range;

use eframe::egui::{self, Color32, FontFamily, FontId, Galley, Pos2, Rect, Stroke};

use crate::data::DataStore;
use crate::deck::Slide;
use crate::template::{Block, Inline, ListItem, inlines_to_text};
use crate::theme::Theme;

/// Link prefix that jumps to the slide with the given frontmatter title.
pub const GO_PREFIX: &str = "#go:";

/// A clickable region that jumps to another slide. A link that wraps
/// produces one target per row.
#[derive(Debug, Clone)]
pub struct GoTarget {
    pub rect: Rect,
    pub title: String,
}

/// Characters of a laid-out job that belong to one `#go:` link.
#[derive(Debug, Clone, PartialEq)]
struct GoSpan {
    chars: Range<usize>,
    title: String,
}

struct Painter<'a> {
    ui: &'a egui::Ui,
    theme: &'a Theme,
    data: &'a DataStore,
    scale: f32,
    left: f32,
    width: f32,
    y: f32,
    targets: Vec<GoTarget>,
}

/// Draw a slide into `rect`. Returns the regions of `#go:` links.
pub fn render_slide(
    ui: &egui::Ui,
    slide: &Slide,
    data: &DataStore,
    theme: &Theme,
    rect: Rect,
    scale: f32,
) -> Vec<GoTarget> {
    ui.painter().rect_filled(rect, 0.0, theme.background);

    let padding = 64.0 * scale;
    let mut painter = Painter {
        ui,
        theme,
        data,
        scale,
        left: rect.left() + padding,
        width: (rect.width() - padding * 2.0).max(1.0),
        y: rect.top() + padding,
        targets: Vec::new(),
    };
    painter.blocks(slide.content.blocks());
    painter.targets
}

impl Painter<'_> {
    fn gap(&self) -> f32 {
        18.0 * self.scale
    }

    fn blocks(&mut self, blocks: &[Block]) {
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                self.y += self.gap();
            }
            self.block(block);
        }
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, inlines } => {
                let size = self.theme.heading_size(*level) * self.scale;
                self.inlines(inlines, size, self.theme.heading_color, true);
            }
            Block::Paragraph { inlines } => {
                let size = self.theme.body_size * self.scale;
                self.inlines(inlines, size, self.theme.foreground, false);
            }
            Block::List {
                ordered,
                start,
                items,
            } => self.list(items, *ordered, *start),
            Block::CodeBlock { code, .. } => self.code_block(code),
            Block::BlockQuote { blocks } => self.quote(blocks),
            Block::Table { headers, rows } => self.table(headers, rows),
            Block::HorizontalRule => {
                let y = self.y + 8.0 * self.scale;
                self.ui.painter().line_segment(
                    [Pos2::new(self.left, y), Pos2::new(self.left + self.width, y)],
                    Stroke::new(2.0 * self.scale, Theme::with_opacity(self.theme.foreground, 0.3)),
                );
                self.y += 16.0 * self.scale;
            }
            Block::Html(html) => {
                let color = Theme::with_opacity(self.theme.foreground, 0.5);
                let galley = self.ui.painter().layout(
                    html.clone(),
                    FontId::monospace(self.theme.code_size * 0.8 * self.scale),
                    color,
                    self.width,
                );
                let height = galley.rect.height();
                self.ui
                    .painter()
                    .galley(Pos2::new(self.left, self.y), galley, color);
                self.y += height;
            }
        }
    }

    fn inlines(&mut self, inlines: &[Inline], size: f32, color: Color32, bold: bool) {
        let (job, spans) =
            inlines_to_job(inlines, self.data, size, color, self.theme.accent, self.width, bold);
        let height = self.paint_job(job, &spans, Pos2::new(self.left, self.y), color);
        self.y += height;
    }

    /// Paint a job at `pos`, record its link regions and return its height.
    fn paint_job(
        &mut self,
        job: egui::text::LayoutJob,
        spans: &[GoSpan],
        pos: Pos2,
        color: Color32,
    ) -> f32 {
        let galley = self.ui.painter().layout_job(job);
        for span in spans {
            for rect in span_rects(&galley, pos, &span.chars) {
                self.targets.push(GoTarget {
                    rect,
                    title: span.title.clone(),
                });
            }
        }
        let height = galley.rect.height();
        self.ui.painter().galley(pos, galley, color);
        height
    }

    fn list(&mut self, items: &[ListItem], ordered: bool, start: usize) {
        let size = self.theme.body_size * self.scale;
        let indent = size * 1.4;
        let marker_color = self.theme.accent;

        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.y += 6.0 * self.scale;
            }
            let marker = if ordered {
                format!("{}.", start + i)
            } else {
                "•".to_string()
            };
            let galley =
                self.ui
                    .painter()
                    .layout_no_wrap(marker, FontId::proportional(size), marker_color);
            self.ui
                .painter()
                .galley(Pos2::new(self.left, self.y), galley, marker_color);

            self.left += indent;
            self.width -= indent;
            self.blocks(&item.blocks);
            self.left -= indent;
            self.width += indent;
        }
    }

    fn code_block(&mut self, code: &str) {
        let pad = 16.0 * self.scale;
        let galley = self.ui.painter().layout(
            code.to_string(),
            FontId::monospace(self.theme.code_size * self.scale),
            self.theme.code_foreground,
            self.width - pad * 2.0,
        );
        let bg = Rect::from_min_size(
            Pos2::new(self.left, self.y),
            egui::vec2(self.width, galley.rect.height() + pad * 2.0),
        );
        self.ui
            .painter()
            .rect_filled(bg, 6.0 * self.scale, self.theme.code_background);
        self.ui.painter().galley(
            Pos2::new(self.left + pad, self.y + pad),
            galley,
            self.theme.code_foreground,
        );
        self.y = bg.bottom();
    }

    fn quote(&mut self, blocks: &[Block]) {
        let indent = 28.0 * self.scale;
        let top = self.y;
        self.left += indent;
        self.width -= indent;
        self.blocks(blocks);
        self.left -= indent;
        self.width += indent;
        self.ui.painter().line_segment(
            [
                Pos2::new(self.left + 4.0 * self.scale, top),
                Pos2::new(self.left + 4.0 * self.scale, self.y),
            ],
            Stroke::new(5.0 * self.scale, self.theme.quote_bar),
        );
    }

    fn table(&mut self, headers: &[Vec<Inline>], rows: &[Vec<Vec<Inline>>]) {
        let columns = headers.len().max(1);
        let col_width = self.width / columns as f32;
        let size = self.theme.body_size * 0.8 * self.scale;
        let line = Theme::with_opacity(self.theme.foreground, 0.25);

        let all_rows = std::iter::once((headers, true)).chain(rows.iter().map(|r| (r.as_slice(), false)));
        for (cells, header) in all_rows {
            let mut row_height: f32 = 0.0;
            for (c, cell) in cells.iter().enumerate().take(columns) {
                let color = if header {
                    self.theme.heading_color
                } else {
                    self.theme.foreground
                };
                let (job, spans) = inlines_to_job(
                    cell,
                    self.data,
                    size,
                    color,
                    self.theme.accent,
                    col_width - 12.0 * self.scale,
                    header,
                );
                let pos = Pos2::new(self.left + c as f32 * col_width, self.y);
                let height = self.paint_job(job, &spans, pos, color);
                row_height = row_height.max(height);
            }
            self.y += row_height + 6.0 * self.scale;
            self.ui.painter().line_segment(
                [Pos2::new(self.left, self.y), Pos2::new(self.left + self.width, self.y)],
                Stroke::new(1.0, line),
            );
            self.y += 6.0 * self.scale;
        }
    }
}

/// Build a LayoutJob from inline elements, resolving interpolations. Also
/// returns the character ranges covered by `#go:` links.
fn inlines_to_job(
    inlines: &[Inline],
    data: &DataStore,
    font_size: f32,
    color: Color32,
    accent: Color32,
    max_width: f32,
    bold: bool,
) -> (egui::text::LayoutJob, Vec<GoSpan>) {
    let mut job = egui::text::LayoutJob::default();
    job.wrap.max_width = max_width;
    let style = Style {
        size: font_size,
        color,
        accent,
        bold,
        italic: false,
        strike: false,
    };
    let mut spans = Vec::new();
    append_inlines(&mut job, &mut spans, inlines, data, style);
    (job, spans)
}

/// Screen rectangles of the glyphs in `chars`, one per galley row.
fn span_rects(galley: &Galley, origin: Pos2, chars: &Range<usize>) -> Vec<Rect> {
    let mut rects = Vec::new();
    let mut offset = 0;
    for row in &galley.rows {
        let shift = origin.to_vec2() + row.pos.to_vec2();
        let covered = row
            .glyphs
            .iter()
            .enumerate()
            .filter(|(i, _)| chars.contains(&(offset + i)))
            .map(|(_, glyph)| glyph.logical_rect().translate(shift))
            .reduce(|a, b| a.union(b));
        rects.extend(covered);
        offset += row.char_count_including_newline();
    }
    rects
}

#[derive(Clone, Copy)]
struct Style {
    size: f32,
    color: Color32,
    accent: Color32,
    bold: bool,
    italic: bool,
    strike: bool,
}

impl Style {
    fn format(&self, family: FontFamily) -> egui::text::TextFormat {
        let size = if self.bold { self.size + 1.0 } else { self.size };
        egui::text::TextFormat {
            font_id: FontId::new(size, family),
            color: self.color,
            italics: self.italic,
            strikethrough: if self.strike {
                Stroke::new(1.0, self.color)
            } else {
                Stroke::NONE
            },
            ..Default::default()
        }
    }
}

fn append_inlines(
    job: &mut egui::text::LayoutJob,
    spans: &mut Vec<GoSpan>,
    inlines: &[Inline],
    data: &DataStore,
    style: Style,
) {
    for inline in inlines {
        match inline {
            Inline::Text(s) => job.append(s, 0.0, style.format(FontFamily::Proportional)),
            Inline::Interpolation(path) => job.append(
                &data.display(path),
                0.0,
                style.format(FontFamily::Proportional),
            ),
            Inline::Bold(children) => {
                append_inlines(job, spans, children, data, Style { bold: true, ..style });
            }
            Inline::Italic(children) => {
                append_inlines(job, spans, children, data, Style { italic: true, ..style });
            }
            Inline::Strikethrough(children) => {
                append_inlines(job, spans, children, data, Style { strike: true, ..style });
            }
            Inline::Code(s) => {
                let mut format = Style {
                    size: style.size * 0.85,
                    ..style
                }
                .format(FontFamily::Monospace);
                format.background = Color32::from_rgba_unmultiplied(128, 128, 128, 30);
                job.append(s, 0.0, format);
            }
            Inline::Link { text, url } => {
                let start = job.text.chars().count();
                let link_style = Style {
                    color: style.accent,
                    ..style
                };
                append_inlines(job, spans, text, data, link_style);
                if let Some(title) = url.strip_prefix(GO_PREFIX) {
                    spans.push(GoSpan {
                        chars: start..job.text.chars().count(),
                        title: title.to_string(),
                    });
                }
            }
            Inline::Image { alt, .. } => {
                let label = if alt.is_empty() { "[image]".to_string() } else { format!("[{alt}]") };
                job.append(&label, 0.0, Style { italic: true, ..style }.format(FontFamily::Proportional));
            }
            Inline::LineBreak => job.append("\n", 0.0, style.format(FontFamily::Proportional)),
            Inline::Html(_) => {}
        }
    }
}

/// Text shown in the window title for a slide.
pub fn slide_label(slide: &Slide, data: &DataStore) -> String {
    slide
        .title()
        .or_else(|| {
            slide.content.blocks().iter().find_map(|b| match b {
                Block::Heading { inlines, .. } => Some(inlines_to_text(inlines, Some(data))),
                _ => None,
            })
        })
        .unwrap_or_else(|| format!("Slide {}", slide.index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Deck;
    use crate::template::Template;

    fn paragraph(markdown: &str) -> Vec<Inline> {
        match &Template::compile(markdown).blocks()[0] {
            Block::Paragraph { inlines } => inlines.clone(),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    /// Render the first slide of `markdown` in a headless 1920x1080 context.
    fn render_targets(markdown: &str) -> Vec<GoTarget> {
        let mut data = DataStore::new();
        let deck = Deck::parse(markdown, &mut data).unwrap();
        let ctx = egui::Context::default();
        let input = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, egui::vec2(1920.0, 1080.0))),
            ..Default::default()
        };
        let mut targets = Vec::new();
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                let rect = ui.max_rect();
                targets = render_slide(ui, &deck.slides()[0], &data, &Theme::light(), rect, 1.0);
            });
        });
        targets
    }

    #[test]
    fn test_go_spans_cover_link_text_only() {
        let inlines = paragraph("See [the end](#go:Finale) or **[intro](#go:Intro)** or [web](https://x.y)");
        let (job, spans) = inlines_to_job(
            &inlines,
            &DataStore::new(),
            30.0,
            Color32::BLACK,
            Color32::RED,
            1000.0,
            false,
        );
        let text: Vec<char> = job.text.chars().collect();
        let covered: Vec<(String, &str)> = spans
            .iter()
            .map(|s| (text[s.chars.clone()].iter().collect(), s.title.as_str()))
            .collect();
        assert_eq!(
            covered,
            vec![("the end".to_string(), "Finale"), ("intro".to_string(), "Intro")]
        );
    }

    #[test]
    fn test_each_link_gets_its_own_region() {
        let targets = render_targets("[first](#go:A) and then [second](#go:B)");
        assert_eq!(targets.len(), 2);
        let (a, b) = (&targets[0], &targets[1]);
        assert_eq!(a.title, "A");
        assert_eq!(b.title, "B");
        assert_ne!(a.rect, b.rect);
        assert!(a.rect.right() <= b.rect.left());

        // The plain text between the links is not clickable
        let gap = Pos2::new((a.rect.right() + b.rect.left()) / 2.0, a.rect.center().y);
        assert!(!a.rect.contains(gap));
        assert!(!b.rect.contains(gap));
        assert!(a.rect.contains(a.rect.center()));
    }

    #[test]
    fn test_plain_paragraph_has_no_targets() {
        assert!(render_targets("no links [here](https://example.com)").is_empty());
    }

    #[test]
    fn test_slide_label_resolves_heading() {
        let mut data = DataStore::new();
        let deck = Deck::parse(
            "---\ndata:\n  who: Ada\n---\n# Hi {{ who }}\n---\nplain\n---\ntitle: Named\n---\n# Ignored",
            &mut data,
        )
        .unwrap();
        assert_eq!(slide_label(&deck.slides()[0], &data), "Hi Ada");
        assert_eq!(slide_label(&deck.slides()[1], &data), "Slide 2");
        assert_eq!(slide_label(&deck.slides()[2], &data), "Named");
    }
}
