use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eframe::egui;
use tracing::{info, warn};

use super::open_session;
use crate::data::DataStore;
use crate::deck::Deck;
use crate::render;
use crate::template::html::escape;
use crate::theme::Theme;

const STYLE: &str = "\
body{margin:0;font-family:system-ui,sans-serif}\n\
section{box-sizing:border-box;min-height:100vh;padding:4rem;border-bottom:1px solid #ddd}\n\
section.dark{background:#111827;color:#d1d5db}\n\
section.dark h1,section.dark h2,section.dark h3{color:#fff}\n\
pre{background:rgba(128,128,128,.12);padding:1rem;border-radius:6px}\n\
blockquote{border-left:5px solid #facc15;margin-left:0;padding-left:1.5rem}\n";

/// Render the whole deck as one standalone HTML document.
pub fn deck_to_html(deck: &Deck, data: &DataStore, title: &str) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape(title)));
    out.push_str(&format!("<style>\n{STYLE}</style>\n</head>\n<body>\n"));

    for slide in deck.slides() {
        let mut classes = vec!["slide".to_string()];
        classes.extend(slide.classes());
        out.push_str(&format!(
            "<section id=\"slide-{}\" class=\"{}\">\n",
            slide.index + 1,
            escape(&classes.join(" "))
        ));
        out.push_str(&slide.content.render_html(data));
        out.push_str("</section>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

pub fn run_html(source: Option<&str>, output_dir: PathBuf) -> Result<()> {
    let (_, session) = open_session(source, false)?;
    if session.deck().is_empty() {
        anyhow::bail!("No slides found");
    }

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let title = session
        .deck()
        .get(0)
        .map(|s| render::slide_label(s, session.data()))
        .unwrap_or_else(|| "deckpad".to_string());
    let html = deck_to_html(session.deck(), session.data(), &title);

    let path = output_dir.join("index.html");
    std::fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Exported {} slides to {}", session.deck().len(), path.display());
    Ok(())
}

struct ExportApp {
    deck: Deck,
    data: DataStore,
    theme: Theme,
    output_dir: PathBuf,
    current_slide: usize,
    screenshot_requested: bool,
    done: bool,
}

impl eframe::App for ExportApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.done {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        // The screenshot of the previous frame arrives as an event
        let mut got_screenshot = false;
        ctx.input(|i| {
            for event in &i.events {
                if let egui::Event::Screenshot { image, .. } = event {
                    let filename = format!("slide-{:02}.png", self.current_slide + 1);
                    let path = self.output_dir.join(&filename);
                    match save_color_image(image, &path) {
                        Ok(()) => info!("saved {filename}"),
                        Err(e) => warn!("failed to save {}: {e}", path.display()),
                    }
                    got_screenshot = true;
                }
            }
        });

        if got_screenshot {
            self.screenshot_requested = false;
            self.current_slide += 1;
            if self.current_slide >= self.deck.len() {
                self.done = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                return;
            }
        }

        let Some(slide) = self.deck.get(self.current_slide) else {
            return;
        };
        let theme = self.theme.for_slide(slide);

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(theme.background).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let scale = (rect.width() / 1920.0).min(rect.height() / 1080.0);
                render::render_slide(ui, slide, &self.data, &theme, rect, scale);
            });

        if !self.screenshot_requested {
            ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot(egui::UserData::default()));
            self.screenshot_requested = true;
        }

        ctx.request_repaint();
    }
}

fn save_color_image(image: &egui::ColorImage, path: &Path) -> image::ImageResult<()> {
    let width = image.width() as u32;
    let height = image.height() as u32;
    let pixels: Vec<u8> = image
        .pixels
        .iter()
        .flat_map(|c| [c.r(), c.g(), c.b(), c.a()])
        .collect();

    image::save_buffer(path, &pixels, width, height, image::ColorType::Rgba8)
}

pub fn run_png(source: Option<&str>, output_dir: PathBuf, width: u32, height: u32) -> Result<()> {
    let (config, session) = open_session(source, false)?;
    if session.deck().is_empty() {
        anyhow::bail!("No slides found");
    }

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    eprintln!(
        "Exporting {} slides to {} ({}x{})",
        session.deck().len(),
        output_dir.display(),
        width,
        height,
    );

    let title = "deckpad export";
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([width as f32, height as f32])
        .with_title(title)
        .with_decorations(false);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let app = ExportApp {
        deck: session.deck().clone(),
        data: session.data().clone(),
        theme: Theme::from_name(config.theme()),
        output_dir,
        current_slide: 0,
        screenshot_requested: false,
        done: false,
    };

    eframe::run_native(title, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    eprintln!("Export complete.");
    Ok(())
}
