use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::loader::{Fetcher, Resolution, Source, source_from_arg};
use crate::navigator::KeyState;
use crate::render;
use crate::session::Session;
use crate::theme::Theme;

struct Toast {
    message: String,
    start: Instant,
}

impl Toast {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            start: Instant::now(),
        }
    }

    fn opacity(&self) -> f32 {
        let elapsed = self.start.elapsed().as_secs_f32();
        if elapsed < 1.5 {
            1.0
        } else {
            (1.0 - (elapsed - 1.5) / 0.5).max(0.0)
        }
    }

    fn is_expired(&self) -> bool {
        self.start.elapsed().as_secs_f32() >= 2.0
    }
}

struct DeckApp {
    session: Session,
    fetcher: Fetcher,
    theme: Theme,
    /// Mirror of the session text that the editor widget mutates.
    editor_text: String,
    /// Slide to jump to once the first load lands.
    start_slide: Option<usize>,
    load_error: Option<String>,
    toast: Option<Toast>,
    title: String,
}

impl DeckApp {
    fn new(session: Session, fetcher: Fetcher, theme: Theme, start_slide: Option<usize>) -> Self {
        Self {
            editor_text: session.text().to_string(),
            session,
            fetcher,
            theme,
            start_slide,
            load_error: None,
            toast: None,
            title: String::new(),
        }
    }

    fn poll_fetches(&mut self) {
        for fetched in self.fetcher.drain() {
            match self.session.apply_fetch(fetched.ticket, fetched.result) {
                Ok(Resolution::Stale) => {}
                Ok(resolution) => {
                    self.load_error = None;
                    self.editor_text = self.session.text().to_string();
                    if resolution == Resolution::RestoredEdits {
                        self.toast = Some(Toast::new("Restored saved edits"));
                    }
                    if let Some(n) = self.start_slide.take() {
                        let jumped = self.session.jump(n.saturating_sub(1));
                        self.report(jumped);
                    }
                }
                Err(e) => {
                    warn!("load failed: {e}");
                    self.load_error = Some(e.to_string());
                }
            }
        }
    }

    fn reset(&mut self) {
        let ticket = self.session.begin_reset();
        self.fetcher.spawn(ticket);
        self.toast = Some(Toast::new(format!(
            "Reloading {}",
            self.fetcher.source().describe()
        )));
    }

    fn save(&mut self) {
        match self.session.save() {
            Ok(()) => self.toast = Some(Toast::new("Saved")),
            Err(e) => {
                warn!("save failed: {e}");
                self.toast = Some(Toast::new(format!("Save failed: {e}")));
            }
        }
    }

    /// Surface storage failures from navigation without interrupting it.
    fn report<T>(&mut self, result: anyhow::Result<T>) {
        if let Err(e) = result {
            warn!("{e}");
            self.toast = Some(Toast::new(e.to_string()));
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) -> Vec<egui::ViewportCommand> {
        let mut viewport_cmds = Vec::new();
        let typing = ctx.wants_keyboard_input();

        let (state, quit, toggle, escape) = ctx.input(|i| {
            let state = if typing {
                KeyState::default()
            } else {
                KeyState {
                    shift: i.modifiers.shift,
                    left: i.key_down(egui::Key::ArrowLeft),
                    right: i.key_down(egui::Key::ArrowRight),
                }
            };
            (
                state,
                !typing && i.key_pressed(egui::Key::Q),
                !typing && i.key_pressed(egui::Key::E),
                i.key_pressed(egui::Key::Escape),
            )
        });

        if quit {
            viewport_cmds.push(egui::ViewportCommand::Close);
        }
        if toggle {
            let r = self.session.toggle_edit();
            self.report(r);
        } else if escape && self.session.editing() {
            let r = self.session.set_editing(false);
            self.report(r);
        }
        let moved = self.session.on_keys(state);
        self.report(moved);
        viewport_cmds
    }

    fn update_title(&mut self, ctx: &egui::Context) {
        let title = match self.session.current_slide() {
            Some(slide) => format!(
                "{} · deckpad",
                render::slide_label(slide, self.session.data())
            ),
            None => "deckpad".to_string(),
        };
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }
    }

    fn editor_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("editor")
            .resizable(true)
            .default_width(480.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    let dirty = self.session.is_dirty();
                    if ui.add_enabled(dirty, egui::Button::new("Save")).clicked() {
                        self.save();
                    }
                    if ui
                        .add_enabled(!self.session.is_loading(), egui::Button::new("Reset"))
                        .on_hover_text("Discard edits and reload the original source")
                        .clicked()
                    {
                        self.reset();
                    }
                    if dirty {
                        ui.weak("unsaved changes");
                    }
                });
                ui.separator();

                if self.session.is_loading() {
                    ui.weak(format!("Loading {}…", self.fetcher.source().describe()));
                } else if let Some(err) = &self.load_error {
                    let color = ui.visuals().error_fg_color;
                    ui.colored_label(color, err.as_str());
                } else if let Some(err) = self.session.parse_error() {
                    let color = ui.visuals().warn_fg_color;
                    ui.colored_label(color, err.to_string());
                } else {
                    ui.weak(format!("{} slides", self.session.deck().len()));
                }
                ui.separator();

                egui::ScrollArea::vertical().show(ui, |ui| {
                    let response = ui.add(
                        egui::TextEdit::multiline(&mut self.editor_text)
                            .code_editor()
                            .desired_width(f32::INFINITY)
                            .desired_rows(40),
                    );
                    if response.changed() {
                        self.session.edit(&self.editor_text);
                    }
                });
            });
    }

    fn controls_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let len = self.session.deck().len();
                let index = self.session.index();

                if ui.add_enabled(index > 0, egui::Button::new("◀")).clicked() {
                    let r = self.session.prev();
                    self.report(r);
                }
                let counter = if len == 0 {
                    "0 / 0".to_string()
                } else {
                    format!("{} / {}", index + 1, len)
                };
                ui.monospace(counter);
                if ui
                    .add_enabled(index + 1 < len, egui::Button::new("▶"))
                    .clicked()
                {
                    let r = self.session.next();
                    self.report(r);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let mut editing = self.session.editing();
                    if ui.toggle_value(&mut editing, "Edit").changed() {
                        let r = self.session.set_editing(editing);
                        self.report(r);
                    }
                });
            });
        });
    }

    fn slide_panel(&mut self, ctx: &egui::Context) {
        let theme = match self.session.current_slide() {
            Some(slide) => self.theme.for_slide(slide),
            None => self.theme.clone(),
        };

        let mut go_to: Option<String> = None;
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(theme.background).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let scale = (rect.width() / 1920.0).min(rect.height() / 1080.0);

                let Some(slide) = self.session.current_slide() else {
                    let message = if self.session.is_loading() {
                        "Loading…".to_string()
                    } else if let Some(err) = &self.load_error {
                        err.clone()
                    } else if self.session.parse_error().is_some() {
                        "The deck has errors. Open the editor to fix them.".to_string()
                    } else {
                        "No slides".to_string()
                    };
                    ui.painter().text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        message,
                        egui::FontId::proportional(24.0),
                        Theme::with_opacity(theme.foreground, 0.6),
                    );
                    return;
                };

                let targets =
                    render::render_slide(ui, slide, self.session.data(), &theme, rect, scale);
                let response = ui.interact(rect, ui.id().with("slide"), egui::Sense::click());
                if response.clicked() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        go_to = targets
                            .into_iter()
                            .find(|t| t.rect.contains(pos))
                            .map(|t| t.title);
                    }
                }

                if let Some(toast) = &self.toast {
                    let color = Theme::with_opacity(theme.foreground, toast.opacity() * 0.9);
                    ui.painter().text(
                        rect.right_bottom() - egui::vec2(16.0, 16.0),
                        egui::Align2::RIGHT_BOTTOM,
                        &toast.message,
                        egui::FontId::proportional(18.0),
                        color,
                    );
                }
            });

        if let Some(title) = go_to {
            match self.session.go(&title) {
                Ok(true) => {}
                Ok(false) => self.toast = Some(Toast::new(format!("No slide titled \"{title}\""))),
                Err(e) => self.report::<()>(Err(e)),
            }
        }
    }
}

impl eframe::App for DeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_fetches();

        // Send viewport commands after the input closure to avoid holding the
        // input lock
        let viewport_cmds = self.handle_input(ctx);
        for cmd in viewport_cmds {
            ctx.send_viewport_cmd(cmd);
        }

        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }

        if self.session.editing() {
            self.editor_panel(ctx);
        }
        self.controls_panel(ctx);
        self.slide_panel(ctx);
        self.update_title(ctx);

        if self.session.is_loading() || self.toast.is_some() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

pub fn run(
    source: Option<&str>,
    windowed: bool,
    edit: bool,
    start_slide: Option<usize>,
) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let source: Arc<dyn Source> = source_from_arg(&config.resolve_source(source));
    let storage = crate::commands::open_storage(&config, &source.describe())?;
    info!("opening {} (state in {})", source.describe(), storage.path().display());

    let mut session = Session::new(Box::new(storage));
    if edit {
        session.set_editing(true)?;
    }

    let fetcher = Fetcher::new(source);
    fetcher.spawn(session.begin_load());

    let theme = Theme::from_name(config.theme());
    debug!(theme = %theme.name, "base theme");
    let title = "deckpad";
    let viewport = if windowed {
        egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(title)
    } else {
        egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title(title)
    };

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        title,
        options,
        Box::new(move |_cc| Ok(Box::new(DeckApp::new(session, fetcher, theme, start_slide)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
