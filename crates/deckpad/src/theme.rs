use eframe::egui::Color32;

use crate::deck::Slide;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub background: Color32,
    pub foreground: Color32,
    pub heading_color: Color32,
    pub accent: Color32,
    pub quote_bar: Color32,
    pub code_background: Color32,
    pub code_foreground: Color32,
    pub h1_size: f32,
    pub h2_size: f32,
    pub h3_size: f32,
    pub body_size: f32,
    pub code_size: f32,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            background: Color32::from_rgb(0x11, 0x18, 0x27),
            foreground: Color32::from_rgb(0xD1, 0xD5, 0xDB),
            heading_color: Color32::WHITE,
            accent: Color32::from_rgb(0xF5, 0x9E, 0x0B),
            quote_bar: Color32::from_rgb(0xFA, 0xCC, 0x15),
            code_background: Color32::from_rgb(0x1F, 0x29, 0x37),
            code_foreground: Color32::from_rgb(0xE5, 0xE7, 0xEB),
            h1_size: 72.0,
            h2_size: 52.0,
            h3_size: 40.0,
            body_size: 30.0,
            code_size: 24.0,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            background: Color32::WHITE,
            foreground: Color32::from_rgb(0x1F, 0x29, 0x37),
            heading_color: Color32::from_rgb(0x11, 0x18, 0x27),
            accent: Color32::from_rgb(0xD9, 0x77, 0x06),
            quote_bar: Color32::from_rgb(0xFA, 0xCC, 0x15),
            code_background: Color32::from_rgb(0xF3, 0xF4, 0xF6),
            code_foreground: Color32::from_rgb(0x37, 0x41, 0x51),
            h1_size: 72.0,
            h2_size: 52.0,
            h3_size: 40.0,
            body_size: 30.0,
            code_size: 24.0,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "dark" => Self::dark(),
            _ => Self::light(),
        }
    }

    /// The theme a slide asks for through a `dark` or `light` class, falling
    /// back to `self`. The slide's own class wins over the global one.
    pub fn for_slide(&self, slide: &Slide) -> Self {
        match slide
            .classes()
            .iter()
            .rev()
            .find(|c| *c == "dark" || *c == "light")
        {
            Some(name) => Self::from_name(name),
            None => self.clone(),
        }
    }

    /// Apply opacity to a color
    pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
        Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), (opacity * 255.0) as u8)
    }

    pub fn heading_size(&self, level: u8) -> f32 {
        match level {
            1 => self.h1_size,
            2 => self.h2_size,
            3 => self.h3_size,
            _ => self.body_size,
        }
    }
}
