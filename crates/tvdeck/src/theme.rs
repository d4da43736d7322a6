use eframe::egui::Color32;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub background: Color32,
    pub foreground: Color32,
    pub heading_color: Color32,
    pub accent: Color32,
    pub card_background: Color32,
    pub card_foreground: Color32,
    pub warning: Color32,
    pub title_size: f32,
    pub subtitle_size: f32,
    pub kpi_value_size: f32,
    pub body_size: f32,
    pub small_size: f32,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            background: Color32::from_rgb(0x12, 0x16, 0x1C),
            foreground: Color32::from_rgb(0xC8, 0xCC, 0xD2),
            heading_color: Color32::WHITE,
            accent: Color32::from_rgb(0x52, 0x94, 0xE2),
            card_background: Color32::from_rgb(0x1F, 0x25, 0x2D),
            card_foreground: Color32::from_rgb(0xDD, 0xE1, 0xE6),
            warning: Color32::from_rgb(0xE8, 0xA8, 0x38),
            title_size: 64.0,
            subtitle_size: 32.0,
            kpi_value_size: 56.0,
            body_size: 26.0,
            small_size: 18.0,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            background: Color32::WHITE,
            foreground: Color32::from_rgb(0x1A, 0x1A, 0x2E),
            heading_color: Color32::from_rgb(0x16, 0x21, 0x3E),
            accent: Color32::from_rgb(0x0F, 0x34, 0x60),
            card_background: Color32::from_rgb(0xF0, 0xF2, 0xF5),
            card_foreground: Color32::from_rgb(0x33, 0x33, 0x33),
            warning: Color32::from_rgb(0xB8, 0x7B, 0x0A),
            title_size: 64.0,
            subtitle_size: 32.0,
            kpi_value_size: 56.0,
            body_size: 26.0,
            small_size: 18.0,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Apply opacity to a color
    pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
        Color32::from_rgba_unmultiplied(
            color.r(),
            color.g(),
            color.b(),
            (opacity.clamp(0.0, 1.0) * 255.0) as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_defaults_to_dark() {
        assert_eq!(Theme::from_name("light").name, "light");
        assert_eq!(Theme::from_name("dark").name, "dark");
        assert_eq!(Theme::from_name("solarized").name, "dark");
    }

    #[test]
    fn test_with_opacity_clamps() {
        let c = Theme::with_opacity(Color32::from_rgb(10, 20, 30), 1.5);
        assert_eq!(c.a(), 255);
        let c = Theme::with_opacity(Color32::from_rgb(10, 20, 30), -1.0);
        assert_eq!(c.a(), 0);
    }
}
