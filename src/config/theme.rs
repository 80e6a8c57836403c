//! Progress panel colors from the `[theme]` table.

use crate::utils::parse_color;

use ratatui::style::{Color, Style};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Theme {
    accent: String,
    gauge: String,
    error: String,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            accent: "cyan".into(),
            gauge: "green".into(),
            error: "red".into(),
        }
    }
}

impl Theme {
    #[inline]
    pub fn accent(&self) -> Color {
        parse_color(&self.accent)
    }

    #[inline]
    pub fn gauge(&self) -> Color {
        parse_color(&self.gauge)
    }

    #[inline]
    pub fn error(&self) -> Color {
        parse_color(&self.error)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent())
    }
}
