use crate::styled::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Sepia,
}

/// Chrome colors of the paginated output. Syntax colors come from the
/// highlighter and are not affected by the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb,
    pub foreground: Rgb,
    pub header_background: Rgb,
    pub header_foreground: Rgb,
    pub gutter: Rgb,
    pub accent: Rgb,
    pub muted: Rgb,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Light, Theme::Dark, Theme::Sepia];

    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                background: Rgb::new(255, 255, 255),
                foreground: Rgb::new(36, 41, 47),
                header_background: Rgb::new(242, 244, 247),
                header_foreground: Rgb::new(87, 96, 106),
                gutter: Rgb::new(140, 149, 159),
                accent: Rgb::new(9, 105, 218),
                muted: Rgb::new(110, 119, 129),
            },
            Theme::Dark => Palette {
                background: Rgb::new(30, 30, 36),
                foreground: Rgb::new(220, 223, 228),
                header_background: Rgb::new(45, 47, 56),
                header_foreground: Rgb::new(171, 178, 191),
                gutter: Rgb::new(99, 109, 131),
                accent: Rgb::new(97, 175, 239),
                muted: Rgb::new(140, 146, 160),
            },
            Theme::Sepia => Palette {
                background: Rgb::new(251, 245, 233),
                foreground: Rgb::new(67, 52, 34),
                header_background: Rgb::new(240, 228, 206),
                header_foreground: Rgb::new(112, 90, 60),
                gutter: Rgb::new(165, 140, 105),
                accent: Rgb::new(156, 84, 28),
                muted: Rgb::new(130, 110, 85),
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Sepia => "sepia",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown theme '{}' (expected light, dark or sepia)", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_theme_names_case_insensitively() {
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!(" sepia ".parse::<Theme>(), Ok(Theme::Sepia));
        assert!("neon".parse::<Theme>().is_err());
    }

    #[test]
    fn themes_differ_in_background() {
        let backgrounds: Vec<_> = Theme::ALL.iter().map(|t| t.palette().background).collect();
        assert_ne!(backgrounds[0], backgrounds[1]);
        assert_ne!(backgrounds[1], backgrounds[2]);
    }
}
