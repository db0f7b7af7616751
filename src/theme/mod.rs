use crate::data::snapshot::ColorScheme;
use ratatui::style::{Color, Modifier, Style};

/// Colors for each role the dashboard draws with.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub text: Color,
    pub muted: Color,
    pub panel: Color,
    pub border: Color,
    pub accent: Color,
    pub ok: Color,
    pub warn: Color,
    pub critical: Color,
    pub upload: Color,
    pub download: Color,
}

const GRAPHITE: Palette = Palette {
    text: Color::Rgb(228, 236, 245),
    muted: Color::Rgb(140, 158, 182),
    panel: Color::Rgb(29, 41, 58),
    border: Color::Rgb(58, 74, 97),
    accent: Color::Rgb(94, 213, 221),
    ok: Color::Rgb(108, 212, 149),
    warn: Color::Rgb(243, 197, 109),
    critical: Color::Rgb(241, 126, 126),
    upload: Color::Rgb(198, 157, 255),
    download: Color::Rgb(126, 170, 255),
};

const MIDNIGHT: Palette = Palette {
    text: Color::Rgb(230, 237, 247),
    muted: Color::Rgb(124, 143, 171),
    panel: Color::Rgb(20, 28, 45),
    border: Color::Rgb(44, 58, 86),
    accent: Color::Rgb(93, 204, 226),
    ok: Color::Rgb(116, 215, 155),
    warn: Color::Rgb(247, 204, 117),
    critical: Color::Rgb(244, 130, 130),
    upload: Color::Rgb(200, 151, 255),
    download: Color::Rgb(106, 158, 255),
};

const NORD: Palette = Palette {
    text: Color::Rgb(229, 233, 240),
    muted: Color::Rgb(129, 161, 193),
    panel: Color::Rgb(59, 66, 82),
    border: Color::Rgb(76, 86, 106),
    accent: Color::Rgb(136, 192, 208),
    ok: Color::Rgb(163, 190, 140),
    warn: Color::Rgb(235, 203, 139),
    critical: Color::Rgb(191, 97, 106),
    upload: Color::Rgb(180, 142, 173),
    download: Color::Rgb(129, 161, 193),
};

const GRUVBOX: Palette = Palette {
    text: Color::Rgb(235, 219, 178),
    muted: Color::Rgb(168, 153, 132),
    panel: Color::Rgb(60, 56, 54),
    border: Color::Rgb(80, 73, 69),
    accent: Color::Rgb(142, 192, 124),
    ok: Color::Rgb(184, 187, 38),
    warn: Color::Rgb(250, 189, 47),
    critical: Color::Rgb(251, 73, 52),
    upload: Color::Rgb(211, 134, 155),
    download: Color::Rgb(131, 165, 152),
};

#[derive(Debug, Clone)]
pub struct Theme {
    pub color_scheme: ColorScheme,
    palette: Palette,
}

impl Theme {
    pub fn new(color_scheme: ColorScheme) -> Self {
        let palette = match color_scheme {
            ColorScheme::Default => GRAPHITE,
            ColorScheme::Dark => MIDNIGHT,
            ColorScheme::Nord => NORD,
            ColorScheme::Gruvbox => GRUVBOX,
        };
        Self {
            color_scheme,
            palette,
        }
    }

    pub fn cycle() -> &'static [ColorScheme] {
        &[
            ColorScheme::Default,
            ColorScheme::Dark,
            ColorScheme::Nord,
            ColorScheme::Gruvbox,
        ]
    }

    pub fn next(&self) -> Self {
        let cycle = Self::cycle();
        let idx = cycle
            .iter()
            .position(|scheme| *scheme == self.color_scheme)
            .unwrap_or(0);
        Self::new(cycle[(idx + 1) % cycle.len()])
    }

    pub fn name(&self) -> &'static str {
        match self.color_scheme {
            ColorScheme::Default => "Graphite",
            ColorScheme::Dark => "Midnight",
            ColorScheme::Nord => "Nord",
            ColorScheme::Gruvbox => "Gruvbox",
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Green up to 50%, yellow up to 80%, red beyond.
    pub fn level_color(&self, percent: f64) -> Color {
        if percent <= 50.0 {
            self.palette.ok
        } else if percent <= 80.0 {
            self.palette.warn
        } else {
            self.palette.critical
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycling_visits_every_scheme_and_wraps() {
        let mut theme = Theme::new(ColorScheme::Default);
        let mut seen = vec![theme.color_scheme];
        for _ in 0..Theme::cycle().len() {
            theme = theme.next();
            seen.push(theme.color_scheme);
        }
        assert_eq!(&seen[..4], Theme::cycle());
        assert_eq!(seen[4], ColorScheme::Default);
    }

    #[test]
    fn level_color_thresholds() {
        let theme = Theme::new(ColorScheme::Nord);
        assert_eq!(theme.level_color(12.0), NORD.ok);
        assert_eq!(theme.level_color(65.0), NORD.warn);
        assert_eq!(theme.level_color(93.0), NORD.critical);
    }
}
