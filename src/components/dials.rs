use crate::{components::Component, data::snapshot::Snapshot, theme::Theme, utils};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::Span,
    widgets::{Block, BorderType, Borders, Gauge},
    Frame,
};

/// CPU, RAM, temperature and disk as a row of 0-100 gauges.
pub struct DialsComponent {
    pub snapshot: Snapshot,
    pub theme: Theme,
}

impl DialsComponent {
    pub fn new(snapshot: Snapshot, theme: Theme) -> Self {
        Self { snapshot, theme }
    }

    fn render_dial(
        &self,
        f: &mut Frame,
        area: Rect,
        title: &str,
        value: Option<f64>,
        label: String,
    ) {
        let palette = self.theme.palette();
        let value = value.filter(|v| v.is_finite());
        let ratio = value.map_or(0.0, |v| (v / 100.0).clamp(0.0, 1.0));
        let color = value.map_or(palette.muted, |v| self.theme.level_color(v));

        let block = Block::default()
            .title(Span::styled(format!(" {} ", title), self.theme.title_style()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(palette.border));
        let gauge = Gauge::default()
            .block(block)
            .gauge_style(Style::default().fg(color).bg(palette.panel))
            .ratio(ratio)
            .label(Span::styled(label, self.theme.text_style()));
        f.render_widget(gauge, area);
    }
}

impl Component for DialsComponent {
    fn render_in_area(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(area);

        let s = &self.snapshot;
        let dials = [
            ("CPU", s.cpu_percent, utils::format_percent(s.cpu_percent)),
            ("RAM", s.memory_percent, utils::format_percent(s.memory_percent)),
            (
                "Temp",
                s.temperature_celsius,
                utils::format_celsius(s.temperature_celsius),
            ),
            ("Disk", s.disk_percent, utils::format_percent(s.disk_percent)),
        ];
        for ((title, value, label), chunk) in dials.into_iter().zip(chunks.iter()) {
            self.render_dial(f, *chunk, title, value, label);
        }
    }

    fn set_theme(&mut self, theme: &Theme) {
        self.theme = theme.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::render_to_text;
    use crate::data::snapshot::ColorScheme;
    use chrono::Utc;

    #[test]
    fn renders_values_and_placeholders() {
        let mut snapshot = Snapshot::empty(Utc::now());
        snapshot.cpu_percent = Some(37.5);
        snapshot.memory_percent = Some(62.0);
        let dials = DialsComponent::new(snapshot, Theme::new(ColorScheme::Default));

        let text = render_to_text(&dials, 100, 3);

        assert!(text.contains("CPU"));
        assert!(text.contains("37.5%"));
        assert!(text.contains("62.0%"));
        assert!(text.contains("N/A"));
    }
}
