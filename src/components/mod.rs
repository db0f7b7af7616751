use crate::theme::Theme;
use ratatui::{layout::Rect, Frame};

pub mod dials;
pub mod network;

/// A dashboard panel that draws itself from the snapshot it was last given.
pub trait Component {
    fn render_in_area(&self, f: &mut Frame, area: Rect);

    fn set_theme(&mut self, theme: &Theme);
}

#[cfg(test)]
pub(crate) fn render_to_text(component: &dyn Component, width: u16, height: u16) -> String {
    use ratatui::{backend::TestBackend, Terminal};

    let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    terminal
        .draw(|f| component.render_in_area(f, f.area()))
        .unwrap();
    terminal
        .backend()
        .buffer()
        .content
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}
