use crate::{
    components::Component, data::snapshot::Snapshot, speedtest::SpeedTestResult, theme::Theme,
    utils,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Sparkline},
    Frame,
};
use std::collections::VecDeque;

const HISTORY_LEN: usize = 120;

pub enum SpeedTestStatus {
    Idle,
    Running,
    Finished(SpeedTestResult),
}

/// Connectivity, current throughput with recent history, and the last
/// speed test.
pub struct NetworkComponent {
    pub snapshot: Snapshot,
    pub theme: Theme,
    pub speed_test: SpeedTestStatus,
    upload_history: VecDeque<u64>,
    download_history: VecDeque<u64>,
}

impl NetworkComponent {
    pub fn new(snapshot: Snapshot, theme: Theme) -> Self {
        Self {
            snapshot,
            theme,
            speed_test: SpeedTestStatus::Idle,
            upload_history: VecDeque::with_capacity(HISTORY_LEN),
            download_history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// Takes a new snapshot and appends its rates to the history; an
    /// unavailable rate is drawn as zero.
    pub fn record(&mut self, snapshot: Snapshot) {
        Self::push_history_point(&mut self.upload_history, snapshot.upload_rate_kbs);
        Self::push_history_point(&mut self.download_history, snapshot.download_rate_kbs);
        self.snapshot = snapshot;
    }

    fn push_history_point(queue: &mut VecDeque<u64>, rate: Option<f64>) {
        if queue.len() == HISTORY_LEN {
            queue.pop_front();
        }
        queue.push_back(rate.unwrap_or(0.0).max(0.0).round() as u64);
    }

    fn speed_test_line(&self) -> Line<'_> {
        let palette = self.theme.palette();
        let (text, color) = match &self.speed_test {
            SpeedTestStatus::Idle => ("press [s] to run".to_string(), palette.muted),
            SpeedTestStatus::Running => ("Running...".to_string(), palette.warn),
            SpeedTestStatus::Finished(result @ Ok(_)) => {
                (utils::format_speed_test(result), palette.ok)
            }
            SpeedTestStatus::Finished(result @ Err(_)) => {
                (utils::format_speed_test(result), palette.critical)
            }
        };
        Line::from(vec![
            Span::styled("Speed test: ", self.theme.text_style()),
            Span::styled(text, Style::default().fg(color)),
        ])
    }

    fn render_history(
        &self,
        f: &mut Frame,
        area: Rect,
        title: &str,
        history: &VecDeque<u64>,
        color: Color,
    ) {
        let data: Vec<u64> = history.iter().copied().collect();
        // Show the newest points when the panel is narrower than the history.
        let visible = &data[data.len().saturating_sub(area.width as usize)..];
        let sparkline = Sparkline::default()
            .block(
                Block::default()
                    .title(Span::styled(title.to_string(), Style::default().fg(color)))
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(self.theme.palette().border)),
            )
            .data(visible)
            .style(Style::default().fg(color));
        f.render_widget(sparkline, area);
    }
}

impl Component for NetworkComponent {
    fn render_in_area(&self, f: &mut Frame, area: Rect) {
        let palette = self.theme.palette();
        let block = Block::default()
            .title(Span::styled(" Network ", self.theme.title_style()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(palette.border));
        f.render_widget(&block, area);
        let inner_area = block.inner(area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Summary lines
                Constraint::Min(0),    // Throughput history
            ])
            .split(inner_area);

        let status_color = if self.snapshot.network.is_connected() {
            palette.ok
        } else {
            palette.critical
        };
        let summary = vec![
            Line::from(vec![
                Span::styled("Status: ", self.theme.text_style()),
                Span::styled(
                    utils::format_network(&self.snapshot.network),
                    Style::default().fg(status_color),
                ),
            ]),
            Line::from(vec![
                Span::styled("Up: ", self.theme.text_style()),
                Span::styled(
                    utils::format_rate(self.snapshot.upload_rate_kbs),
                    Style::default().fg(palette.upload),
                ),
                Span::raw("   "),
                Span::styled("Down: ", self.theme.text_style()),
                Span::styled(
                    utils::format_rate(self.snapshot.download_rate_kbs),
                    Style::default().fg(palette.download),
                ),
            ]),
            self.speed_test_line(),
        ];
        f.render_widget(Paragraph::new(summary), chunks[0]);

        let graphs = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);
        self.render_history(f, graphs[0], " Up KB/s ", &self.upload_history, palette.upload);
        self.render_history(
            f,
            graphs[1],
            " Down KB/s ",
            &self.download_history,
            palette.download,
        );
    }

    fn set_theme(&mut self, theme: &Theme) {
        self.theme = theme.clone();
    }
}
