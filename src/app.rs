use crate::{
    action::Action,
    components::{
        dials::DialsComponent,
        network::{NetworkComponent, SpeedTestStatus},
        Component,
    },
    config::AppConfig,
    data::{collector::SystemCollector, engine::SampleEngine, snapshot::Snapshot, DataManager},
    speedtest::{SpeedTestResult, SpeedTestRunner, SpeedTestTask},
    theme::Theme,
    tui::Tui,
    utils,
};
use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};
use log::{info, warn};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const FRAME_DURATION: Duration = Duration::from_millis(100);

pub struct App {
    pub should_quit: bool,
    tui: Tui,
    config: AppConfig,
    theme: Theme,
    hostname: String,
    snapshot: Snapshot,
    dials: DialsComponent,
    network: NetworkComponent,
    runner: Arc<SpeedTestRunner>,
    speed_test: Option<SpeedTestTask>,
    speed_tx: mpsc::UnboundedSender<SpeedTestResult>,
    speed_rx: mpsc::UnboundedReceiver<SpeedTestResult>,
}

impl App {
    pub fn new(
        config: AppConfig,
        runner: SpeedTestRunner,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let tui = Tui::new()?;
        let theme = Theme::new(config.color_scheme);
        let snapshot = Snapshot::empty(chrono::Utc::now());
        let (speed_tx, speed_rx) = mpsc::unbounded_channel();

        Ok(Self {
            should_quit: false,
            tui,
            hostname: hostname::get()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            dials: DialsComponent::new(snapshot.clone(), theme.clone()),
            network: NetworkComponent::new(snapshot.clone(), theme.clone()),
            snapshot,
            theme,
            config,
            runner: Arc::new(runner),
            speed_test: None,
            speed_tx,
            speed_rx,
        })
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (snapshot_tx, mut snapshot_rx) = mpsc::unbounded_channel::<Snapshot>();

        // The engine takes its network baseline here, one interval before the first tick.
        let engine = SampleEngine::new(SystemCollector::new(), self.config.disk_path.clone());
        let mut data_manager = DataManager::new(engine, self.config.interval_ms);
        let sampler = tokio::spawn(async move {
            data_manager.start_polling(snapshot_tx, None).await;
        });

        loop {
            while let Ok(snapshot) = snapshot_rx.try_recv() {
                self.apply_snapshot(snapshot);
            }
            // A speed test result can land at any point between ticks.
            while let Ok(result) = self.speed_rx.try_recv() {
                self.speed_test = None;
                self.network.speed_test = SpeedTestStatus::Finished(result);
            }

            self.draw_frame()?;

            if crossterm::event::poll(FRAME_DURATION)? {
                match crossterm::event::read()? {
                    CrosstermEvent::Key(key) => {
                        // Ignore key release events to avoid double-handling keys like Esc.
                        if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                            if let Some(action) = Self::handle_key_event(key) {
                                self.handle_action(action);
                            }
                        }
                    }
                    CrosstermEvent::Resize(width, height) => {
                        self.tui.resize(width, height)?;
                    }
                    _ => {}
                }
            } else {
                tokio::task::yield_now().await;
            }

            if self.should_quit {
                break;
            }
        }

        sampler.abort();
        self.speed_test = None;
        self.tui.exit()?;
        Ok(())
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.dials.snapshot = snapshot.clone();
        self.network.record(snapshot.clone());
        self.snapshot = snapshot;
    }

    fn handle_key_event(key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('s') => Some(Action::RunSpeedTest),
            KeyCode::Char('c') => Some(Action::CancelSpeedTest),
            KeyCode::Char('t') => Some(Action::SwitchTheme),
            KeyCode::Char('w') => Some(Action::SaveConfig),
            _ => None,
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::RunSpeedTest => {
                if self.speed_test.is_some() {
                    info!("speed test already running, ignoring request");
                    return;
                }
                self.speed_test = Some(SpeedTestTask::spawn(
                    Arc::clone(&self.runner),
                    Duration::from_secs(self.config.speedtest.timeout_secs),
                    self.speed_tx.clone(),
                ));
                self.network.speed_test = SpeedTestStatus::Running;
            }
            Action::CancelSpeedTest => {
                // The task still reports `Cancelled` through the channel.
                if let Some(task) = &self.speed_test {
                    task.cancel();
                }
            }
            Action::SwitchTheme => {
                self.theme = self.theme.next();
                self.dials.set_theme(&self.theme);
                self.network.set_theme(&self.theme);
                self.save_config();
            }
            Action::SaveConfig => self.save_config(),
        }
    }

    fn save_config(&mut self) {
        self.config.color_scheme = self.theme.color_scheme;
        if let Err(err) = self.config.save() {
            warn!("could not save config: {}", err);
        }
    }

    fn draw_frame(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let status = self.status_line();
        let keybinds = self.keybinds_line();
        let theme = &self.theme;
        let dials = &self.dials;
        let network = &self.network;

        self.tui.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1), // Status line
                    Constraint::Length(3), // Dials
                    Constraint::Min(0),    // Network
                    Constraint::Length(1), // Keybinds
                ])
                .split(f.area());

            Self::render_bar(f, chunks[0], status, theme);
            dials.render_in_area(f, chunks[1]);
            network.render_in_area(f, chunks[2]);
            Self::render_bar(f, chunks[3], keybinds, theme);
        })
    }

    fn render_bar(f: &mut Frame, area: Rect, line: Line<'static>, theme: &Theme) {
        let bar = Paragraph::new(line).style(
            Style::default()
                .fg(theme.palette().text)
                .bg(theme.palette().panel),
        );
        f.render_widget(bar, area);
    }

    fn status_line(&self) -> Line<'static> {
        let palette = self.theme.palette();
        let current_time = chrono::Local::now().format("%H:%M:%S").to_string();
        let uptime = self
            .snapshot
            .uptime
            .map_or_else(|| utils::UNAVAILABLE.to_string(), utils::format_uptime);

        Line::from(vec![
            Span::styled(
                " HOSTPULSE ",
                Style::default()
                    .fg(palette.panel)
                    .bg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  host:{}  ", self.hostname)),
            Span::styled(
                format!("time:{}  ", current_time),
                Style::default().fg(palette.ok),
            ),
            Span::raw(format!("uptime:{}  ", uptime)),
            Span::styled(
                format!("net:{}  ", utils::format_network(&self.snapshot.network)),
                Style::default().fg(if self.snapshot.network.is_connected() {
                    palette.ok
                } else {
                    palette.critical
                }),
            ),
            Span::styled(
                format!(
                    "battery:{}  ",
                    utils::format_battery(self.snapshot.battery.as_ref())
                ),
                Style::default().fg(palette.warn),
            ),
            Span::styled(
                format!("theme:{} ", self.theme.name()),
                Style::default().fg(palette.upload),
            ),
        ])
    }

    fn keybinds_line(&self) -> Line<'static> {
        let palette = self.theme.palette();
        Line::from(vec![
            Span::styled(" [q] quit ", Style::default().fg(palette.critical)),
            Span::styled(" [s] speed test ", Style::default().fg(palette.accent)),
            Span::styled(" [c] cancel test ", Style::default().fg(palette.warn)),
            Span::styled(" [t] theme ", Style::default().fg(palette.upload)),
            Span::styled(" [w] save ", Style::default().fg(palette.ok)),
        ])
    }
}
