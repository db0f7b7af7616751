/// User intents the dashboard reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,

    /// Start a speed test unless one is already running
    RunSpeedTest,

    /// Abandon the running speed test
    CancelSpeedTest,

    /// Switch to the next color scheme and persist it
    SwitchTheme,

    /// Save current configuration
    SaveConfig,
}
