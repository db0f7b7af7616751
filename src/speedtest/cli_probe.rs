use crate::error::ProbeError;
use crate::speedtest::{SpeedProbe, SpeedTestRunner};
use log::debug;
use serde::Deserialize;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Subset of the JSON report printed by `speedtest-cli --json`.
#[derive(Debug, Deserialize)]
struct CliReport {
    #[serde(default)]
    download: f64,
    #[serde(default)]
    upload: f64,
    #[serde(default)]
    ping: f64,
    server: Option<CliServer>,
}

#[derive(Debug, Deserialize)]
struct CliServer {
    id: serde_json::Value,
    #[serde(default)]
    sponsor: String,
    #[serde(default)]
    name: String,
}

/// [`SpeedProbe`] that shells out to `speedtest-cli`, one invocation per
/// stage, pinning the server chosen during selection for both measurements.
///
/// A running child is killed as soon as `cancel` fires.
pub struct SpeedtestCliProbe {
    program: String,
    cancel: CancellationToken,
    server_id: Option<String>,
    ping_ms: Option<f64>,
}

impl SpeedtestCliProbe {
    pub fn new(program: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            program: program.into(),
            cancel,
            server_id: None,
            ping_ms: None,
        }
    }

    /// A runner that builds a fresh probe for `program` on every run.
    pub fn runner(program: String) -> SpeedTestRunner {
        SpeedTestRunner::new(move |cancel| {
            if program.trim().is_empty() {
                return Err(ProbeError::Construct(
                    "speed test program is not configured".to_string(),
                ));
            }
            Ok(Box::new(Self::new(program.clone(), cancel)) as Box<dyn SpeedProbe>)
        })
    }

    fn invoke(&self, args: &[&str]) -> Result<CliReport, ProbeError> {
        debug!("running {} {}", self.program, args.join(" "));
        let mut child = Command::new(&self.program)
            .arg("--json")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let status = self.wait_or_kill(&mut child)?;
        let stdout = drain(child.stdout.take());
        if !status.success() {
            return Err(ProbeError::Exit {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&drain(child.stderr.take()))
                    .trim()
                    .to_string(),
            });
        }
        parse_report(&stdout)
    }

    fn wait_or_kill(&self, child: &mut Child) -> Result<ExitStatus, ProbeError> {
        loop {
            let exited = child.try_wait().map_err(|err| {
                ProbeError::Worker(format!("waiting for {}: {}", self.program, err))
            })?;
            if let Some(status) = exited {
                return Ok(status);
            }
            if self.cancel.is_cancelled() {
                debug!("killing {} (pid {})", self.program, child.id());
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProbeError::Cancelled);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn pinned_server(&self) -> Result<&str, ProbeError> {
        self.server_id
            .as_deref()
            .ok_or(ProbeError::NoServerSelected)
    }
}

impl SpeedProbe for SpeedtestCliProbe {
    fn select_best_server(&mut self) -> Result<(), ProbeError> {
        let report = self.invoke(&["--no-download", "--no-upload"])?;
        let server = report.server.ok_or(ProbeError::NoServer)?;
        let id = server_id(&server.id).ok_or(ProbeError::NoServer)?;
        debug!(
            "selected server {} ({} {}), ping {:.1} ms",
            id, server.sponsor, server.name, report.ping
        );

        self.server_id = Some(id);
        self.ping_ms = Some(report.ping);
        Ok(())
    }

    fn measure_download_bits_per_second(&mut self) -> Result<f64, ProbeError> {
        let server = self.pinned_server()?.to_string();
        Ok(self.invoke(&["--no-upload", "--server", &server])?.download)
    }

    fn measure_upload_bits_per_second(&mut self) -> Result<f64, ProbeError> {
        let server = self.pinned_server()?.to_string();
        Ok(self.invoke(&["--no-download", "--server", &server])?.upload)
    }

    fn last_ping_ms(&self) -> Result<f64, ProbeError> {
        self.ping_ms.ok_or(ProbeError::NoServerSelected)
    }
}

fn drain(pipe: Option<impl Read>) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut out);
    }
    out
}

fn parse_report(stdout: &[u8]) -> Result<CliReport, ProbeError> {
    Ok(serde_json::from_slice(stdout)?)
}

/// speedtest-cli has emitted the id both as a string and as a number.
fn server_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(id) if !id.is_empty() => Some(id.clone()),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
