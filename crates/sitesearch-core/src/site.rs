//! Site lifecycle: starting a local site and waiting for it to answer.
//!
//! A build may start the site itself through `site_start_cmd`. The spawned
//! process is supervised for the rest of the build: if it exits on its own
//! before the crawl is done, the build fails with
//! [`Error::SiteProcessExited`]. Either way the build waits on the readiness
//! probe before crawling.

use crate::fetcher::Fetcher;
use crate::{Error, Result};
use std::future::Future;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tracing::{debug, info};
use url::Url;

/// Delay between readiness probes.
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long a site may take to become ready.
pub const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll `probe` until it answers with a 2xx status.
///
/// Fails with [`Error::Timeout`] after [`READY_TIMEOUT`].
pub async fn wait_until_ready(fetcher: &Fetcher, probe: &Url) -> Result<()> {
    wait_until_ready_with(fetcher, probe, READY_POLL_INTERVAL, READY_TIMEOUT).await
}

/// [`wait_until_ready`] with explicit timing.
pub async fn wait_until_ready_with(
    fetcher: &Fetcher,
    probe: &Url,
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    info!("Waiting until site ready at {probe}");
    let started = Instant::now();

    loop {
        if fetcher.is_ready(probe).await {
            info!("Site ready");
            return Ok(());
        }

        if started.elapsed() > timeout {
            return Err(Error::Timeout(format!(
                "site at {probe} did not become ready within {}s",
                timeout.as_secs()
            )));
        }

        tokio::time::sleep(interval).await;
    }
}

/// A site started by the build.
///
/// The process inherits stdout and stderr so its logs stay visible. It is
/// killed when the value is stopped or dropped.
pub struct SiteProcess {
    command: String,
    child: Child,
}

impl SiteProcess {
    /// Start `command` through the platform shell.
    pub fn start(command: &str) -> Result<Self> {
        info!("Starting site with \"{command}\"");
        let child = shell(command)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        debug!(pid = child.id(), "site process spawned");

        Ok(Self {
            command: command.to_string(),
            child,
        })
    }

    /// Run `work` while watching the process.
    ///
    /// Returns the result of `work`, or [`Error::SiteProcessExited`] if the
    /// process exits first. `work` is dropped in the latter case.
    pub async fn supervise<F, T>(&mut self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            result = work => result,
            status = self.child.wait() => {
                let reason = match status {
                    Ok(status) => status.to_string(),
                    Err(err) => err.to_string(),
                };
                Err(Error::SiteProcessExited(reason))
            },
        }
    }

    /// Kill the process. Its exit status is not reported.
    pub async fn stop(mut self) {
        debug!("Stopping site process \"{}\"", self.command);
        // The process may already be gone.
        let _ = self.child.kill().await;
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
