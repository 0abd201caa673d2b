use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// A spawned plugin child process together with the loopback port its
/// `PORT=<n>` handshake line announced.
pub struct SpawnedPlugin {
    pub child: Child,
    pub port: u16,
}

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawn the plugin binary, inheriting stderr for log forwarding (§6:
/// "stderr is captured and forwarded to the log sink with
/// `component=\"plugin:<name>\"`"), and read the single `PORT=<n>` line from
/// stdout within the handshake timeout.
pub async fn spawn_and_handshake(binary: &Path, workdir: &Path, plugin_name: &str) -> Result<SpawnedPlugin> {
    debug!(program = %binary.display(), "spawning plugin process");
    let mut command = Command::new(binary);
    command
        .current_dir(workdir)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("spawn {}", binary.display()))?;
    debug!(pid = child.id(), program = %binary.display(), "plugin process started");

    let stderr = child.stderr.take().context("open plugin stderr")?;
    let name = plugin_name.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => warn!(component = %format!("plugin:{name}"), "{line}"),
                Ok(None) => break,
                Err(err) => {
                    warn!(component = %format!("plugin:{name}"), error = %err, "stderr read error");
                    break;
                }
            }
        }
    });

    let stdout = child.stdout.take().context("open plugin stdout")?;
    let mut lines = BufReader::new(stdout).lines();
    let first_line = tokio::time::timeout(HANDSHAKE_TIMEOUT, lines.next_line())
        .await
        .map_err(|_| anyhow!("plugin {} handshake timed out", plugin_name))?
        .context("read plugin handshake line")?
        .ok_or_else(|| anyhow!("plugin {} closed stdout before handshake", plugin_name))?;

    let port: u16 = first_line
        .strip_prefix("PORT=")
        .ok_or_else(|| anyhow!("plugin {} sent malformed handshake line: {:?}", plugin_name, first_line))?
        .trim()
        .parse()
        .with_context(|| format!("plugin {} sent non-numeric port", plugin_name))?;

    // The rest of stdout is ignored per §6; drop the reader so the pipe
    // drains without blocking the child.
    tokio::spawn(async move { while let Ok(Some(_)) = lines.next_line().await {} });

    Ok(SpawnedPlugin { child, port })
}

/// Escalating teardown: SIGTERM, wait up to `grace`, then SIGKILL if the
/// child hasn't exited (§4.4).
pub async fn terminate(child: &mut Child, grace: Duration) -> Result<()> {
    if let Some(pid) = child.id() {
        #[cfg(unix)]
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(_)) => Ok(()),
        _ => {
            let _ = child.start_kill();
            child.wait().await.context("reap plugin after SIGKILL")?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn handshake_reads_port_line() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("plugin.sh");
        let mut f = std::fs::File::create(&script).unwrap();
        writeln!(f, "#!/bin/sh\necho PORT=4242\nsleep 5").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let spawned = spawn_and_handshake(&script, tmp.path(), "test").await.unwrap();
        assert_eq!(spawned.port, 4242);
    }
}
