//! Child processes with a deadline and bounded output capture.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Exit code reported when the child was killed by a signal.
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// Bytes kept from one output stream, plus how many were dropped past the limit.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub dropped: usize,
}

impl Captured {
    fn lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Everything observed from one finished (or killed) child.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Captured,
    pub stderr: Captured,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(SIGNALED_EXIT_CODE)
    }

    pub fn stdout_lossy(&self) -> String {
        self.stdout.lossy()
    }

    /// Stdout followed by stderr, each with its truncation notice.
    pub fn combined_lossy(&self) -> String {
        let mut text = self.stdout.lossy();
        if self.stdout.dropped > 0 {
            text.push_str(&format!(
                "\n[output truncated {} bytes]\n",
                self.stdout.dropped
            ));
        }
        if !self.stderr.bytes.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr.lossy());
        }
        if self.stderr.dropped > 0 {
            text.push_str(&format!(
                "\n[stderr truncated {} bytes]\n",
                self.stderr.dropped
            ));
        }
        text
    }
}

/// How long output readers may keep going once the child has exited.
///
/// A process the child left running in the background inherits its pipes, so
/// the readers would otherwise block until that process exits.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Spawn `cmd`, optionally feed it `stdin`, and wait at most `timeout`.
///
/// Both pipes are drained on their own threads while the child runs, keeping
/// at most `output_limit_bytes` of each. On Unix the child leads its own
/// process group, and at the deadline the whole group is killed and the output
/// is reported with `timed_out` set. After the child exits, whatever its
/// leftover background processes still hold open is waited on for at most
/// [`DRAIN_GRACE`].
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());
    isolate_process_group(&mut cmd);

    let mut child = cmd
        .spawn()
        .inspect_err(|err| error!(%err, "failed to spawn child"))
        .context("spawn command")?;
    debug!(pid = child.id(), "child spawned");

    if let Some(input) = stdin {
        let mut pipe = child.stdin.take().context("child stdin not piped")?;
        let input = input.to_vec();
        // Dropping the handle at the end of the thread closes the child's stdin.
        thread::spawn(move || {
            if let Err(err) = pipe.write_all(&input) {
                debug!(%err, "child closed stdin early");
            }
        });
    }

    let stdout = Drain::spawn(
        child.stdout.take().context("child stdout not piped")?,
        output_limit_bytes,
    );
    let stderr = Drain::spawn(
        child.stderr.take().context("child stderr not piped")?,
        output_limit_bytes,
    );

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for child")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "deadline passed, killing process group");
            kill_process_group(&mut child)?;
            (child.wait().context("reap killed child")?, true)
        }
    };

    let grace_deadline = Instant::now() + DRAIN_GRACE;
    let stdout = stdout.finish(grace_deadline).context("collect stdout")?;
    let stderr = stderr.finish(grace_deadline).context("collect stderr")?;
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "child output exceeded limit"
        );
    }

    debug!(exit_code = ?status.code(), timed_out, "child finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

#[cfg(unix)]
fn isolate_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_cmd: &mut Command) {}

/// Kill the child and everything it started in its process group.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> Result<()> {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(child.id()).context("child pid out of range")?;
    if let Err(err) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        warn!(%err, "killpg failed, killing child only");
        child.kill().context("kill child")?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> Result<()> {
    child.kill().context("kill child")
}

/// One output pipe drained on a background thread into a shared buffer.
struct Drain {
    captured: Arc<Mutex<Captured>>,
    done: mpsc::Receiver<Result<()>>,
}

impl Drain {
    fn spawn<R: Read + Send + 'static>(stream: R, limit: usize) -> Self {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&captured);
        thread::spawn(move || {
            if tx.send(drain_bounded(stream, limit, &sink)).is_err() {
                debug!("output reader finished after the caller stopped waiting");
            }
        });
        Self { captured, done }
    }

    /// Wait for EOF until `deadline`, then return what has been read so far.
    ///
    /// A reader still blocked at the deadline keeps draining in the background
    /// so the writer never sees a broken pipe.
    fn finish(self, deadline: Instant) -> Result<Captured> {
        match self
            .done
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
        {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                warn!("output pipe still held open by a background process, not waiting for it");
            }
            Err(RecvTimeoutError::Disconnected) => bail!("output reader thread panicked"),
        }
        let captured = self
            .captured
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        Ok(captured.clone())
    }
}

/// Read `stream` to EOF into `sink`, keeping the first `limit` bytes.
fn drain_bounded<R: Read>(mut stream: R, limit: usize, sink: &Mutex<Captured>) -> Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).context("read child output")?;
        if n == 0 {
            return Ok(());
        }
        let mut captured = sink
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        let keep = n.min(limit.saturating_sub(captured.bytes.len()));
        captured.bytes.extend_from_slice(&chunk[..keep]);
        captured.dropped += n - keep;
    }
}
