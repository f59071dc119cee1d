//! Infrastructure implementation of the `ProcessRunner` port.
//!
//! `StreamingProcessRunner` spawns the supervised command with tokio and
//! relays its stdout/stderr line by line while it runs. Both pipes are drained
//! concurrently with the wait, so a chatty stderr never stalls stdout.

use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::application::ports::ProcessRunner;
use crate::domain::MonitorError;

/// Exit code reported when the platform gives neither a code nor a signal.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Production `ProcessRunner`: relays child output to this process's
/// stdout/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingProcessRunner;

impl ProcessRunner for StreamingProcessRunner {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        argv: &[String],
    ) -> Result<i32, MonitorError> {
        let (program, args) = argv.split_first().ok_or(MonitorError::NoCommand)?;

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MonitorError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();

        let (status, (), ()) = tokio::join!(
            child.wait(),
            async {
                if let Some(h) = stdout_handle {
                    drain(h, &mut tokio::io::stdout(), "stdout").await;
                }
            },
            async {
                if let Some(h) = stderr_handle {
                    drain(h, &mut tokio::io::stderr(), "stderr").await;
                }
            },
        );

        match status {
            Ok(status) => Ok(exit_code(status)),
            Err(_) if cancel.is_cancelled() => Err(MonitorError::Interrupted {
                program: program.clone(),
            }),
            Err(source) => Err(MonitorError::Wait {
                program: program.clone(),
                source,
            }),
        }
    }
}

async fn drain<R, W>(reader: R, writer: &mut W, stream: &'static str)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Err(e) = pump_lines(reader, writer).await {
        tracing::warn!(stream, error = %e, "failed reading command output");
    }
}

/// Copies `reader` to `writer` one line at a time until EOF, flushing after
/// each line.
///
/// Once `writer` fails the rest of the input is still read and discarded, so
/// the child never blocks on a full pipe.
///
/// # Errors
///
/// Returns an error only if reading fails.
pub async fn pump_lines<R, W>(reader: R, writer: &mut W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    let mut writable = true;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        if writable {
            let written = async {
                writer.write_all(&line).await?;
                writer.flush().await
            }
            .await;
            if let Err(e) = written {
                tracing::debug!(error = %e, "output sink closed, discarding");
                writable = false;
            }
        }
    }
}

/// Map an exit status to the code recorded in metrics.
///
/// On Unix a child killed by signal `n` reports `128 + n`, the shell convention.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    UNKNOWN_EXIT_CODE
}
