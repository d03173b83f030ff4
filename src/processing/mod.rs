//! Concurrency and resource-management primitives shared by the format
//! parsers and the top-level pipeline: a bounded fan-out helper for
//! per-image OCR/caption calls, and process spawning with scoped temp
//! directories.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Default cap on concurrent OCR/caption calls per request.
pub const DEFAULT_IMAGE_FANOUT: usize = 5;

/// Runs `jobs` concurrently, bounded by `concurrency`. Each job's failure is
/// isolated — it does not cancel its siblings — matching the "failures of
/// individual image jobs are isolated" requirement for per-request fan-out.
pub async fn bounded_fan_out<T, F, Fut>(jobs: Vec<F>, concurrency: usize) -> Vec<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = std::sync::Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(jobs.len());

    for job in jobs {
        let permit = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore closed");
            job().await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(value) => results.push(value),
            Err(e) => tracing::warn!(error = %e, "image fan-out task panicked"),
        }
    }
    results
}

/// Scoped temp directory for external converter subprocesses. A thin alias
/// over `tempfile::TempDir`, whose `Drop` impl already deletes the directory
/// on every exit path (success, error, or the future being dropped under
/// cancellation) — the RAII guarantee the source's paired
/// create/cleanup-on-`__exit__` context manager was standing in for.
pub type ScopedTempDir = tempfile::TempDir;

pub fn scoped_temp_dir() -> Result<ScopedTempDir> {
    tempfile::tempdir().map_err(Error::from)
}

/// Runs an external converter with a per-call timeout and a scoped temp
/// directory, mirroring the source's subprocess conversion helpers
/// (LibreOffice, pandoc, pdftotext).
pub async fn run_converter(program: &str, args: &[&str], call_timeout: Duration) -> Result<Vec<u8>> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let child = command
        .spawn()
        .map_err(|e| Error::external_call(format!("failed to spawn {program}: {e}")))?;

    let output = timeout(call_timeout, child.wait_with_output())
        .await
        .map_err(|_| Error::external_call(format!("{program} timed out")))?
        .map_err(|e| Error::external_call(format!("{program} failed: {e}")))?;

    if !output.status.success() {
        return Err(Error::external_call(format!(
            "{program} exited with {}",
            output.status
        )));
    }

    Ok(output.stdout)
}

/// True if `program` is reachable on `PATH` — used to decide whether an
/// optional converter stage in a parser chain is even worth attempting.
pub fn executable_available(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success() || s.code().is_some())
        .unwrap_or(false)
}
