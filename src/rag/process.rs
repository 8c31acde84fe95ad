use async_trait::async_trait;
use log::{ debug, warn };
use serde::Serialize;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;

use super::ContextRetriever;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("failed to encode retrieval request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("retriever stdin unavailable")]
    Stdin,

    #[error("retriever timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to wait for retriever: {0}")]
    Wait(std::io::Error),

    #[error("retriever exited with {status}: {stderr}")]
    Exit {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("retriever output is not valid UTF-8")]
    Encoding,

    #[error("retriever is shutting down")]
    Closed,
}

#[derive(Serialize)]
struct RetrievalRequest<'a> {
    query: &'a str,
    k: usize,
}

/// Runs an external program per query.
///
/// The program receives `{"query": ..., "k": ...}` as JSON on stdin and prints the
/// joined context on stdout. The query never appears on the command line.
pub struct ProcessRetriever {
    program: String,
    args: Vec<String>,
    k: usize,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ProcessRetriever {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        k: usize,
        timeout: Duration,
        max_concurrency: usize
    ) -> Self {
        Self {
            program: program.into(),
            args,
            k,
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    async fn run(&self, query: &str) -> Result<String, RetrievalError> {
        let payload = serde_json::to_vec(&(RetrievalRequest { query, k: self.k }))?;
        let _permit = self.permits.acquire().await.map_err(|_| RetrievalError::Closed)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RetrievalError::Spawn { program: self.program.clone(), source })?;

        let mut stdin = child.stdin.take().ok_or(RetrievalError::Stdin)?;
        let write_task = tokio::spawn(async move {
            stdin.write_all(&payload).await
        });

        let output = tokio::time
            ::timeout(self.timeout, child.wait_with_output()).await
            .map_err(|_| RetrievalError::Timeout(self.timeout))?
            .map_err(RetrievalError::Wait)?;

        // A program that exits without reading its input is judged by its exit status alone.
        match write_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Retriever did not consume its input: {}", e),
            Err(e) => debug!("Retriever stdin task failed: {}", e),
        }

        if !output.status.success() {
            return Err(RetrievalError::Exit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| RetrievalError::Encoding)?;
        Ok(stdout.trim().to_string())
    }
}

#[async_trait]
impl ContextRetriever for ProcessRetriever {
    async fn retrieve(&self, query: &str) -> String {
        match self.run(query).await {
            Ok(context) if context.is_empty() => {
                debug!("Retriever returned no context");
                context
            }
            Ok(context) => {
                debug!("Retrieved {} chars of context", context.len());
                context
            }
            Err(e) => {
                warn!("Context retrieval failed, continuing without context: {}", e);
                String::new()
            }
        }
    }
}
