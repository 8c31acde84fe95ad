pub mod process;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use log::info;
use crate::cli::Args;
use self::process::ProcessRetriever;

/// Source of document context for a query.
///
/// Implementations never fail: any internal error degrades to an empty string.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> String;

    fn is_configured(&self) -> bool {
        true
    }
}

/// Used when no retrieval program is configured.
pub struct NoopRetriever;

#[async_trait]
impl ContextRetriever for NoopRetriever {
    async fn retrieve(&self, _query: &str) -> String {
        String::new()
    }

    fn is_configured(&self) -> bool {
        false
    }
}

pub fn new_retriever(args: &Args) -> Arc<dyn ContextRetriever> {
    match args.retriever_command.as_deref().map(str::trim) {
        Some(program) if !program.is_empty() => {
            info!(
                "Context retrieval via '{}' {:?} (k={}, timeout={}s, max concurrency={})",
                program,
                args.retriever_args,
                args.retriever_k,
                args.retriever_timeout_secs,
                args.retriever_max_concurrency
            );
            Arc::new(
                ProcessRetriever::new(
                    program,
                    args.retriever_args.clone(),
                    args.retriever_k,
                    Duration::from_secs(args.retriever_timeout_secs),
                    args.retriever_max_concurrency
                )
            )
        }
        _ => {
            info!("No retriever command configured; turns run without document context.");
            Arc::new(NoopRetriever)
        }
    }
}
