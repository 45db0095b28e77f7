//! Directory backend selection.

use std::sync::Arc;

use grptrace_directory::{DirectoryLookup, DirectoryResult, GrouperClient, MemoryDirectory};
use grptrace_domain::{DirectoryClient, MembershipTracer};
use tracing::{info, warn};

use crate::config::AppConfig;

/// One configured backend, seen through both of its interfaces.
#[derive(Clone)]
pub struct Directory {
    /// Lookups the tracer runs on.
    pub client: Arc<dyn DirectoryClient>,
    /// Member listings and subject lookups.
    pub lookup: Arc<dyn DirectoryLookup>,
}

impl Directory {
    fn from_backend<B>(backend: B) -> Self
    where
        B: DirectoryClient + DirectoryLookup + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            client: backend.clone(),
            lookup: backend,
        }
    }

    /// Creates a tracer over this backend.
    pub fn tracer(&self, config: &AppConfig) -> MembershipTracer<dyn DirectoryClient> {
        MembershipTracer::with_config(Arc::clone(&self.client), config.resolver_config())
    }
}

/// Builds the directory backend named by `directory.backend`.
///
/// Expects a validated configuration; anything but "grouper" is treated as
/// the memory backend.
pub fn build_directory(config: &AppConfig) -> DirectoryResult<Directory> {
    match config.directory.backend.as_str() {
        "grouper" => {
            let grouper = config.grouper_config();
            info!(base_url = %grouper.base_url, "Using Grouper directory");
            Ok(Directory::from_backend(GrouperClient::new(grouper)?))
        }
        _ => match &config.directory.fixture_path {
            Some(path) => {
                info!(fixture_path = %path, "Using in-memory directory");
                Ok(Directory::from_backend(MemoryDirectory::load(path)?))
            }
            None => {
                warn!("No directory fixture configured, in-memory directory is empty");
                Ok(Directory::from_backend(MemoryDirectory::new()))
            }
        },
    }
}

/// Builds a tracer over the configured backend.
pub fn build_tracer(config: &AppConfig) -> DirectoryResult<MembershipTracer<dyn DirectoryClient>> {
    Ok(build_directory(config)?.tracer(config))
}
