use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::{error::LoaderError, models::ViewDescriptor};

/// ViewLoader
///
/// Deferred factory for a destination view: the code-split boundary. The navigator
/// only ever calls `load` after the guard has admitted the attempt, so nothing behind
/// a gated route is fetched speculatively.
#[async_trait]
pub trait ViewLoader: Send + Sync {
    async fn load(&self) -> Result<ViewDescriptor, LoaderError>;
}

/// LoaderRef
///
/// Shared handle stored in navigation entries.
pub type LoaderRef = Arc<dyn ViewLoader>;

/// StaticViewLoader
///
/// Resolves to a fixed descriptor, optionally after a simulated fetch delay.
#[derive(Clone, Debug)]
pub struct StaticViewLoader {
    descriptor: ViewDescriptor,
    latency: Option<Duration>,
}

impl StaticViewLoader {
    pub fn new(descriptor: ViewDescriptor) -> Self {
        Self {
            descriptor,
            latency: None,
        }
    }

    pub fn component(name: &str) -> LoaderRef {
        Arc::new(Self::new(ViewDescriptor::new(name)))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl ViewLoader for StaticViewLoader {
    async fn load(&self) -> Result<ViewDescriptor, LoaderError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.descriptor.clone())
    }
}

/// MockViewLoader
///
/// A spy loader for tests: counts invocations and can be switched into a failing mode
/// to simulate a chunk that cannot be fetched.
#[derive(Clone)]
pub struct MockViewLoader {
    descriptor: ViewDescriptor,
    calls: Arc<AtomicUsize>,
    /// When true, every load returns `LoaderError::Unavailable`.
    pub should_fail: bool,
}

impl MockViewLoader {
    pub fn new(component: &str) -> Self {
        Self {
            descriptor: ViewDescriptor::new(component),
            calls: Arc::new(AtomicUsize::new(0)),
            should_fail: false,
        }
    }

    pub fn new_failing(component: &str) -> Self {
        Self {
            should_fail: true,
            ..Self::new(component)
        }
    }

    /// Number of times `load` has been invoked, across all clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shared(&self) -> LoaderRef {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl ViewLoader for MockViewLoader {
    async fn load(&self) -> Result<ViewDescriptor, LoaderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(LoaderError::Unavailable(format!(
                "Mock Loader Error: chunk for {} could not be fetched",
                self.descriptor.component
            )));
        }
        Ok(self.descriptor.clone())
    }
}
