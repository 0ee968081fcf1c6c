//! Resource management

use crate::error::DecimatorError;

use tokio::sync::{Semaphore, SemaphorePermit};

/// [crate::resource_manager::ResourceManager] provides a simple way to allocate various resources
/// to tasks. Resource management is performed using a Tokio Semaphore for each type of resource.
#[derive(Debug)]
pub struct ResourceManager {
    /// Optional semaphore for upstream connections.
    upstream_connections: Option<Semaphore>,

    /// Optional semaphore for fetch tasks.
    tasks: Option<Semaphore>,
}

impl ResourceManager {
    /// Returns a new ResourceManager object.
    pub fn new(upstream_connection_limit: Option<usize>, task_limit: Option<usize>) -> Self {
        Self {
            upstream_connections: upstream_connection_limit.map(Semaphore::new),
            tasks: task_limit.map(Semaphore::new),
        }
    }

    /// Acquire an upstream connection resource.
    pub async fn upstream_connection(&self) -> Result<Option<SemaphorePermit>, DecimatorError> {
        optional_acquire(&self.upstream_connections).await
    }

    /// Acquire a fetch task resource.
    pub async fn task(&self) -> Result<Option<SemaphorePermit>, DecimatorError> {
        optional_acquire(&self.tasks).await
    }
}

/// Acquire a permit on an optional Semaphore, if present.
async fn optional_acquire(
    sem: &Option<Semaphore>,
) -> Result<Option<SemaphorePermit>, DecimatorError> {
    if let Some(sem) = sem {
        sem.acquire().await.map(Some).map_err(|err| err.into())
    } else {
        Ok(None)
    }
}
