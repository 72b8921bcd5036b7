use crate::error::ThresherError;
use std::thread::JoinHandle;

/// Owns the ventilator and worker threads of one pipeline phase as a unit.
/// With the close-sentinel protocol every member finishes on its own, so
/// terminating a phase is a join rather than a kill.
pub struct StagePool {
    members: Vec<(String, JoinHandle<Result<(), ThresherError>>)>,
}

impl StagePool {
    pub fn new() -> Self {
        StagePool { members: Vec::new() }
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, f: F) -> Result<(), ThresherError>
    where
        F: FnOnce() -> Result<(), ThresherError> + Send + 'static,
    {
        let name = name.into();
        let handle = std::thread::Builder::new().name(name.clone()).spawn(f)?;
        self.members.push((name, handle));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Reap every member. A member that ended with an error is logged and
    /// counted; it never halts its siblings.
    pub fn join(self) -> usize {
        let mut failures = 0;
        for (name, handle) in self.members {
            match handle.join() {
                Ok(Ok(())) => tracing::debug!(member = %name, "stage member finished"),
                Ok(Err(err)) => {
                    failures += 1;
                    tracing::error!(member = %name, error = %err, "stage member failed");
                }
                Err(_) => {
                    failures += 1;
                    tracing::error!(member = %name, "stage member panicked");
                }
            }
        }
        failures
    }
}

impl Default for StagePool {
    fn default() -> Self {
        StagePool::new()
    }
}
