//! Once-initialized lifecycle handle for the third-party map widget.
//!
//! The widget's script loads exactly once per process. Instead of a bare
//! module-level "already loaded" flag, the handle carries explicit
//! `Pending`/`Ready`/`Failed` states and a subscriber list, so late
//! callers can wait for (or react to) the outcome instead of racing the
//! load.

use std::sync::OnceLock;

use tokio::sync::watch;

/// Load state of a once-initialized external resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Load not finished yet.
    Pending,
    /// Loaded and usable.
    Ready,
    /// Load failed; the reason is terminal for this process.
    Failed(String),
}

/// A process-wide resource handle with explicit lifecycle states.
///
/// The first `mark_*` call wins; later transitions are ignored.
#[derive(Debug)]
pub struct ResourceHandle {
    state: watch::Sender<ResourceState>,
}

impl ResourceHandle {
    /// Creates a handle in the `Pending` state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(ResourceState::Pending);
        Self { state }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ResourceState {
        self.state.borrow().clone()
    }

    /// Subscribes to state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceState> {
        self.state.subscribe()
    }

    /// Marks the resource ready. Returns `false` if the outcome was
    /// already decided.
    pub fn mark_ready(&self) -> bool {
        self.transition(ResourceState::Ready)
    }

    /// Marks the resource failed. Returns `false` if the outcome was
    /// already decided.
    pub fn mark_failed(&self, reason: impl Into<String>) -> bool {
        self.transition(ResourceState::Failed(reason.into()))
    }

    /// Waits for the load outcome.
    ///
    /// # Errors
    ///
    /// Returns the failure reason if the resource failed to load.
    pub async fn ready(&self) -> Result<(), String> {
        let mut rx = self.subscribe();
        // The sender lives in self, so wait_for cannot see a closed
        // channel here.
        let outcome = rx
            .wait_for(|s| *s != ResourceState::Pending)
            .await
            .map_err(|e| e.to_string())?;
        match &*outcome {
            ResourceState::Ready => Ok(()),
            ResourceState::Failed(reason) => Err(reason.clone()),
            ResourceState::Pending => unreachable!("wait_for filtered Pending"),
        }
    }

    fn transition(&self, next: ResourceState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ResourceState::Pending {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

impl Default for ResourceHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide map widget handle.
pub fn map_widget() -> &'static ResourceHandle {
    static HANDLE: OnceLock<ResourceHandle> = OnceLock::new();
    HANDLE.get_or_init(ResourceHandle::new)
}
