//! Main packager orchestration.
//!
//! This module provides the [`Packager`] orchestrator that selects a runtime
//! strategy for a workspace, runs its stages and reports progress.

use super::staging_lock::StagingLock;
use crate::packager::{
    ActionType, PackagerOptions, Result,
    bundle::BundledArchive,
    detect::{detect, validate_workspace},
    error::{PackagingError, Stage},
    events::{EventHub, LifecycleEvent, ListenerId},
    strategy::Strategy,
};
use std::{
    fmt,
    path::PathBuf,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Where the packager is in its current or most recent run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PackagerState {
    Idle,
    Detecting,
    Compiling,
    InstallingDependencies,
    Bundling,
    Done,
    Failed,
}

impl From<Stage> for PackagerState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Detect => PackagerState::Detecting,
            Stage::Compile => PackagerState::Compiling,
            Stage::Dependencies => PackagerState::InstallingDependencies,
            Stage::Bundle => PackagerState::Bundling,
        }
    }
}

/// Clears the in-flight flag when a run ends, including when its future is dropped.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PackagingError::RunInProgress);
        }
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Packaging orchestrator.
///
/// Detects the runtime of a workspace, runs the matching [`Strategy`] and
/// forwards lifecycle events to registered listeners. The strategy for the
/// most recent workspace is cached and reused while the workspace path stays
/// the same.
///
/// One run at a time: a second [`package_project`](Packager::package_project)
/// while one is in flight fails with [`PackagingError::RunInProgress`].
///
/// # Examples
///
/// ```no_run
/// use polyglotpkg::packager::{LifecycleEvent, Packager, PackagerOptionsBuilder};
///
/// # async fn example() -> polyglotpkg::packager::Result<()> {
/// let packager = Packager::new();
/// packager.once(LifecycleEvent::CompileStart, || println!("Compiling project..."));
/// packager.once(LifecycleEvent::DependenciesStart, || println!("Bundling dependencies..."));
/// packager.once(LifecycleEvent::BundleStart, || println!("Packaging project..."));
///
/// let options = PackagerOptionsBuilder::new().workspace("/work/my-action").build()?;
/// let archive = packager.package_project(options).await?;
/// println!("Created {} ({})", archive.path.display(), archive.checksum);
/// # Ok(())
/// # }
/// ```
pub struct Packager {
    events: EventHub,
    cached: Mutex<Option<Strategy>>,
    state: Mutex<PackagerState>,
    running: AtomicBool,
    cancel: CancellationToken,
}

impl fmt::Debug for Packager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packager")
            .field("state", &self.state())
            .field("cached_workspace", &self.cached_workspace())
            .field("running", &self.running.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl Default for Packager {
    fn default() -> Self {
        Self::new()
    }
}

impl Packager {
    pub fn new() -> Self {
        Self {
            events: EventHub::new(),
            cached: Mutex::new(None),
            state: Mutex::new(PackagerState::Idle),
            running: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Packages the workspace described by `options`.
    ///
    /// Runs compile, dependency install and bundle in order and returns the
    /// archive, or the first error. Nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`PackagingError::RunInProgress`] if this packager is already running
    /// - [`PackagingError::StagingBusy`] if another run owns the staging directory
    /// - [`PackagingError::Detection`] if the workspace is missing or of no supported runtime
    /// - the failing stage's error otherwise
    pub async fn package_project(&self, options: PackagerOptions) -> Result<BundledArchive> {
        let _run = RunGuard::acquire(&self.running)?;
        let result = self.run(options).await;

        match &result {
            Ok(_) => self.set_state(PackagerState::Done),
            Err(e) => {
                log::debug!("Packaging failed: {e}");
                self.set_state(PackagerState::Failed);
            }
        }
        result
    }

    async fn run(&self, options: PackagerOptions) -> Result<BundledArchive> {
        let _staging = StagingLock::acquire(options.bundle_staging_path())?;
        let strategy = self.resolve_strategy(options)?;

        let result = strategy
            .package_project(&self.events, &self.cancel, |stage| {
                self.set_state(PackagerState::from(stage))
            })
            .await;

        *self.lock_cache() = Some(strategy);
        result
    }

    /// Reuses the cached strategy when the workspace is unchanged, otherwise detects anew.
    fn resolve_strategy(&self, options: PackagerOptions) -> Result<Strategy> {
        let cached = self.lock_cache().take();
        if let Some(mut strategy) = cached {
            let same_workspace = strategy.options().workspace() == options.workspace();
            let runtime_agrees = options
                .runtime_override()
                .is_none_or(|runtime| runtime == strategy.action_type());
            if same_workspace && runtime_agrees {
                log::debug!(
                    "Reusing {} strategy for {}",
                    strategy.action_type(),
                    options.workspace().display()
                );
                strategy.rebind(options);
                return Ok(strategy);
            }
            log::debug!(
                "Discarding cached strategy for {}",
                strategy.options().workspace().display()
            );
        }

        self.set_state(PackagerState::Detecting);
        let action_type = match options.runtime_override() {
            Some(runtime) => {
                validate_workspace(options.workspace())?;
                runtime
            }
            None => detect(options.workspace())?,
        };
        if action_type != ActionType::Unknown {
            log::info!("Detected {action_type} project at {}", options.workspace().display());
        }
        Strategy::new(action_type, options)
    }

    /// Registers `listener` for the next occurrence of `event`.
    pub fn once(&self, event: LifecycleEvent, listener: impl FnOnce() + Send + 'static) {
        self.events.once(event, listener);
    }

    /// Registers `listener` for every event until removed with [`Packager::off`].
    pub fn on(&self, listener: impl FnMut(LifecycleEvent) + Send + 'static) -> ListenerId {
        self.events.on(listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// Channel receiving every subsequent event.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn state(&self) -> PackagerState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Workspace of the cached strategy, if any.
    pub fn cached_workspace(&self) -> Option<PathBuf> {
        self.lock_cache()
            .as_ref()
            .map(|strategy| strategy.options().workspace().to_path_buf())
    }

    /// Token checked between stages.
    ///
    /// Cancelling it stops the current run before its next stage. The token
    /// stays cancelled, so later runs on this packager fail the same way.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn set_state(&self, state: PackagerState) {
        let mut current = match self.state.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        log::trace!("Packager state {:?} -> {state:?}", *current);
        *current = state;
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<Strategy>> {
        match self.cached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
