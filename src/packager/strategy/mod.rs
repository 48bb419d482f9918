//! Runtime strategies.
//!
//! Every supported runtime implements the same three stages (compile, install
//! dependencies, create bundle). [`Strategy`] is the closed set of variants the
//! orchestrator dispatches over; a variant is chosen once per run from the
//! detected [`ActionType`].

mod base;
mod node;
mod powershell;
mod python;

pub use base::{BundleLayout, StrategyBase};
pub use node::NodeStrategy;
pub use powershell::{PowerShellStrategy, RequiredModule, parse_required_modules};
pub use python::PythonStrategy;

use crate::packager::{
    ActionType, PackagerOptions,
    bundle::{BundleWriter, BundledArchive},
    error::{BundleError, CompileError, DependencyInstallError, DetectionError, PackagingError, Stage},
    events::{EventHub, LifecycleEvent},
};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Stage bodies a runtime variant provides.
pub(crate) trait RuntimeStrategy {
    fn base(&self) -> &StrategyBase;

    fn base_mut(&mut self) -> &mut StrategyBase;

    /// Produces `compiled/` from the workspace.
    async fn compile(&self) -> Result<(), CompileError>;

    /// Materialises third-party packages under `vendor/`.
    async fn install_dependencies(&self) -> Result<(), DependencyInstallError>;

    /// Where the vendored tree is read from and placed in the bundle.
    fn layout(&self) -> BundleLayout;
}

macro_rules! with_variant {
    ($strategy:expr, $inner:ident => $body:expr) => {
        match $strategy {
            Strategy::Node($inner) => $body,
            Strategy::Python($inner) => $body,
            Strategy::PowerShell($inner) => $body,
        }
    };
}

/// A runtime strategy bound to one workspace's options.
#[derive(Clone, Debug)]
pub enum Strategy {
    Node(NodeStrategy),
    Python(PythonStrategy),
    PowerShell(PowerShellStrategy),
}

impl Strategy {
    /// Creates the strategy for `action_type`.
    ///
    /// # Errors
    ///
    /// [`DetectionError::UnsupportedProjectType`] for [`ActionType::Unknown`].
    pub fn new(action_type: ActionType, options: PackagerOptions) -> Result<Self, PackagingError> {
        let strategy = match action_type {
            ActionType::Node => Strategy::Node(NodeStrategy::new(StrategyBase::new(options, action_type))),
            ActionType::Python => {
                Strategy::Python(PythonStrategy::new(StrategyBase::new(options, action_type)))
            }
            ActionType::PowerShell => {
                Strategy::PowerShell(PowerShellStrategy::new(StrategyBase::new(options, action_type)))
            }
            ActionType::Unknown => {
                return Err(DetectionError::UnsupportedProjectType(options.workspace().to_path_buf()).into());
            }
        };
        Ok(strategy)
    }

    pub fn action_type(&self) -> ActionType {
        with_variant!(self, s => s.base().action_type())
    }

    pub fn options(&self) -> &PackagerOptions {
        with_variant!(self, s => s.base().options())
    }

    /// Binds fresh options for the same workspace to a cached strategy.
    pub(crate) fn rebind(&mut self, options: PackagerOptions) {
        with_variant!(self, s => s.base_mut().rebind(options))
    }

    pub fn layout(&self) -> BundleLayout {
        with_variant!(self, s => s.layout())
    }

    /// Runs the compile stage.
    pub async fn compile(&self, events: &EventHub) -> Result<(), CompileError> {
        run_stage(events, Stage::Compile, async {
            with_variant!(self, s => s.compile().await)
        })
        .await
    }

    /// Runs the dependency install stage.
    pub async fn install_dependencies(&self, events: &EventHub) -> Result<(), DependencyInstallError> {
        run_stage(events, Stage::Dependencies, async {
            with_variant!(self, s => s.install_dependencies().await)
        })
        .await
    }

    /// Runs the bundle stage over the current `compiled/` and vendored trees.
    pub async fn create_bundle(&self, events: &EventHub) -> Result<BundledArchive, BundleError> {
        run_stage(events, Stage::Bundle, async {
            let base = with_variant!(self, s => s.base());
            let definition = base.definition()?;
            BundleWriter::new(base.options())
                .write(&base.options().compiled_dir(), &self.layout(), &definition)
                .await
        })
        .await
    }

    /// Runs every stage in order, stopping at the first failure.
    ///
    /// `cancel` is checked before each stage; a stage already started runs to
    /// completion. `on_stage` is called as each stage begins.
    pub async fn package_project(
        &self,
        events: &EventHub,
        cancel: &CancellationToken,
        mut on_stage: impl FnMut(Stage),
    ) -> Result<BundledArchive, PackagingError> {
        log::info!(
            "Packaging {} project at {}",
            self.action_type(),
            self.options().workspace().display()
        );

        ensure_not_cancelled(cancel, Stage::Compile)?;
        on_stage(Stage::Compile);
        self.compile(events).await?;

        ensure_not_cancelled(cancel, Stage::Dependencies)?;
        on_stage(Stage::Dependencies);
        self.install_dependencies(events).await?;

        ensure_not_cancelled(cancel, Stage::Bundle)?;
        on_stage(Stage::Bundle);
        let archive = self.create_bundle(events).await?;

        log::info!(
            "Created {} ({} bytes, sha256 {})",
            archive.path.display(),
            archive.size,
            archive.checksum
        );
        Ok(archive)
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken, before: Stage) -> Result<(), PackagingError> {
    if cancel.is_cancelled() {
        log::info!("Packaging cancelled before the {before} stage");
        return Err(PackagingError::Cancelled { before });
    }
    Ok(())
}

/// Emits the stage's start event, awaits `work`, then emits complete or failed.
async fn run_stage<T, E>(
    events: &EventHub,
    stage: Stage,
    work: impl Future<Output = Result<T, E>>,
) -> Result<T, E> {
    if let Some(event) = LifecycleEvent::start_of(stage) {
        events.emit(event);
    }
    let result = work.await;
    let finished = match result {
        Ok(_) => LifecycleEvent::complete_of(stage),
        Err(_) => LifecycleEvent::failed_of(stage),
    };
    if let Some(event) = finished {
        events.emit(event);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packager::PackagerOptionsBuilder;
    use std::path::Path;

    fn options(workspace: &Path) -> PackagerOptions {
        PackagerOptionsBuilder::new().workspace(workspace).build().unwrap()
    }

    #[test]
    fn unknown_runtime_has_no_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let err = Strategy::new(ActionType::Unknown, options(dir.path())).unwrap_err();
        assert!(matches!(
            err,
            PackagingError::Detection(DetectionError::UnsupportedProjectType(_))
        ));
    }

    #[test]
    fn layouts_place_dependencies_per_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path());
        let vendor = opts.vendor_dir();

        let node = Strategy::new(ActionType::Node, opts.clone()).unwrap().layout();
        assert_eq!(node.vendored_dir, vendor.join("node_modules"));
        assert_eq!(node.dependencies_prefix, Path::new("node_modules"));

        let python = Strategy::new(ActionType::Python, opts.clone()).unwrap().layout();
        assert_eq!(python.vendored_dir, vendor);
        assert_eq!(python.dependencies_prefix, Path::new(""));

        let pwsh = Strategy::new(ActionType::PowerShell, opts).unwrap().layout();
        assert_eq!(pwsh.dependencies_prefix, Path::new("Modules"));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_compile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "def handler(c, i):\n    return 1\n").unwrap();
        let strategy = Strategy::new(ActionType::Python, options(dir.path())).unwrap();

        let events = EventHub::new();
        let mut rx = events.subscribe();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = strategy
            .package_project(&events, &cancel, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PackagingError::Cancelled { before: Stage::Compile }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_compile_emits_failed_event() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "").unwrap();
        let strategy = Strategy::new(ActionType::Python, options(dir.path())).unwrap();

        let events = EventHub::new();
        let mut rx = events.subscribe();
        let err = strategy.compile(&events).await.unwrap_err();

        assert!(matches!(err, CompileError::MissingEntryPoint { .. }));
        assert_eq!(rx.try_recv().unwrap(), LifecycleEvent::CompileStart);
        assert_eq!(rx.try_recv().unwrap(), LifecycleEvent::CompileFailed);
        assert!(rx.try_recv().is_err());
    }
}
