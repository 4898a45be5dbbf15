//! Pre/post/failure hook execution
//!
//! Hooks are advisory. A hook that is missing, fails, or times out is
//! reported as a warning and never changes a VM's outcome.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::abstractions::{CommandExecutor, CommandOptions};
use crate::config::HooksConfig;

/// Runs the configured hook executables through a [`CommandExecutor`]
#[derive(Clone)]
pub struct HookRunner {
    executor: Arc<dyn CommandExecutor>,
    config: HooksConfig,
}

impl HookRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>, config: HooksConfig) -> Self {
        Self { executor, config }
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }

    /// Called with `<vm> <target>` before the first attempt
    pub async fn pre_migration(&self, vm: &str, target: &str) {
        self.run("pre-migration", self.config.pre_migration.as_deref(), &[vm, target])
            .await;
    }

    /// Called with `<vm> <target>` after a successful migration
    pub async fn post_migration(&self, vm: &str, target: &str) {
        self.run("post-migration", self.config.post_migration.as_deref(), &[vm, target])
            .await;
    }

    /// Called with `<vm> <error>` after a VM ends in failure
    pub async fn on_failure(&self, vm: &str, error: &str) {
        self.run("on-failure", self.config.on_failure.as_deref(), &[vm, error])
            .await;
    }

    async fn run(&self, stage: &str, hook: Option<&Path>, args: &[&str]) {
        let Some(hook) = hook else {
            return;
        };
        let program = hook.to_string_lossy();
        debug!("Running {} hook {}", stage, program);

        let options = CommandOptions::new()
            .with_timeout(self.config.timeout)
            .with_output_capture();

        match self.executor.execute(&program, args, options).await {
            Ok(output) if output.is_success() => {
                info!("{} hook {} completed", stage, program);
            }
            Ok(output) => {
                warn!(
                    "{} hook {} exited with status {}: {}",
                    stage,
                    program,
                    output.status,
                    output.stderr_lossy()
                );
            }
            Err(e) => {
                warn!("{} hook {} could not run: {}", stage, program, e);
            }
        }
    }
}

impl std::fmt::Debug for HookRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::{CommandOutput, MockCommandExecutor};
    use crate::error::HostshiftError;
    use std::path::PathBuf;
    use tracing_test::traced_test;

    fn hooks() -> HooksConfig {
        HooksConfig {
            pre_migration: Some(PathBuf::from("/hooks/pre.sh")),
            post_migration: Some(PathBuf::from("/hooks/post.sh")),
            on_failure: Some(PathBuf::from("/hooks/fail.sh")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_hooks_receive_vm_and_target() {
        let executor = MockCommandExecutor::new();
        executor.expect("/hooks/pre.sh", &["vm-1", "compute-02"], Ok(CommandOutput::ok("")));
        executor.expect("/hooks/post.sh", &["vm-1", "compute-02"], Ok(CommandOutput::ok("")));

        let runner = HookRunner::new(Arc::new(executor.clone()), hooks());
        runner.pre_migration("vm-1", "compute-02").await;
        runner.post_migration("vm-1", "compute-02").await;

        executor.verify().unwrap();
    }

    #[tokio::test]
    async fn test_failure_hook_receives_error_text() {
        let executor = MockCommandExecutor::new();
        executor.expect(
            "/hooks/fail.sh",
            &["vm-1", "VM 'vm-1' not found"],
            Ok(CommandOutput::ok("")),
        );

        let runner = HookRunner::new(Arc::new(executor.clone()), hooks());
        runner.on_failure("vm-1", "VM 'vm-1' not found").await;

        executor.verify().unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failing_hook_is_only_a_warning() {
        let executor = MockCommandExecutor::new();
        executor.expect(
            "/hooks/pre.sh",
            &["vm-1", "h1"],
            Ok(CommandOutput::failed(2, "drain failed")),
        );
        executor.expect(
            "/hooks/post.sh",
            &["vm-1", "h1"],
            Err(HostshiftError::dependency_missing("/hooks/post.sh", "not found")),
        );

        let runner = HookRunner::new(Arc::new(executor.clone()), hooks());
        runner.pre_migration("vm-1", "h1").await;
        runner.post_migration("vm-1", "h1").await;

        executor.verify().unwrap();
        assert!(logs_contain("exited with status 2: drain failed"));
        assert!(logs_contain("could not run"));
    }

    #[tokio::test]
    async fn test_unconfigured_hooks_run_nothing() {
        let executor = MockCommandExecutor::new();
        let runner = HookRunner::new(Arc::new(executor.clone()), HooksConfig::default());

        assert!(runner.is_empty());
        runner.pre_migration("vm-1", "h1").await;
        runner.on_failure("vm-1", "boom").await;

        assert!(executor.calls().is_empty());
    }
}
