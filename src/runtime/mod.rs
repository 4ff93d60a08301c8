//! Component B — the per-language Runtime abstraction — and its template
//! method. A single free function drives every Runtime the same way; no
//! implementation inherits from another.

mod csharp;
mod go;
mod javascript;
mod python;
mod registry;

pub use csharp::CSharpRuntime;
pub use go::GoRuntime;
pub use javascript::JavaScriptRuntime;
pub use python::PythonRuntime;
pub use registry::RuntimeRegistry;

use crate::error::RuntimeError;
use crate::job::{ExecutionConfig, ExecutionResult};
use crate::sandbox::SandboxDriver;
use async_trait::async_trait;
use std::path::Path;

/// A language-specific adapter between source code and the Sandbox Driver.
///
/// Implementations only ever answer "what image, what files, what command" —
/// they never touch Docker directly. [`execute`] is the one place the three
/// answers get wired to a running container.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Canonical id this Runtime is registered under (e.g. `"python"`).
    fn language_name(&self) -> &str;

    /// Container image tag to run this language in.
    fn image(&self) -> &str;

    /// Writes source (and any manifest, e.g. `requirements.txt`) into
    /// `workspace_dir` and returns the in-container entry-point path.
    /// Must validate `packages` against the language whitelist before
    /// writing anything.
    async fn prepare(
        &self,
        code: &str,
        workspace_dir: &Path,
        packages: &[String],
    ) -> Result<String, RuntimeError>;

    /// Builds the argv to run inside the container for the given entry point.
    fn command(&self, entry_point: &str, packages: &[String]) -> Vec<String>;
}

/// The template method: prepare -> command -> Sandbox Driver. Every Runtime
/// flows through exactly this, so behavior changes live in the Runtime impls,
/// not in copies of this function.
pub async fn execute(
    runtime: &dyn Runtime,
    sandbox: &SandboxDriver,
    code: &str,
    config: &ExecutionConfig,
    workspace_dir: &Path,
) -> Result<ExecutionResult, RuntimeError> {
    let entry_point = runtime.prepare(code, workspace_dir, &config.packages).await?;
    let argv = runtime.command(&entry_point, &config.packages);
    Ok(sandbox.run(runtime.image(), &argv, workspace_dir, config).await)
}
