use super::{CSharpRuntime, GoRuntime, JavaScriptRuntime, PythonRuntime, Runtime};
use crate::error::RuntimeError;
use crate::sandbox::SandboxDriver;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Component C — process-wide language dispatch.
///
/// Populated once at startup and handed out as `Arc<RuntimeRegistry>`;
/// `register`/`clear` exist for tests and must not be called from
/// production request paths once the registry is in service.
#[derive(Clone, Default)]
pub struct RuntimeRegistry {
    runtimes: HashMap<String, Arc<dyn Runtime>>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the built-in language set, skipping any whose image is not
    /// present on the host. A missing image is a warning, not a fatal error:
    /// the remaining languages stay usable.
    pub async fn with_defaults(sandbox: &SandboxDriver) -> Self {
        let mut registry = Self::new();

        let python = Arc::new(PythonRuntime::default());
        if sandbox.ensure_image(python.image()).await.is_ok() {
            registry.register_aliased(&["python", "py"], python.clone());
        } else {
            warn!(language = "python", "failed to initialize runtime, image unavailable");
        }

        let js = Arc::new(JavaScriptRuntime::default());
        if sandbox.ensure_image(js.image()).await.is_ok() {
            registry.register_aliased(&["javascript", "js", "nodejs", "node"], js.clone());
        } else {
            warn!(language = "javascript", "failed to initialize runtime, image unavailable");
        }

        let csharp = Arc::new(CSharpRuntime::default());
        if sandbox.ensure_image(csharp.image()).await.is_ok() {
            registry.register_aliased(&["csharp", "cs", "dotnet"], csharp.clone());
        } else {
            warn!(language = "csharp", "failed to initialize runtime, image unavailable");
        }

        let go = Arc::new(GoRuntime::default());
        if sandbox.ensure_image(go.image()).await.is_ok() {
            registry.register_aliased(&["go", "golang"], go.clone());
        } else {
            warn!(language = "go", "failed to initialize runtime, image unavailable");
        }

        registry
    }

    pub fn register(&mut self, language: &str, runtime: Arc<dyn Runtime>) {
        self.runtimes.insert(language.to_lowercase(), runtime);
    }

    fn register_aliased(&mut self, aliases: &[&str], runtime: Arc<dyn Runtime>) {
        for alias in aliases {
            self.register(alias, runtime.clone());
        }
    }

    pub fn get(&self, language: &str) -> Result<Arc<dyn Runtime>, RuntimeError> {
        self.runtimes
            .get(&language.to_lowercase())
            .cloned()
            .ok_or_else(|| RuntimeError::UnsupportedLanguage(language.to_string()))
    }

    pub fn is_supported(&self, language: &str) -> bool {
        self.runtimes.contains_key(&language.to_lowercase())
    }

    pub fn list(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.runtimes.keys().cloned().collect();
        languages.sort();
        languages
    }

    /// Test-only: removes every registered runtime.
    pub fn clear(&mut self) {
        self.runtimes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_language_errors() {
        let registry = RuntimeRegistry::new();
        let err = registry.get("ruby").unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedLanguage(_)));
    }

    #[test]
    fn aliases_resolve_to_same_runtime() {
        let mut registry = RuntimeRegistry::new();
        registry.register_aliased(&["python", "py"], Arc::new(PythonRuntime::default()));
        assert!(registry.is_supported("PY"));
        assert!(registry.is_supported("python"));
        assert!(!registry.is_supported("javascript"));
    }

    #[test]
    fn clear_removes_everything() {
        let mut registry = RuntimeRegistry::new();
        registry.register("python", Arc::new(PythonRuntime::default()));
        registry.clear();
        assert!(registry.list().is_empty());
    }
}
