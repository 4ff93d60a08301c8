//! Component H — the Dispatcher façade: the one entry point other crates or
//! an HTTP surface embed against. Performs boundary validation before
//! handing off to the Registry/Sandbox or the Task Queue.

use crate::error::DispatchError;
use crate::job::{ExecutionConfig, ExecutionRecord, ExecutionResult, MAX_CODE_BYTES};
use crate::queue::TaskQueue;
use crate::runtime::{self, RuntimeRegistry};
use crate::sandbox::SandboxDriver;
use crate::store::ResultStore;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct Dispatcher {
    registry: Arc<RuntimeRegistry>,
    sandbox: Arc<SandboxDriver>,
    queue: Option<Arc<dyn TaskQueue>>,
    store: Option<Arc<dyn ResultStore>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<RuntimeRegistry>, sandbox: Arc<SandboxDriver>) -> Self {
        Self { registry, sandbox, queue: None, store: None }
    }

    pub fn with_async_backend(mut self, queue: Arc<dyn TaskQueue>, store: Arc<dyn ResultStore>) -> Self {
        self.queue = Some(queue);
        self.store = Some(store);
        self
    }

    fn validate(&self, code: &str, config: &ExecutionConfig) -> Result<(), DispatchError> {
        if code.as_bytes().len() > MAX_CODE_BYTES {
            return Err(DispatchError::Validation(format!(
                "code exceeds the {MAX_CODE_BYTES}-byte limit"
            )));
        }
        config.validate().map_err(DispatchError::Validation)
    }

    /// Drives Registry -> Runtime -> Sandbox Driver inline and returns the
    /// result directly. Backs a synchronous `POST /execute`.
    pub async fn execute_sync(
        &self,
        code: &str,
        language: &str,
        config: ExecutionConfig,
    ) -> Result<ExecutionResult, DispatchError> {
        self.validate(code, &config)?;
        let runtime = self.registry.get(language)?;

        let workspace = TempDir::new().map_err(|e| DispatchError::Validation(e.to_string()))?;
        let result = runtime::execute(
            runtime.as_ref(),
            &self.sandbox,
            code,
            &config,
            &PathBuf::from(workspace.path()),
        )
        .await?;

        Ok(result)
    }

    /// Enqueues a job and returns its id immediately. Backs
    /// `POST /execute/async`.
    pub async fn submit_async(
        &self,
        code: &str,
        language: &str,
        config: ExecutionConfig,
    ) -> Result<String, DispatchError> {
        self.validate(code, &config)?;
        if !self.registry.is_supported(language) {
            return Err(DispatchError::Runtime(crate::error::RuntimeError::UnsupportedLanguage(
                language.to_string(),
            )));
        }

        let queue = self.queue.as_ref().ok_or(DispatchError::BackendUnavailable)?;
        Ok(queue
            .submit(code.to_string(), language.to_string(), config)
            .await?)
    }

    /// Backs `GET /execution/{id}`.
    pub async fn status(&self, id: &str) -> Result<Option<ExecutionRecord>, DispatchError> {
        let store = self.store.as_ref().ok_or(DispatchError::BackendUnavailable)?;
        Ok(store.get(id).await?)
    }

    /// Backs `GET /languages`.
    pub fn languages(&self) -> Vec<String> {
        self.registry.list()
    }

    pub fn is_supported(&self, language: &str) -> bool {
        self.registry.is_supported(language)
    }
}
