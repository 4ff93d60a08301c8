use super::Runtime;
use crate::error::RuntimeError;
use crate::packages::validate_packages;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

/// Runs Python source under a slim CPython image. Packages, when requested,
/// install into `/tmp/packages` (the only writable area) and are put on
/// `PYTHONPATH` rather than the interpreter's default site-packages.
pub struct PythonRuntime {
    image: String,
}

impl PythonRuntime {
    pub fn new(image: impl Into<String>) -> Self {
        Self { image: image.into() }
    }
}

impl Default for PythonRuntime {
    fn default() -> Self {
        Self::new("sandkit-python:latest")
    }
}

#[async_trait]
impl Runtime for PythonRuntime {
    fn language_name(&self) -> &str {
        "python"
    }

    fn image(&self) -> &str {
        &self.image
    }

    async fn prepare(
        &self,
        code: &str,
        workspace_dir: &Path,
        packages: &[String],
    ) -> Result<String, RuntimeError> {
        validate_packages(self.language_name(), packages)?;

        if !packages.is_empty() {
            fs::write(workspace_dir.join("requirements.txt"), packages.join("\n")).await?;
        }

        fs::write(workspace_dir.join("code.py"), code).await?;
        Ok("/workspace/code.py".to_string())
    }

    fn command(&self, entry_point: &str, packages: &[String]) -> Vec<String> {
        if packages.is_empty() {
            vec!["python".to_string(), entry_point.to_string()]
        } else {
            vec![
                "sh".to_string(),
                "-c".to_string(),
                format!(
                    "pip install --no-cache-dir -q --target /tmp/packages -r /workspace/requirements.txt && PYTHONPATH=/tmp/packages python {entry_point}"
                ),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_command_has_no_shell() {
        let rt = PythonRuntime::default();
        assert_eq!(
            rt.command("/workspace/code.py", &[]),
            vec!["python", "/workspace/code.py"]
        );
    }

    #[test]
    fn package_command_sets_pythonpath() {
        let rt = PythonRuntime::default();
        let cmd = rt.command("/workspace/code.py", &["numpy".to_string()]);
        assert_eq!(cmd[0], "sh");
        assert!(cmd[2].contains("PYTHONPATH=/tmp/packages"));
    }
}
