use super::Runtime;
use crate::error::RuntimeError;
use crate::packages::validate_packages;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use tokio::fs;

/// Runs JavaScript source under a Node.js image. Packages install into a
/// `/tmp` copy of the project (cache under `/tmp/npm-cache`) since
/// `/workspace` is mounted read-only.
pub struct JavaScriptRuntime {
    image: String,
}

impl JavaScriptRuntime {
    pub fn new(image: impl Into<String>) -> Self {
        Self { image: image.into() }
    }
}

impl Default for JavaScriptRuntime {
    fn default() -> Self {
        Self::new("sandkit-nodejs:latest")
    }
}

#[async_trait]
impl Runtime for JavaScriptRuntime {
    fn language_name(&self) -> &str {
        "javascript"
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
            let deps: serde_json::Map<String, serde_json::Value> = packages
                .iter()
                .map(|pkg| (pkg.clone(), json!("latest")))
                .collect();
            let manifest = json!({
                "name": "code-execution",
                "version": "1.0.0",
                "dependencies": deps,
            });
            fs::write(
                workspace_dir.join("package.json"),
                serde_json::to_string_pretty(&manifest).expect("manifest is valid json"),
            )
            .await?;
        }

        fs::write(workspace_dir.join("code.js"), code).await?;
        Ok("/workspace/code.js".to_string())
    }

    fn command(&self, entry_point: &str, packages: &[String]) -> Vec<String> {
        if packages.is_empty() {
            vec!["node".to_string(), entry_point.to_string()]
        } else {
            vec![
                "sh".to_string(),
                "-c".to_string(),
                format!(
                    "cp /workspace/package.json /tmp/ && cd /tmp && npm install --cache /tmp/npm-cache --no-progress 2>&1 && NODE_PATH=/tmp/node_modules node {entry_point}"
                ),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_command_runs_node_directly() {
        let rt = JavaScriptRuntime::default();
        assert_eq!(rt.command("/workspace/code.js", &[]), vec!["node", "/workspace/code.js"]);
    }

    #[test]
    fn package_command_installs_from_tmp() {
        let rt = JavaScriptRuntime::default();
        let cmd = rt.command("/workspace/code.js", &["lodash".to_string()]);
        assert!(cmd[2].contains("npm install"));
        assert!(cmd[2].contains("NODE_PATH=/tmp/node_modules"));
    }
}
