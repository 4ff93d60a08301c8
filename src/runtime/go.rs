use super::Runtime;
use crate::error::RuntimeError;
use crate::packages::validate_packages;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::Path;
use tokio::fs;

/// Runs Go source via `go build && run`. Like C#, no package whitelist is
/// defined here — the upstream adapter this was modeled on let any module
/// path through unchecked, which this crate treats as a gap, not a feature.
pub struct GoRuntime {
    image: String,
}

impl GoRuntime {
    pub fn new(image: impl Into<String>) -> Self {
        Self { image: image.into() }
    }
}

impl Default for GoRuntime {
    fn default() -> Self {
        Self::new("sandkit-golang:latest")
    }
}

#[async_trait]
impl Runtime for GoRuntime {
    fn language_name(&self) -> &str {
        "go"
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
            let mut go_mod = String::from("module main\n\ngo 1.21\n\nrequire (\n");
            for pkg in packages {
                let _ = writeln!(go_mod, "\t{pkg} latest");
            }
            go_mod.push_str(")\n");
            fs::write(workspace_dir.join("go.mod"), go_mod).await?;
        }

        fs::write(workspace_dir.join("main.go"), code).await?;
        Ok("/workspace/main.go".to_string())
    }

    fn command(&self, _entry_point: &str, packages: &[String]) -> Vec<String> {
        let script = if packages.is_empty() {
            "export GOCACHE=/tmp/.cache && export GOMODCACHE=/tmp/.modcache && \
             mkdir -p /tmp/build && cp /workspace/main.go /tmp/build/ && cd /tmp/build && \
             go build -o /tmp/app main.go && /tmp/app"
                .to_string()
        } else {
            "export GOCACHE=/tmp/.cache && export GOMODCACHE=/tmp/.modcache && \
             mkdir -p /tmp/build && cp -r /workspace/* /tmp/build/ && cd /tmp/build && \
             go mod download && go build -o /tmp/app main.go && /tmp/app"
                .to_string()
        };
        vec!["sh".to_string(), "-c".to_string(), script]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;

    #[test]
    fn no_packages_skips_mod_download() {
        let rt = GoRuntime::default();
        let cmd = rt.command("/workspace/main.go", &[]);
        assert!(!cmd[2].contains("go mod download"));
    }

    #[tokio::test]
    async fn rejects_any_package() {
        let rt = GoRuntime::default();
        let dir = tempfile::tempdir().unwrap();
        let err = rt
            .prepare("package main", dir.path(), &["github.com/x/y".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NoWhitelistDefined(_)));
    }
}
