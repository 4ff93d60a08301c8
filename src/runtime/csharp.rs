use super::Runtime;
use crate::error::RuntimeError;
use crate::packages::validate_packages;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

const CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <OutputType>Exe</OutputType>
    <TargetFramework>net8.0</TargetFramework>
    <ImplicitUsings>disable</ImplicitUsings>
    <Nullable>disable</Nullable>
  </PropertyGroup>
</Project>
"#;

/// Runs C# source via `dotnet run`. No package whitelist is defined for this
/// language, so any non-empty package list is rejected before a workspace is
/// even written.
pub struct CSharpRuntime {
    image: String,
}

impl CSharpRuntime {
    pub fn new(image: impl Into<String>) -> Self {
        Self { image: image.into() }
    }
}

impl Default for CSharpRuntime {
    fn default() -> Self {
        Self::new("sandkit-csharp:latest")
    }
}

#[async_trait]
impl Runtime for CSharpRuntime {
    fn language_name(&self) -> &str {
        "csharp"
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

        fs::write(workspace_dir.join("Program.csproj"), CSPROJ).await?;
        fs::write(workspace_dir.join("Program.cs"), code).await?;
        Ok("/workspace".to_string())
    }

    fn command(&self, _entry_point: &str, _packages: &[String]) -> Vec<String> {
        // obj/ and bin/ land under the build tree, so build happens in /tmp,
        // not the read-only /workspace mount.
        vec![
            "sh".to_string(),
            "-c".to_string(),
            "mkdir -p /tmp/build && cp -r /workspace/* /tmp/build/ && cd /tmp/build && \
             DOTNET_CLI_HOME=/tmp DOTNET_SKIP_FIRST_TIME_EXPERIENCE=1 DOTNET_CLI_TELEMETRY_OPTOUT=1 \
             dotnet run"
                .to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_builds_under_tmp() {
        let rt = CSharpRuntime::default();
        let cmd = rt.command("/workspace", &[]);
        assert!(cmd[2].contains("/tmp/build"));
        assert!(cmd[2].contains("dotnet run"));
    }
}
