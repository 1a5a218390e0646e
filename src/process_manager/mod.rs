// External process and service supervision
// Invokes the sample-generation, dataset-download and training tools and
// raises typed failures with full captured output.

use crate::error::{EngineError, EngineResult};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run an external executable to completion, capturing stdout and stderr.
///
/// The timeout is a stage-specific budget chosen by the caller. On expiry the
/// child is killed and the call fails with `Timeout`; a non-zero exit fails
/// with `ProcessFailure` carrying the full captured output. Failures are also
/// logged here, with nothing swallowed.
pub async fn run_command(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    envs: &[(&str, &str)],
    timeout: Duration,
) -> EngineResult<ProcessOutput> {
    let command_line = format!("{} {}", program, args.join(" "));
    log::debug!("Running: {}", command_line);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => result?,
        Err(_) => {
            log::error!(
                "{} timed out after {}s",
                command_line,
                timeout.as_secs()
            );
            return Err(EngineError::Timeout {
                command: command_line,
                seconds: timeout.as_secs(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    if !output.status.success() {
        log::error!(
            "{} exited with code {}\nSTDOUT: {}\nSTDERR: {}",
            command_line,
            exit_code,
            stdout,
            stderr
        );
        return Err(EngineError::ProcessFailure {
            command: command_line,
            exit_code,
            stdout,
            stderr,
        });
    }

    Ok(ProcessOutput {
        stdout,
        stderr,
        exit_code,
    })
}

#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// POST a JSON payload to an external HTTP service and parse the JSON reply.
///
/// A transport-level failure maps to `ServiceUnreachable`, a non-2xx status
/// to `ServiceError` with the response body attached, so callers (and users)
/// can tell "service down" from "service returned an error".
pub async fn call_service(
    url: &str,
    payload: serde_json::Value,
    timeout: Duration,
) -> EngineResult<ServiceResponse> {
    let request_url = url.to_string();
    let result = tokio::task::spawn_blocking(move || {
        ureq::post(&request_url).timeout(timeout).send_json(payload)
    })
    .await;

    let response = match result {
        Ok(Ok(response)) => response,
        Ok(Err(ureq::Error::Status(status, response))) => {
            let body = response.into_string().unwrap_or_default();
            log::error!("Service at {} returned {}: {}", url, status, body);
            return Err(EngineError::ServiceError {
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(Err(transport_error)) => {
            log::error!("Failed to reach service at {}: {}", url, transport_error);
            return Err(EngineError::ServiceUnreachable {
                url: url.to_string(),
                detail: transport_error.to_string(),
            });
        }
        Err(join_error) => {
            return Err(EngineError::ServiceUnreachable {
                url: url.to_string(),
                detail: format!("request task failed: {}", join_error),
            });
        }
    };

    let status = response.status();
    let body = response.into_string()?;
    let body = if body.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&body)?
    };
    Ok(ServiceResponse { status, body })
}

/// Probe for a usable Python interpreter.
pub fn python_path() -> String {
    #[cfg(target_os = "windows")]
    let candidates = ["python", "python3", "py"];

    #[cfg(not(target_os = "windows"))]
    let candidates = ["python3", "python"];

    for candidate in candidates {
        if std::process::Command::new(candidate)
            .arg("--version")
            .output()
            .is_ok()
        {
            return candidate.to_string();
        }
    }

    "python3".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_captures_stdout() {
        let output = run_command(
            "sh",
            &args(&["-c", "echo hello"]),
            None,
            &[],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_nonzero_exit_carries_output() {
        let err = run_command(
            "sh",
            &args(&["-c", "echo oops >&2; exit 3"]),
            None,
            &[],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        match err {
            EngineError::ProcessFailure {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr.trim(), "oops");
            }
            other => panic!("expected ProcessFailure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_times_out() {
        let err = run_command(
            "sh",
            &args(&["-c", "sleep 5"]),
            None,
            &[],
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_applies_env_and_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let output = run_command(
            "sh",
            &args(&["-c", "echo $GREETING; pwd"]),
            Some(temp.path()),
            &[("GREETING", "hi")],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let mut lines = output.stdout.lines();
        assert_eq!(lines.next().unwrap(), "hi");
        let cwd = lines.next().unwrap();
        assert!(cwd.contains(
            temp.path()
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
        ));
    }

    #[tokio::test]
    async fn test_call_service_unreachable_is_distinguished() {
        // Nothing listens on this port.
        let err = call_service(
            "http://127.0.0.1:9/generate-features",
            serde_json::json!({}),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();

        match err {
            EngineError::ServiceUnreachable { url, .. } => {
                assert!(url.contains("generate-features"));
            }
            other => panic!("expected ServiceUnreachable, got {:?}", other),
        }
    }

    #[test]
    fn test_service_error_messages_are_distinguishable() {
        let unreachable = EngineError::ServiceUnreachable {
            url: "http://feature-generator:5001".to_string(),
            detail: "connection refused".to_string(),
        };
        let returned = EngineError::ServiceError {
            url: "http://feature-generator:5001".to_string(),
            status: 500,
            body: "boom".to_string(),
        };

        assert!(unreachable.to_string().contains("failed to connect"));
        assert!(returned.to_string().contains("returned status 500"));
    }
}
