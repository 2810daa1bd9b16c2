//! Device bridge over a child process.
//!
//! Each request spawns the configured bridge program, writes the JSON request
//! to its stdin, closes it, and parses the program's stdout as the JSON reply.
//! The child is killed if the caller stops waiting.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{DeviceRequest, DeviceTransport};
use crate::core::errors::WalletError;

#[derive(Debug, Clone)]
pub struct BridgeTransport {
    program: String,
    args: Vec<String>,
}

impl BridgeTransport {
    pub fn new(command: &[String]) -> Result<Self, WalletError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| WalletError::ConfigError("device bridge command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl DeviceTransport for BridgeTransport {
    async fn exchange(&self, request: &DeviceRequest) -> Result<Value, WalletError> {
        let payload = serde_json::to_vec(request)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WalletError::DeviceUnavailable(format!("spawning {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| WalletError::DeviceUnavailable(format!("writing request: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| WalletError::DeviceUnavailable(format!("waiting for bridge: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "device bridge failed: {}", stderr.trim());
            return Err(WalletError::DeviceUnavailable(format!(
                "bridge exited with {}",
                output.status
            )));
        }
        debug!(method = request.method(), bytes = output.stdout.len(), "device reply");
        serde_json::from_slice(&output.stdout)
            .map_err(|e| WalletError::DeviceUnavailable(format!("unreadable bridge reply: {}", e)))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn sh(script: &str) -> BridgeTransport {
        BridgeTransport::new(&["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap()
    }

    #[tokio::test]
    async fn test_reply_is_parsed() {
        let bridge = sh("cat > /dev/null; echo '{\"result\": true}'");
        let reply = bridge.exchange(&DeviceRequest::CheckPasswordSetting).await.unwrap();
        assert_eq!(reply, json!({"result": true}));
    }

    #[tokio::test]
    async fn test_request_reaches_stdin() {
        let bridge = sh("cat");
        let reply = bridge
            .exchange(&DeviceRequest::GetAddresses { start_index: 0, count: 3 })
            .await
            .unwrap();
        assert_eq!(reply["method"], "getAddresses");
        assert_eq!(reply["params"]["count"], 3);
    }

    #[tokio::test]
    async fn test_failures_are_unavailable() {
        let failing = sh("exit 3");
        assert!(matches!(
            failing.exchange(&DeviceRequest::CheckPasswordSetting).await,
            Err(WalletError::DeviceUnavailable(_))
        ));
        let missing = BridgeTransport::new(&["/nonexistent/bridge".to_string()]).unwrap();
        assert!(matches!(
            missing.exchange(&DeviceRequest::CheckPasswordSetting).await,
            Err(WalletError::DeviceUnavailable(_))
        ));
        assert!(BridgeTransport::new(&[]).is_err());
    }
}
