//! Generic `Camera` trait and a shell-out still-capture driver.

use std::path::PathBuf;

use async_trait::async_trait;
use roverhub_types::HubError;
use tracing::debug;

/// An encoded (JPEG) still frame.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub data: Vec<u8>,
}

/// An image-capture device.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Stable identifier for this camera, e.g. `"front"`.
    fn id(&self) -> &str;

    /// Capture and return one frame.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Hardware`] if the frame cannot be captured.
    async fn capture(&self) -> Result<CameraFrame, HubError>;
}

/// Shells out to a still-capture binary (`libcamera-still` by default) and
/// reads the file it wrote.
pub struct StillCamera {
    program: String,
    args: Vec<String>,
    output: PathBuf,
}

impl StillCamera {
    /// Capture via `<program> -n -t 500 -o <output>`.
    pub fn new(program: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let args = vec![
            "-n".to_string(),
            "-t".to_string(),
            "500".to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        Self {
            program: program.into(),
            args,
            output,
        }
    }

    /// Fully custom invocation; `output` is the file the command writes.
    pub fn with_args(
        program: impl Into<String>,
        args: Vec<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            output: output.into(),
        }
    }
}

#[async_trait]
impl Camera for StillCamera {
    fn id(&self) -> &str {
        "still"
    }

    async fn capture(&self) -> Result<CameraFrame, HubError> {
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .status()
            .await
            .map_err(|e| HubError::Hardware {
                component: "camera".to_string(),
                details: format!("failed to run {}: {e}", self.program),
            })?;
        if !status.success() {
            return Err(HubError::Hardware {
                component: "camera".to_string(),
                details: format!("{} exited with {status}", self.program),
            });
        }

        let data = tokio::fs::read(&self.output)
            .await
            .map_err(|e| HubError::Hardware {
                component: "camera".to_string(),
                details: format!("read {}: {e}", self.output.display()),
            })?;
        debug!(bytes = data.len(), "captured still frame");
        Ok(CameraFrame { data })
    }
}
