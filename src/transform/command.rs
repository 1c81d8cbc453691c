// src/transform/command.rs

//! External command transformer.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use anyhow::Context;
use futures::future::{BoxFuture, FutureExt};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{AssetflowError, Result};
use crate::pipeline::Asset;
use crate::transform::{LintReport, Transformer};

/// Environment variable carrying the asset's relative path.
pub const FILE_ENV: &str = "ASSETFLOW_FILE";

/// Runs a shell command with the asset on stdin and takes stdout as output.
///
/// A non-zero exit fails the asset with the command's stderr as message.
#[derive(Debug, Clone)]
pub struct CommandTransformer {
    name: String,
    cmd: String,
    extension: Option<String>,
    cwd: PathBuf,
}

impl CommandTransformer {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            extension: None,
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Rename outputs to this extension (e.g. `css` for a Sass compiler).
    pub fn with_extension(mut self, extension: Option<String>) -> Self {
        self.extension = extension;
        self
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }

    async fn execute(&self, asset: &Asset) -> Result<Output> {
        let path = asset.path_str();
        debug!(transformer = %self.name, path = %path, cmd = %self.cmd, "running transformer");

        let mut cmd = self.shell();
        cmd.current_dir(&self.cwd)
            .env(FILE_ENV, &path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning transformer '{}' for {}", self.name, path))?;

        let stdin = child.stdin.take();
        let write = async {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&asset.contents).await?;
            }
            Ok::<(), io::Error>(())
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output =
            output.with_context(|| format!("waiting for transformer '{}' on {}", self.name, path))?;

        // Tools that ignore stdin close it early; that is not an error.
        if let Err(e) = written {
            if e.kind() != io::ErrorKind::BrokenPipe {
                warn!(transformer = %self.name, path = %path, error = %e, "writing stdin failed");
            }
        }

        Ok(output)
    }
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    match output.status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl Transformer for CommandTransformer {
    fn name(&self) -> &str {
        &self.name
    }

    fn fingerprint(&self) -> String {
        format!(
            "{}\0{}\0{}",
            self.name,
            self.cmd,
            self.extension.as_deref().unwrap_or("")
        )
    }

    fn transform(&self, asset: Asset) -> BoxFuture<'_, Result<Asset>> {
        async move {
            let output = self.execute(&asset).await?;

            if !output.status.success() {
                return Err(AssetflowError::Transformer {
                    transformer: self.name.clone(),
                    path: asset.path,
                    message: failure_message(&output),
                });
            }

            let mut out = Asset {
                contents: output.stdout,
                ..asset
            };
            if let Some(ext) = &self.extension {
                out = out.with_extension(ext);
            }
            Ok(out)
        }
        .boxed()
    }

    fn check<'a>(&'a self, asset: &'a Asset) -> BoxFuture<'a, Result<LintReport>> {
        async move {
            let output = self.execute(asset).await?;

            let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));

            Ok(LintReport {
                passed: output.status.success(),
                diagnostics,
            })
        }
        .boxed()
    }
}
