use log::{info, warn};
use serde::Serialize;
use spfeed_core::Context;
use std::path::PathBuf;

/// Writes post-mortem files into the configured artifact directory.
///
/// Without a directory every write is a no-op. Write failures are logged and
/// never fail the run.
#[derive(Debug, Clone)]
pub struct Artifacts {
    ctx: Context,
    dir: Option<PathBuf>,
}

impl Artifacts {
    /// Create a sink writing below `dir`.
    pub fn new(ctx: Context, dir: Option<PathBuf>) -> Self {
        Self { ctx, dir }
    }

    /// Create a sink that drops everything.
    pub fn disabled() -> Self {
        Self::new(Context::new(), None)
    }

    /// Write `content` to `name`, replacing the previous file.
    pub async fn write(&self, name: &str, content: &[u8]) {
        let Some(dir) = &self.dir else {
            return;
        };

        let path = dir.join(name);
        let path = path.to_string_lossy();
        match self.ctx.file_write(&path, content).await {
            Ok(()) => info!("saved {path}"),
            Err(err) => warn!("failed to save {path}: {err}"),
        }
    }

    /// Write `value` as pretty printed JSON.
    pub async fn write_json(&self, name: &str, value: &impl Serialize) {
        match serde_json::to_vec_pretty(value) {
            Ok(content) => self.write(name, &content).await,
            Err(err) => warn!("failed to serialize {name}: {err}"),
        }
    }
}
