// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Tokio-based file access for spfeed.
//!
//! `TokioFs` implements both `FileRead` and `FileWrite` from `spfeed_core`
//! with Tokio's file system operations. Feed submissions read the document
//! to upload through it and the pipeline writes run artifacts (status
//! snapshots, result reports, request/response dumps) with it.
//!
//! ## Example
//!
//! ```no_run
//! use spfeed_core::Context;
//! use spfeed_file_tokio::TokioFs;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Context::new()
//!         .with_file_read(TokioFs)
//!         .with_file_write(TokioFs);
//!
//!     match ctx.file_read("price_feed.tsv").await {
//!         Ok(content) => println!("Read {} bytes", content.len()),
//!         Err(e) => eprintln!("Failed to read file: {}", e),
//!     }
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use spfeed_core::{Error, FileRead, FileWrite, Result};

/// Tokio-based implementation of the `FileRead` and `FileWrite` traits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl FileRead for TokioFs {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| Error::unexpected(format!("failed to read file {path}")).with_source(e))
    }
}

#[async_trait]
impl FileWrite for TokioFs {
    async fn file_write(&self, path: &str, content: &[u8]) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::unexpected(format!("failed to create directory for {path}"))
                        .with_source(e)
                })?;
            }
        }

        tokio::fs::write(path, content)
            .await
            .map_err(|e| Error::unexpected(format!("failed to write file {path}")).with_source(e))
    }
}
