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

use reqwest::Client;
use spfeed_core::{Context, OsEnv};
use spfeed_file_tokio::TokioFs;
use spfeed_http_send_reqwest::ReqwestHttpSend;

/// Context reading and writing files with tokio, sending requests with a
/// default reqwest client and reading the process env.
pub fn default_context() -> Context {
    default_context_with_client(Client::new())
}

/// Same as [`default_context`], sending requests with `client`.
pub fn default_context_with_client(client: Client) -> Context {
    Context::new()
        .with_file_read(TokioFs)
        .with_file_write(TokioFs)
        .with_http_send(ReqwestHttpSend::new(client))
        .with_env(OsEnv)
}
