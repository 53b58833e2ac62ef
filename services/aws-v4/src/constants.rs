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

/// Signing algorithm name, first line of the string to sign.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
/// Last segment of the credential scope and of the signing key chain.
pub const SCOPE_TERMINATOR: &str = "aws4_request";
/// Service name of request-signed marketplace APIs.
pub const EXECUTE_API: &str = "execute-api";

// Headers used in signed calls.
/// Signing timestamp header.
pub const X_AMZ_DATE: &str = "x-amz-date";
/// Hex encoded SHA256 of the request body.
pub const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";
/// Session token header for temporary credentials.
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
/// Bearer access token header of marketplace APIs.
pub const X_AMZ_ACCESS_TOKEN: &str = "x-amz-access-token";

// Env values used to load credentials.
/// Env holding the access key id.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Env holding the secret access key.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Env holding the optional session token.
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
/// Env holding the signing region.
pub const AWS_REGION: &str = "AWS_REGION";
