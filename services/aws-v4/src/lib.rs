//! AWS Signature Version 4 signer for request-signed marketplace APIs.
//!
//! The signer hashes the exact request body into the signature and takes
//! path and query verbatim from the URI, which is what `execute-api`
//! endpoints expect.
//!
//! ```no_run
//! use spfeed_aws_v4::{RequestSigner, StaticCredentialProvider};
//! use spfeed_core::{Context, Signer};
//!
//! # async fn example() -> spfeed_core::Result<()> {
//! let signer = Signer::new(
//!     Context::new(),
//!     StaticCredentialProvider::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
//!     RequestSigner::new("execute-api", "eu-west-1"),
//! );
//!
//! let body = br#"{"contentType":"text/tab-separated-values; charset=UTF-8"}"#;
//! let mut parts = http::Request::post("https://sellingpartnerapi-eu.amazon.com/feeds/2021-06-30/documents")
//!     .header("x-amz-access-token", "Atza|example")
//!     .body(())?
//!     .into_parts()
//!     .0;
//! signer.sign(&mut parts, body).await?;
//! # Ok(())
//! # }
//! ```

mod constants;
pub use constants::*;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;
