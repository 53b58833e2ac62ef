#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use spfeed_core::*;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::{default_context, default_context_with_client};

#[cfg(feature = "aws")]
pub mod aws {
    pub use spfeed_aws_v4::*;
}

#[cfg(feature = "feeds")]
pub mod feeds {
    pub use spfeed_feeds::*;

    #[cfg(feature = "default-context")]
    use crate::default_context;

    /// Pipeline on the default context, configured from the process env.
    #[cfg(feature = "default-context")]
    pub fn default_pipeline() -> Result<FeedPipeline> {
        let ctx = default_context();
        let config = Config::from_env(&ctx)?;
        Ok(FeedPipeline::new(ctx, config))
    }
}
