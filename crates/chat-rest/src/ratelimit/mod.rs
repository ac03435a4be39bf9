//! Rate limiting
//!
//! - `bucket`: bucket keys, header parsing, per-bucket FIFO lock
//! - `governor`: the request pipeline wrapped around every HTTP call

mod bucket;
mod governor;

pub use bucket::{
    BucketKey, BucketState, RateLimitBucket, RateLimitHeaders, RateLimited, MAX_SERVER_WAIT,
};
pub use governor::{GovernorConfig, RequestGovernor};
