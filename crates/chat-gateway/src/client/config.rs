//! Gateway client options

use crate::connection::Backoff;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{
    IdentifyPayload, IdentifyProperties, Intents, PresenceUpdatePayload, GATEWAY_VERSION,
};
use crate::transport::Compression;

/// Smallest and largest `large_threshold` the gateway accepts
pub const LARGE_THRESHOLD_RANGE: std::ops::RangeInclusive<u8> = 50..=250;

/// Options for one gateway session
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub token: String,
    pub intents: Intents,
    /// `(shard_id, shard_count)`
    pub shard: (u32, u32),
    pub large_threshold: u8,
    pub compression: Compression,
    /// Presence sent with Identify
    pub presence: Option<PresenceUpdatePayload>,
    pub properties: IdentifyProperties,
    pub version: u8,
    /// Outbound frames buffered per connection
    pub outbound_buffer: usize,
    pub backoff: Backoff,
}

impl GatewayOptions {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            intents: Intents::non_privileged(),
            shard: (0, 1),
            large_threshold: 100,
            compression: Compression::default(),
            presence: None,
            properties: IdentifyProperties::library(),
            version: GATEWAY_VERSION,
            outbound_buffer: 64,
            backoff: Backoff::default(),
        }
    }

    pub fn intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    pub fn shard(mut self, id: u32, count: u32) -> Self {
        self.shard = (id, count);
        self
    }

    pub fn large_threshold(mut self, threshold: u8) -> Self {
        self.large_threshold = threshold;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn presence(mut self, presence: PresenceUpdatePayload) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.token.trim().is_empty() {
            return Err(GatewayError::InvalidOptions("token is empty".to_string()));
        }
        let (id, count) = self.shard;
        if count == 0 || id >= count {
            return Err(GatewayError::InvalidOptions(format!(
                "shard [{id}, {count}] is out of range"
            )));
        }
        if !LARGE_THRESHOLD_RANGE.contains(&self.large_threshold) {
            return Err(GatewayError::InvalidOptions(format!(
                "large_threshold {} must be within 50..=250",
                self.large_threshold
            )));
        }
        Ok(())
    }

    /// Identify payload for a fresh session
    pub fn identify_payload(&self) -> IdentifyPayload {
        IdentifyPayload {
            token: self.token.clone(),
            properties: self.properties.clone(),
            compress: matches!(self.compression, Compression::Payload),
            large_threshold: self.large_threshold,
            shard: [self.shard.0, self.shard.1],
            intents: self.intents,
            presence: self.presence.clone(),
        }
    }
}
