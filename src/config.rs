use std::time::Duration;

/// Tunables for [`crate::application::engine::ReconciliationEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on a single gateway call; exceeding it fails the payment.
    pub gateway_timeout: Duration,
    /// How long a payment call waits for its notification, analytics and
    /// dunning follow-ups before returning without them.
    pub side_effect_timeout: Duration,
    /// Prepended to the payment reference to form the receipt number.
    pub receipt_prefix: String,
}

impl EngineConfig {
    pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_SIDE_EFFECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_RECEIPT_PREFIX: &'static str = "RCPT-";

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn with_side_effect_timeout(mut self, timeout: Duration) -> Self {
        self.side_effect_timeout = timeout;
        self
    }

    pub fn with_receipt_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.receipt_prefix = prefix.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: Self::DEFAULT_GATEWAY_TIMEOUT,
            side_effect_timeout: Self::DEFAULT_SIDE_EFFECT_TIMEOUT,
            receipt_prefix: Self::DEFAULT_RECEIPT_PREFIX.to_string(),
        }
    }
}
