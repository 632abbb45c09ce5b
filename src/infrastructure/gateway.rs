use crate::domain::ports::{ChargeRequest, ChargeResponse, PaymentGateway};
use crate::error::{GatewayError, ReconError, Result};
use async_trait::async_trait;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stand-in for a real processor: approves with a fixed probability.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    approval_rate: f64,
}

impl SimulatedGateway {
    pub const DEFAULT_APPROVAL_RATE: f64 = 0.9;

    /// `approval_rate` is clamped into `0.0..=1.0`; NaN and infinities are
    /// rejected.
    pub fn new(approval_rate: f64) -> Result<Self> {
        if !approval_rate.is_finite() {
            return Err(ReconError::validation(format!(
                "approval rate must be a finite number, got {approval_rate}"
            )));
        }
        Ok(Self {
            approval_rate: approval_rate.clamp(0.0, 1.0),
        })
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self {
            approval_rate: Self::DEFAULT_APPROVAL_RATE,
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(
        &self,
        request: &ChargeRequest,
    ) -> std::result::Result<ChargeResponse, GatewayError> {
        let approved = rand::thread_rng().gen_bool(self.approval_rate);
        tracing::debug!(reference = %request.reference, approved, "simulated charge");
        if approved {
            Ok(ChargeResponse::approved())
        } else {
            Ok(ChargeResponse::declined("Payment processor declined"))
        }
    }
}

/// One scripted gateway reaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedOutcome {
    Approve,
    Decline(Option<String>),
    Unavailable,
    /// Sleeps before approving; used to exercise timeouts.
    Delay(Duration),
}

/// Deterministic gateway replaying a fixed sequence of outcomes.
///
/// Once the script is exhausted every further charge is approved. Clones share
/// the script and the log of received requests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
    received: Arc<Mutex<Vec<ChargeRequest>>>,
}

impl ScriptedGateway {
    pub fn new(outcomes: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self {
            script: Arc::new(Mutex::new(outcomes.into_iter().collect())),
            received: Arc::default(),
        }
    }

    pub fn approve_all() -> Self {
        Self::default()
    }

    /// Requests received so far, in call order.
    pub fn received(&self) -> Vec<ChargeRequest> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn charge(
        &self,
        request: &ChargeRequest,
    ) -> std::result::Result<ChargeResponse, GatewayError> {
        let next = {
            if let Ok(mut received) = self.received.lock() {
                received.push(request.clone());
            }
            self.script
                .lock()
                .ok()
                .and_then(|mut script| script.pop_front())
                .unwrap_or(ScriptedOutcome::Approve)
        };

        match next {
            ScriptedOutcome::Approve => Ok(ChargeResponse::approved()),
            ScriptedOutcome::Decline(Some(reason)) => Ok(ChargeResponse::declined(reason)),
            ScriptedOutcome::Decline(None) => Ok(ChargeResponse {
                approved: false,
                reason: None,
            }),
            ScriptedOutcome::Unavailable => Err(GatewayError::Unavailable(
                "connection refused".to_string(),
            )),
            ScriptedOutcome::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(ChargeResponse::approved())
            }
        }
    }
}
