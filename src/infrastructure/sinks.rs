use crate::domain::customer::Customer;
use crate::domain::invoice::Invoice;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{AnalyticsRecorder, DunningHandler, NotificationSink};
use crate::error::{ReconError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Side effects that only emit structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSideEffects;

#[async_trait]
impl NotificationSink for TracingSideEffects {
    async fn notify_payment_outcome(&self, customer: &Customer, payment: &Payment) -> Result<()> {
        tracing::info!(
            customer = %customer.name,
            payment_reference = %payment.reference,
            status = %payment.status,
            "payment outcome notification"
        );
        Ok(())
    }
}

#[async_trait]
impl AnalyticsRecorder for TracingSideEffects {
    async fn record_payment(&self, payment: &Payment) -> Result<()> {
        tracing::info!(
            payment_reference = %payment.reference,
            amount = %payment.amount,
            method = %payment.method,
            "payment recorded for analytics"
        );
        Ok(())
    }
}

#[async_trait]
impl DunningHandler for TracingSideEffects {
    async fn handle_failed_payment(&self, invoice: &Invoice, payment: &Payment) -> Result<()> {
        tracing::info!(
            invoice_number = %invoice.invoice_number,
            payment_reference = %payment.reference,
            reason = payment.failure_reason.as_deref().unwrap_or_default(),
            "dunning follow-up scheduled"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SideEffectEvent {
    Notified {
        customer_id: Uuid,
        payment_id: Uuid,
        status: PaymentStatus,
    },
    Recorded {
        payment_id: Uuid,
    },
    Dunning {
        invoice_id: Uuid,
        payment_id: Uuid,
    },
}

/// Captures every side effect it receives, optionally failing each one after
/// recording it. Clones share the captured events.
#[derive(Debug, Clone, Default)]
pub struct RecordingSideEffects {
    events: Arc<Mutex<Vec<SideEffectEvent>>>,
    failing: bool,
}

impl RecordingSideEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records events but reports every delivery as failed.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<SideEffectEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn push(&self, event: SideEffectEvent) -> Result<()> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        if self.failing {
            Err(ReconError::SideEffect("delivery refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NotificationSink for RecordingSideEffects {
    async fn notify_payment_outcome(&self, customer: &Customer, payment: &Payment) -> Result<()> {
        self.push(SideEffectEvent::Notified {
            customer_id: customer.id,
            payment_id: payment.id,
            status: payment.status,
        })
    }
}

#[async_trait]
impl AnalyticsRecorder for RecordingSideEffects {
    async fn record_payment(&self, payment: &Payment) -> Result<()> {
        self.push(SideEffectEvent::Recorded {
            payment_id: payment.id,
        })
    }
}

#[async_trait]
impl DunningHandler for RecordingSideEffects {
    async fn handle_failed_payment(&self, invoice: &Invoice, payment: &Payment) -> Result<()> {
        self.push(SideEffectEvent::Dunning {
            invoice_id: invoice.id,
            payment_id: payment.id,
        })
    }
}
