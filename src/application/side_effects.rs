use crate::domain::customer::Customer;
use crate::domain::invoice::Invoice;
use crate::domain::payment::Payment;
use crate::domain::ports::{
    AnalyticsRecorder, AnalyticsRecorderBox, DunningHandler, DunningHandlerBox, NotificationSink,
    NotificationSinkBox,
};
use crate::infrastructure::sinks::TracingSideEffects;
use std::sync::Arc;
use std::time::Duration;

/// What happened to a committed payment, as handed to the side effects.
pub(crate) enum FollowUp {
    Completed {
        customer: Option<Customer>,
        payment: Payment,
    },
    Failed {
        invoice: Invoice,
        payment: Payment,
    },
}

impl FollowUp {
    fn payment(&self) -> &Payment {
        match self {
            FollowUp::Completed { payment, .. } | FollowUp::Failed { payment, .. } => payment,
        }
    }
}

/// The follow-up actions fired after a payment has been committed.
///
/// Every dispatch is best-effort: failures are logged and dropped, never
/// returned to the caller. Clones share the same adapters.
#[derive(Clone)]
pub struct SideEffects {
    notifier: Arc<dyn NotificationSink>,
    analytics: Arc<dyn AnalyticsRecorder>,
    dunning: Arc<dyn DunningHandler>,
}

impl SideEffects {
    pub fn new(
        notifier: NotificationSinkBox,
        analytics: AnalyticsRecorderBox,
        dunning: DunningHandlerBox,
    ) -> Self {
        Self {
            notifier: Arc::from(notifier),
            analytics: Arc::from(analytics),
            dunning: Arc::from(dunning),
        }
    }

    /// Routes all three concerns to clones of one adapter.
    pub fn uniform<S>(sink: S) -> Self
    where
        S: NotificationSink + AnalyticsRecorder + DunningHandler + Clone + 'static,
    {
        Self::new(
            Box::new(sink.clone()),
            Box::new(sink.clone()),
            Box::new(sink),
        )
    }

    /// Runs the follow-up on its own task and waits for it at most `limit`.
    ///
    /// A follow-up that panics is logged. One still running after `limit`
    /// keeps going in the background while the caller moves on.
    pub(crate) async fn dispatch(&self, follow_up: FollowUp, limit: Duration) {
        let reference = follow_up.payment().reference.clone();
        let effects = self.clone();
        let task = tokio::spawn(async move {
            match follow_up {
                FollowUp::Completed { customer, payment } => {
                    effects.payment_completed(customer.as_ref(), &payment).await
                }
                FollowUp::Failed { invoice, payment } => {
                    effects.payment_failed(&invoice, &payment).await
                }
            }
        });

        match tokio::time::timeout(limit, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                payment_reference = %reference,
                error = %e,
                "side effects aborted"
            ),
            Err(_) => tracing::warn!(
                payment_reference = %reference,
                limit_ms = limit.as_millis() as u64,
                "side effects still running, detached"
            ),
        }
    }

    async fn payment_completed(&self, customer: Option<&Customer>, payment: &Payment) {
        match customer {
            Some(customer) => {
                if let Err(e) = self.notifier.notify_payment_outcome(customer, payment).await {
                    tracing::warn!(
                        payment_reference = %payment.reference,
                        error = %e,
                        "payment confirmation not delivered"
                    );
                }
            }
            None => tracing::warn!(
                payment_reference = %payment.reference,
                customer_id = %payment.customer_id,
                "customer missing, payment confirmation skipped"
            ),
        }

        if let Err(e) = self.analytics.record_payment(payment).await {
            tracing::warn!(
                payment_reference = %payment.reference,
                error = %e,
                "payment analytics not recorded"
            );
        }
    }

    async fn payment_failed(&self, invoice: &Invoice, payment: &Payment) {
        if let Err(e) = self.dunning.handle_failed_payment(invoice, payment).await {
            tracing::warn!(
                payment_reference = %payment.reference,
                invoice_number = %invoice.invoice_number,
                error = %e,
                "dunning follow-up not started"
            );
        }
    }
}

impl Default for SideEffects {
    fn default() -> Self {
        Self::uniform(TracingSideEffects)
    }
}
