use super::side_effects::{FollowUp, SideEffects};
use crate::config::EngineConfig;
use crate::domain::invoice::{Invoice, InvoiceBalance, InvoiceStatus};
use crate::domain::payment::{Payment, PaymentRequest, PaymentResult, completed_total};
use crate::domain::ports::{
    ChargeRequest, ClockBox, LedgerStoreBox, LedgerTransaction, PaymentGatewayBox,
};
use crate::domain::receipt::Receipt;
use crate::domain::trends::PaymentTrends;
use crate::error::{ReconError, Result};
use crate::infrastructure::clock::SystemClock;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const DEFAULT_DECLINE_REASON: &str = "Payment processor declined";
const GATEWAY_UNAVAILABLE: &str = "gateway_unavailable";
const GATEWAY_TIMEOUT: &str = "gateway_timeout";

/// Applies payments to invoices and answers questions about what is owed.
///
/// `ReconciliationEngine` keeps no state between calls: every operation reads
/// the ledger, and every write goes through a single ledger transaction that
/// is either committed whole or rolled back. Methods take `&self`, so one
/// engine can be shared across tasks behind an `Arc`.
pub struct ReconciliationEngine {
    ledger: LedgerStoreBox,
    gateway: PaymentGatewayBox,
    side_effects: SideEffects,
    clock: ClockBox,
    config: EngineConfig,
}

impl ReconciliationEngine {
    /// Creates a new `ReconciliationEngine` with the default configuration
    /// and the system clock.
    ///
    /// # Arguments
    ///
    /// * `ledger` - The store of customers, invoices and payments.
    /// * `gateway` - The processor payments are charged through.
    /// * `side_effects` - Notification, analytics and dunning adapters.
    pub fn new(
        ledger: LedgerStoreBox,
        gateway: PaymentGatewayBox,
        side_effects: SideEffects,
    ) -> Self {
        Self {
            ledger,
            gateway,
            side_effects,
            clock: Box::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: ClockBox) -> Self {
        self.clock = clock;
        self
    }

    /// Charges a payment against an invoice and reconciles the invoice.
    ///
    /// Validation, missing invoice and already-paid invoice are returned as
    /// errors before anything is written. Otherwise exactly one payment is
    /// persisted, completed or failed according to the gateway, and the
    /// returned result reflects that gateway outcome.
    #[instrument(
        skip(self, request),
        fields(invoice_id = %request.invoice_id, amount = %request.amount)
    )]
    pub async fn process_payment(&self, request: PaymentRequest) -> Result<PaymentResult> {
        let (amount, method) = request.validate()?;

        let invoice = self
            .ledger
            .get_invoice(request.invoice_id)
            .await?
            .ok_or_else(|| ReconError::not_found("invoice"))?;
        if invoice.status == InvoiceStatus::Paid {
            return Err(ReconError::conflict("invoice already paid"));
        }

        let mut payment = Payment::pending(&invoice, amount, method, self.clock.now());

        // No ledger transaction is open while the gateway is in flight.
        match self.charge(&payment).await {
            Ok(()) => payment.complete()?,
            Err(reason) => {
                warn!(payment_reference = %payment.reference, %reason, "payment declined");
                payment.fail(reason)?;
            }
        }

        let reconciled = self.commit_payment(&payment).await?;
        info!(
            payment_reference = %payment.reference,
            status = %payment.status,
            "payment committed"
        );

        let result = PaymentResult::from(&payment);
        let follow_up = match reconciled {
            Some(invoice) => {
                let customer = match self.ledger.get_customer(invoice.customer_id).await {
                    Ok(customer) => customer,
                    Err(e) => {
                        warn!(error = %e, "customer lookup failed after commit");
                        None
                    }
                };
                FollowUp::Completed { customer, payment }
            }
            None => FollowUp::Failed { invoice, payment },
        };
        self.side_effects
            .dispatch(follow_up, self.config.side_effect_timeout)
            .await;

        Ok(result)
    }

    /// Asks the gateway to charge `payment`, folding every kind of failure
    /// into a decline reason.
    async fn charge(&self, payment: &Payment) -> std::result::Result<(), String> {
        let request = ChargeRequest::from(payment);
        let call = self.gateway.charge(&request);
        match tokio::time::timeout(self.config.gateway_timeout, call).await {
            Ok(Ok(response)) if response.approved => Ok(()),
            Ok(Ok(response)) => Err(response
                .reason
                .unwrap_or_else(|| DEFAULT_DECLINE_REASON.to_string())),
            Ok(Err(e)) => {
                warn!(payment_reference = %payment.reference, error = %e, "gateway call failed");
                Err(GATEWAY_UNAVAILABLE.to_string())
            }
            Err(_) => Err(GATEWAY_TIMEOUT.to_string()),
        }
    }

    /// Persists a settled payment, and for a completed one the reconciled
    /// invoice, in one transaction.
    ///
    /// Returns the reconciled invoice when the payment completed.
    async fn commit_payment(&self, payment: &Payment) -> Result<Option<Invoice>> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        match stage_payment(tx.as_mut(), payment, now).await {
            Ok(reconciled) => {
                tx.commit().await?;
                Ok(reconciled)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Invoices of `customer_id` that still have a balance owed.
    #[instrument(skip(self))]
    pub async fn get_outstanding_invoices(&self, customer_id: Uuid) -> Result<Vec<Invoice>> {
        let invoices = self.ledger.list_invoices_for_customer(customer_id).await?;
        Ok(invoices
            .into_iter()
            .filter(|i| i.status.is_outstanding())
            .collect())
    }

    /// Summarizes how promptly `customer_id` pays.
    #[instrument(skip(self))]
    pub async fn analyze_payment_patterns(&self, customer_id: Uuid) -> Result<PaymentTrends> {
        let payments = self.ledger.list_payments_for_customer(customer_id).await?;
        let invoices = self.ledger.list_invoices_for_customer(customer_id).await?;
        Ok(PaymentTrends::compute(customer_id, &payments, &invoices))
    }

    /// Builds the receipt of a completed payment.
    #[instrument(skip(self))]
    pub async fn generate_receipt(&self, payment_id: Uuid) -> Result<Receipt> {
        let payment = self
            .ledger
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| ReconError::not_found("payment"))?;
        if !payment.is_completed() {
            return Err(ReconError::conflict(
                "cannot generate receipt for incomplete payment",
            ));
        }
        let invoice = self
            .ledger
            .get_invoice(payment.invoice_id)
            .await?
            .ok_or_else(|| ReconError::not_found("invoice"))?;
        let customer = self
            .ledger
            .get_customer(payment.customer_id)
            .await?
            .ok_or_else(|| ReconError::not_found("customer"))?;
        Receipt::for_payment(&self.config.receipt_prefix, &payment, &invoice, &customer)
    }

    /// Total, paid and remaining amounts of one invoice, read from a single
    /// consistent view of the ledger.
    #[instrument(skip(self))]
    pub async fn get_invoice_balance(&self, invoice_id: Uuid) -> Result<InvoiceBalance> {
        let mut tx = self.ledger.begin().await?;
        let read = async {
            let invoice = tx
                .get_invoice(invoice_id)
                .await?
                .ok_or_else(|| ReconError::not_found("invoice"))?;
            let payments = tx.list_completed_payments_for_invoice(invoice_id).await?;
            let paid = completed_total(&payments)?;
            Ok::<_, ReconError>(InvoiceBalance::new(&invoice, paid)?)
        }
        .await;
        tx.rollback().await?;
        read
    }

    /// Moves every issued or partially paid invoice due before `as_of` to
    /// `Overdue`, returning the invoices that changed.
    #[instrument(skip(self))]
    pub async fn mark_overdue_invoices(&self, as_of: NaiveDate) -> Result<Vec<Invoice>> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        let staged = async {
            let mut changed = Vec::new();
            for mut invoice in tx.list_invoices().await? {
                if invoice.mark_overdue(as_of, now) {
                    debug!(invoice_number = %invoice.invoice_number, "invoice overdue");
                    tx.save_invoice(invoice.clone()).await?;
                    changed.push(invoice);
                }
            }
            Ok::<_, ReconError>(changed)
        }
        .await;
        match staged {
            Ok(changed) => {
                tx.commit().await?;
                Ok(changed)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Stages `payment` and, when it completed, the invoice status recomputed
/// from every completed payment visible to `tx`.
async fn stage_payment(
    tx: &mut dyn LedgerTransaction,
    payment: &Payment,
    now: DateTime<Utc>,
) -> Result<Option<Invoice>> {
    tx.save_payment(payment.clone()).await?;
    if !payment.is_completed() {
        return Ok(None);
    }

    let mut invoice = tx
        .get_invoice(payment.invoice_id)
        .await?
        .ok_or_else(|| ReconError::not_found("invoice"))?;
    let paid = completed_total(&tx.list_completed_payments_for_invoice(invoice.id).await?)?;
    let previous = invoice.status;
    if invoice.reconcile(paid, now) {
        debug!(
            invoice_number = %invoice.invoice_number,
            from = %previous,
            to = %invoice.status,
            "invoice status changed"
        );
        tx.save_invoice(invoice.clone()).await?;
    }
    if paid > invoice.total {
        warn!(
            invoice_number = %invoice.invoice_number,
            total = %invoice.total,
            %paid,
            "invoice overpaid"
        );
    }
    Ok(Some(invoice))
}
