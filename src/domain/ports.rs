use super::customer::Customer;
use super::invoice::Invoice;
use super::money::Amount;
use super::payment::{Payment, PaymentMethod};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Read access to committed ledger state, plus the entry point for writes.
///
/// Every write goes through a [`LedgerTransaction`] obtained from `begin`.
/// Reads on the store itself only ever observe committed data.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>>;
    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>>;
    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>>;
    async fn list_invoices_for_customer(&self, customer_id: Uuid) -> Result<Vec<Invoice>>;
    async fn list_payments_for_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>>;
    async fn list_completed_payments_for_invoice(&self, invoice_id: Uuid) -> Result<Vec<Payment>>;
}

/// A unit of work against the ledger.
///
/// Reads see the committed state overlaid with this transaction's own staged
/// writes. Staged writes become visible to others only on `commit`, all at
/// once. Dropping the transaction without committing discards them.
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn get_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>>;
    async fn list_invoices(&mut self) -> Result<Vec<Invoice>>;
    async fn list_completed_payments_for_invoice(&mut self, invoice_id: Uuid)
    -> Result<Vec<Payment>>;
    async fn save_customer(&mut self, customer: Customer) -> Result<()>;
    async fn save_invoice(&mut self, invoice: Invoice) -> Result<()>;
    async fn save_payment(&mut self, payment: Payment) -> Result<()>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// What the gateway is asked to charge.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    pub reference: String,
    pub method: PaymentMethod,
    pub amount: Amount,
}

impl From<&Payment> for ChargeRequest {
    fn from(payment: &Payment) -> Self {
        Self {
            reference: payment.reference.clone(),
            method: payment.method,
            amount: payment.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeResponse {
    pub approved: bool,
    pub reason: Option<String>,
}

impl ChargeResponse {
    pub fn approved() -> Self {
        Self {
            approved: true,
            reason: None,
        }
    }

    pub fn declined(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        request: &ChargeRequest,
    ) -> std::result::Result<ChargeResponse, GatewayError>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_payment_outcome(&self, customer: &Customer, payment: &Payment) -> Result<()>;
}

#[async_trait]
pub trait AnalyticsRecorder: Send + Sync {
    async fn record_payment(&self, payment: &Payment) -> Result<()>;
}

#[async_trait]
pub trait DunningHandler: Send + Sync {
    async fn handle_failed_payment(&self, invoice: &Invoice, payment: &Payment) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type NotificationSinkBox = Box<dyn NotificationSink>;
pub type AnalyticsRecorderBox = Box<dyn AnalyticsRecorder>;
pub type DunningHandlerBox = Box<dyn DunningHandler>;
pub type ClockBox = Box<dyn Clock>;
