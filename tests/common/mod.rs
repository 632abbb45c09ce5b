#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use invoice_recon::application::engine::ReconciliationEngine;
use invoice_recon::application::side_effects::SideEffects;
use invoice_recon::domain::customer::Customer;
use invoice_recon::domain::invoice::{Invoice, NewInvoice};
use invoice_recon::domain::payment::Payment;
use invoice_recon::domain::ports::{LedgerStore, LedgerTransaction};
use invoice_recon::error::{ReconError, Result};
use invoice_recon::infrastructure::clock::FixedClock;
use invoice_recon::infrastructure::gateway::{ScriptedGateway, ScriptedOutcome};
use invoice_recon::infrastructure::in_memory::InMemoryLedger;
use invoice_recon::infrastructure::sinks::RecordingSideEffects;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// An engine over an in-memory ledger with one customer already on file.
pub struct Fixture {
    pub engine: Arc<ReconciliationEngine>,
    pub ledger: InMemoryLedger,
    pub gateway: ScriptedGateway,
    pub effects: RecordingSideEffects,
    pub customer: Customer,
}

impl Fixture {
    pub async fn new(outcomes: Vec<ScriptedOutcome>) -> Self {
        Self::with_effects(outcomes, RecordingSideEffects::new()).await
    }

    pub async fn with_effects(
        outcomes: Vec<ScriptedOutcome>,
        effects: RecordingSideEffects,
    ) -> Self {
        Self::build(outcomes, effects, None).await
    }

    /// Same as `new`, with the engine clock frozen at `now`.
    pub async fn at(outcomes: Vec<ScriptedOutcome>, now: DateTime<Utc>) -> Self {
        Self::build(outcomes, RecordingSideEffects::new(), Some(now)).await
    }

    async fn build(
        outcomes: Vec<ScriptedOutcome>,
        effects: RecordingSideEffects,
        now: Option<DateTime<Utc>>,
    ) -> Self {
        let ledger = InMemoryLedger::new();
        let gateway = ScriptedGateway::new(outcomes);
        let customer = Customer::new("Globex Ltd");

        let mut tx = ledger.begin().await.unwrap();
        tx.save_customer(customer.clone()).await.unwrap();
        tx.commit().await.unwrap();

        let mut engine = ReconciliationEngine::new(
            Box::new(ledger.clone()),
            Box::new(gateway.clone()),
            SideEffects::uniform(effects.clone()),
        );
        if let Some(now) = now {
            engine = engine.with_clock(Box::new(FixedClock(now)));
        }

        Self {
            engine: Arc::new(engine),
            ledger,
            gateway,
            effects,
            customer,
        }
    }

    /// Issues and stores an invoice for the fixture customer.
    pub async fn issue(&self, number: &str, total: Decimal) -> Invoice {
        let invoice = Invoice::issue(
            NewInvoice {
                invoice_number: number.to_string(),
                customer_id: self.customer.id,
                issue_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                due_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
                subtotal: total,
                tax: Decimal::ZERO,
            },
            Utc::now(),
        )
        .unwrap();
        self.store(invoice.clone()).await;
        invoice
    }

    pub async fn store(&self, invoice: Invoice) {
        let mut tx = self.ledger.begin().await.unwrap();
        tx.save_invoice(invoice).await.unwrap();
        tx.commit().await.unwrap();
    }

    pub async fn invoice(&self, id: Uuid) -> Invoice {
        self.ledger.get_invoice(id).await.unwrap().unwrap()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.ledger
            .list_payments_for_customer(self.customer.id)
            .await
            .unwrap()
    }
}

/// Wraps an [`InMemoryLedger`] and refuses every commit.
#[derive(Clone)]
pub struct CommitFailingLedger {
    pub inner: InMemoryLedger,
}

#[async_trait]
impl LedgerStore for CommitFailingLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        Ok(Box::new(CommitFailingTransaction {
            inner: self.inner.begin().await?,
        }))
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        self.inner.get_invoice(id).await
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        self.inner.get_payment(id).await
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>> {
        self.inner.get_customer(id).await
    }

    async fn list_invoices_for_customer(&self, customer_id: Uuid) -> Result<Vec<Invoice>> {
        self.inner.list_invoices_for_customer(customer_id).await
    }

    async fn list_payments_for_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>> {
        self.inner.list_payments_for_customer(customer_id).await
    }

    async fn list_completed_payments_for_invoice(&self, invoice_id: Uuid) -> Result<Vec<Payment>> {
        self.inner.list_completed_payments_for_invoice(invoice_id).await
    }
}

struct CommitFailingTransaction {
    inner: Box<dyn LedgerTransaction>,
}

#[async_trait]
impl LedgerTransaction for CommitFailingTransaction {
    async fn get_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>> {
        self.inner.get_invoice(id).await
    }

    async fn list_invoices(&mut self) -> Result<Vec<Invoice>> {
        self.inner.list_invoices().await
    }

    async fn list_completed_payments_for_invoice(
        &mut self,
        invoice_id: Uuid,
    ) -> Result<Vec<Payment>> {
        self.inner.list_completed_payments_for_invoice(invoice_id).await
    }

    async fn save_customer(&mut self, customer: Customer) -> Result<()> {
        self.inner.save_customer(customer).await
    }

    async fn save_invoice(&mut self, invoice: Invoice) -> Result<()> {
        self.inner.save_invoice(invoice).await
    }

    async fn save_payment(&mut self, payment: Payment) -> Result<()> {
        self.inner.save_payment(payment).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await?;
        Err(ReconError::persistence("disk full"))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

/// Writes a payments CSV paying `amount` on `invoice` `rows` times.
pub fn generate_payments_csv(
    path: &Path,
    invoice: Uuid,
    amount: &str,
    rows: usize,
) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["invoice", "amount", "method"])?;
    for _ in 0..rows {
        wtr.write_record([invoice.to_string().as_str(), amount, "bank_transfer"])?;
    }

    wtr.flush()?;
    Ok(())
}
