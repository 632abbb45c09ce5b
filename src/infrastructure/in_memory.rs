use crate::domain::customer::Customer;
use crate::domain::invoice::Invoice;
use crate::domain::payment::Payment;
use crate::domain::ports::{LedgerStore, LedgerTransaction};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

#[derive(Debug, Default)]
struct LedgerState {
    customers: HashMap<Uuid, Customer>,
    invoices: HashMap<Uuid, Invoice>,
    payments: HashMap<Uuid, Payment>,
}

/// A thread-safe in-memory ledger.
///
/// Uses `Arc<RwLock<..>>` so clones share the same data. A transaction holds
/// the write lock for its whole life, so writers are serialized and readers
/// outside a transaction wait until it commits, rolls back or is dropped.
/// Readers never observe staged writes.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn sort_invoices(invoices: &mut [Invoice]) {
    invoices.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.invoice_number.cmp(&b.invoice_number))
    });
}

pub(crate) fn sort_payments(payments: &mut [Payment]) {
    payments.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.reference.cmp(&b.reference))
    });
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        let guard = self.state.clone().write_owned().await;
        Ok(Box::new(InMemoryTransaction {
            state: guard,
            customers: HashMap::new(),
            invoices: HashMap::new(),
            payments: HashMap::new(),
        }))
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        let state = self.state.read().await;
        Ok(state.invoices.get(&id).cloned())
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        let state = self.state.read().await;
        Ok(state.payments.get(&id).cloned())
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>> {
        let state = self.state.read().await;
        Ok(state.customers.get(&id).cloned())
    }

    async fn list_invoices_for_customer(&self, customer_id: Uuid) -> Result<Vec<Invoice>> {
        let state = self.state.read().await;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|i| i.customer_id == customer_id)
            .cloned()
            .collect();
        sort_invoices(&mut invoices);
        Ok(invoices)
    }

    async fn list_payments_for_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect();
        sort_payments(&mut payments);
        Ok(payments)
    }

    async fn list_completed_payments_for_invoice(&self, invoice_id: Uuid) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.invoice_id == invoice_id && p.is_completed())
            .cloned()
            .collect();
        sort_payments(&mut payments);
        Ok(payments)
    }
}

/// Staged writes over an exclusively locked [`InMemoryLedger`].
pub struct InMemoryTransaction {
    state: OwnedRwLockWriteGuard<LedgerState>,
    customers: HashMap<Uuid, Customer>,
    invoices: HashMap<Uuid, Invoice>,
    payments: HashMap<Uuid, Payment>,
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn get_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>> {
        Ok(self
            .invoices
            .get(&id)
            .or_else(|| self.state.invoices.get(&id))
            .cloned())
    }

    async fn list_invoices(&mut self) -> Result<Vec<Invoice>> {
        let mut merged: HashMap<Uuid, &Invoice> =
            self.state.invoices.iter().map(|(k, v)| (*k, v)).collect();
        merged.extend(self.invoices.iter().map(|(k, v)| (*k, v)));
        let mut invoices: Vec<Invoice> = merged.into_values().cloned().collect();
        sort_invoices(&mut invoices);
        Ok(invoices)
    }

    async fn list_completed_payments_for_invoice(
        &mut self,
        invoice_id: Uuid,
    ) -> Result<Vec<Payment>> {
        let mut merged: HashMap<Uuid, &Payment> =
            self.state.payments.iter().map(|(k, v)| (*k, v)).collect();
        merged.extend(self.payments.iter().map(|(k, v)| (*k, v)));
        let mut payments: Vec<Payment> = merged
            .into_values()
            .filter(|p| p.invoice_id == invoice_id && p.is_completed())
            .cloned()
            .collect();
        sort_payments(&mut payments);
        Ok(payments)
    }

    async fn save_customer(&mut self, customer: Customer) -> Result<()> {
        self.customers.insert(customer.id, customer);
        Ok(())
    }

    async fn save_invoice(&mut self, invoice: Invoice) -> Result<()> {
        self.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    async fn save_payment(&mut self, payment: Payment) -> Result<()> {
        self.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction {
            mut state,
            customers,
            invoices,
            payments,
        } = *self;
        state.customers.extend(customers);
        state.invoices.extend(invoices);
        state.payments.extend(payments);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
