use super::in_memory::{sort_invoices, sort_payments};
use crate::domain::customer::Customer;
use crate::domain::invoice::Invoice;
use crate::domain::payment::Payment;
use crate::domain::ports::{LedgerStore, LedgerTransaction};
use crate::error::{ReconError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Column Family for customer records.
pub const CF_CUSTOMERS: &str = "customers";
/// Column Family for invoices.
pub const CF_INVOICES: &str = "invoices";
/// Column Family for payment attempts.
pub const CF_PAYMENTS: &str = "payments";

/// A persistent ledger backed by RocksDB.
///
/// Customers, invoices and payments live in separate Column Families, keyed by
/// their UUID bytes and stored as JSON. A transaction holds the writer mutex
/// and commits all of its staged writes in a single `WriteBatch`, so readers
/// never observe half of a commit.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbLedger {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDbLedger {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_CUSTOMERS, CF_INVOICES, CF_PAYMENTS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }
}

fn cf<'a>(db: &'a DB, name: &str) -> Result<&'a rocksdb::ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| ReconError::persistence(format!("{name} column family not found")))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| ReconError::persistence(format!("Serialization error: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| ReconError::persistence(format!("Deserialization error: {e}")))
}

fn get<T: DeserializeOwned>(db: &DB, family: &str, id: Uuid) -> Result<Option<T>> {
    let handle = cf(db, family)?;
    match db.get_cf(handle, id.as_bytes())? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn scan<T: DeserializeOwned>(db: &DB, family: &str) -> Result<Vec<T>> {
    let handle = cf(db, family)?;
    let mut values = Vec::new();
    for item in db.iterator_cf(handle, IteratorMode::Start) {
        let (_key, value) = item?;
        values.push(decode(&value)?);
    }
    Ok(values)
}

#[async_trait]
impl LedgerStore for RocksDbLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        let guard = self.writer.clone().lock_owned().await;
        Ok(Box::new(RocksDbTransaction {
            db: self.db.clone(),
            _guard: guard,
            customers: HashMap::new(),
            invoices: HashMap::new(),
            payments: HashMap::new(),
        }))
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        get(&self.db, CF_INVOICES, id)
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        get(&self.db, CF_PAYMENTS, id)
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>> {
        get(&self.db, CF_CUSTOMERS, id)
    }

    async fn list_invoices_for_customer(&self, customer_id: Uuid) -> Result<Vec<Invoice>> {
        let mut invoices: Vec<Invoice> = scan::<Invoice>(&self.db, CF_INVOICES)?
            .into_iter()
            .filter(|i| i.customer_id == customer_id)
            .collect();
        sort_invoices(&mut invoices);
        Ok(invoices)
    }

    async fn list_payments_for_customer(&self, customer_id: Uuid) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = scan::<Payment>(&self.db, CF_PAYMENTS)?
            .into_iter()
            .filter(|p| p.customer_id == customer_id)
            .collect();
        sort_payments(&mut payments);
        Ok(payments)
    }

    async fn list_completed_payments_for_invoice(&self, invoice_id: Uuid) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = scan::<Payment>(&self.db, CF_PAYMENTS)?
            .into_iter()
            .filter(|p| p.invoice_id == invoice_id && p.is_completed())
            .collect();
        sort_payments(&mut payments);
        Ok(payments)
    }
}

/// Staged writes waiting for a single atomic `WriteBatch`.
pub struct RocksDbTransaction {
    db: Arc<DB>,
    _guard: OwnedMutexGuard<()>,
    customers: HashMap<Uuid, Customer>,
    invoices: HashMap<Uuid, Invoice>,
    payments: HashMap<Uuid, Payment>,
}

#[async_trait]
impl LedgerTransaction for RocksDbTransaction {
    async fn get_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>> {
        if let Some(invoice) = self.invoices.get(&id) {
            return Ok(Some(invoice.clone()));
        }
        get(&self.db, CF_INVOICES, id)
    }

    async fn list_invoices(&mut self) -> Result<Vec<Invoice>> {
        let mut merged: HashMap<Uuid, Invoice> = scan::<Invoice>(&self.db, CF_INVOICES)?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
        merged.extend(self.invoices.iter().map(|(k, v)| (*k, v.clone())));
        let mut invoices: Vec<Invoice> = merged.into_values().collect();
        sort_invoices(&mut invoices);
        Ok(invoices)
    }

    async fn list_completed_payments_for_invoice(
        &mut self,
        invoice_id: Uuid,
    ) -> Result<Vec<Payment>> {
        let mut merged: HashMap<Uuid, Payment> = scan::<Payment>(&self.db, CF_PAYMENTS)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        merged.extend(self.payments.iter().map(|(k, v)| (*k, v.clone())));
        let mut payments: Vec<Payment> = merged
            .into_values()
            .filter(|p| p.invoice_id == invoice_id && p.is_completed())
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
        let mut batch = WriteBatch::default();
        {
            let customers = cf(&self.db, CF_CUSTOMERS)?;
            for (id, customer) in &self.customers {
                batch.put_cf(customers, id.as_bytes(), encode(customer)?);
            }
            let invoices = cf(&self.db, CF_INVOICES)?;
            for (id, invoice) in &self.invoices {
                batch.put_cf(invoices, id.as_bytes(), encode(invoice)?);
            }
            let payments = cf(&self.db, CF_PAYMENTS)?;
            for (id, payment) in &self.payments {
                batch.put_cf(payments, id.as_bytes(), encode(payment)?);
            }
        }
        self.db.write(batch)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
