use crate::domain::customer::Customer;
use crate::domain::invoice::{Invoice, InvoiceStatus, NewInvoice};
use crate::domain::ports::LedgerStore;
use crate::error::{ReconError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use uuid::Uuid;

/// Invoice as written in a seed file. `total` is derived on load.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSeed {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

/// Initial ledger contents, read from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerSeed {
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub invoices: Vec<InvoiceSeed>,
}

impl LedgerSeed {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    /// Writes every customer and invoice in one transaction.
    ///
    /// Entries whose id already exists in the ledger are left untouched, so
    /// applying the same seed to a persistent ledger twice is harmless.
    /// Returns the number of invoices inserted.
    pub async fn apply(self, ledger: &dyn LedgerStore, now: DateTime<Utc>) -> Result<usize> {
        let known: Vec<Uuid> = self.customers.iter().map(|c| c.id).collect();
        for invoice in &self.invoices {
            if !known.contains(&invoice.customer_id)
                && ledger.get_customer(invoice.customer_id).await?.is_none()
            {
                return Err(ReconError::not_found(format!(
                    "customer {} of invoice {}",
                    invoice.customer_id, invoice.invoice_number
                )));
            }
        }

        let mut customers = Vec::with_capacity(self.customers.len());
        for customer in self.customers {
            if ledger.get_customer(customer.id).await?.is_none() {
                customers.push(customer);
            }
        }

        let mut inserted = 0;
        let mut tx = ledger.begin().await?;
        for customer in customers {
            tx.save_customer(customer).await?;
        }
        for seed in self.invoices {
            if tx.get_invoice(seed.id).await?.is_some() {
                continue;
            }
            let status = seed.status.unwrap_or(InvoiceStatus::Issued);
            let mut invoice = Invoice::issue(
                NewInvoice {
                    invoice_number: seed.invoice_number,
                    customer_id: seed.customer_id,
                    issue_date: seed.issue_date,
                    due_date: seed.due_date,
                    subtotal: seed.subtotal,
                    tax: seed.tax,
                },
                now,
            )?;
            invoice.id = seed.id;
            invoice.status = status;
            tx.save_invoice(invoice).await?;
            inserted += 1;
        }
        tx.commit().await?;
        Ok(inserted)
    }
}
