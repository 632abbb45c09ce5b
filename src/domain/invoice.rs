use crate::error::{ReconError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    PartiallyPaid,
    Paid,
    Overdue,
    Void,
}

impl InvoiceStatus {
    /// Statuses that imply a nonzero balance is still owed.
    pub fn is_outstanding(self) -> bool {
        matches!(
            self,
            InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue
        )
    }

    /// Derives the status of an invoice after a completed payment.
    ///
    /// `total_paid` must be the sum of every completed payment against the
    /// invoice, including the one just applied. When nothing has been paid the
    /// current status is returned as is.
    pub fn after_payment(self, total: Decimal, total_paid: Decimal) -> InvoiceStatus {
        if total_paid >= total {
            InvoiceStatus::Paid
        } else if total_paid > Decimal::ZERO {
            InvoiceStatus::PartiallyPaid
        } else {
            self
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "draft"),
            InvoiceStatus::Issued => write!(f, "issued"),
            InvoiceStatus::PartiallyPaid => write!(f, "partially_paid"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Overdue => write!(f, "overdue"),
            InvoiceStatus::Void => write!(f, "void"),
        }
    }
}

/// An invoice as held by the ledger.
///
/// Payments reference the invoice through `Payment::invoice_id`; the invoice
/// itself never holds payment objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields needed to issue a new invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    pub tax: Decimal,
}

impl Invoice {
    /// Issues an invoice, fixing `total = subtotal + tax`.
    pub fn issue(new: NewInvoice, now: DateTime<Utc>) -> Result<Self> {
        let total = new
            .subtotal
            .checked_add(new.tax)
            .ok_or_else(|| ReconError::validation("amount out of range"))?;
        Ok(Self {
            id: Uuid::new_v4(),
            invoice_number: new.invoice_number,
            customer_id: new.customer_id,
            issue_date: new.issue_date,
            due_date: new.due_date,
            total,
            subtotal: new.subtotal,
            tax: new.tax,
            status: InvoiceStatus::Issued,
            created_at: now,
            updated_at: None,
        })
    }

    /// Applies the cumulative completed amount to the invoice status.
    ///
    /// Returns `true` when the status changed.
    pub fn reconcile(&mut self, total_paid: Decimal, now: DateTime<Utc>) -> bool {
        let next = self.status.after_payment(self.total, total_paid);
        if next == self.status {
            return false;
        }
        self.status = next;
        self.updated_at = Some(now);
        true
    }

    /// Moves an unpaid invoice past its due date to `Overdue`.
    ///
    /// Returns `true` when the status changed.
    pub fn mark_overdue(&mut self, as_of: NaiveDate, now: DateTime<Utc>) -> bool {
        let eligible = matches!(
            self.status,
            InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid
        );
        if !eligible || self.due_date >= as_of {
            return false;
        }
        self.status = InvoiceStatus::Overdue;
        self.updated_at = Some(now);
        true
    }
}

/// Outstanding balance of a single invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceBalance {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub total: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
}

impl InvoiceBalance {
    pub fn new(invoice: &Invoice, paid: Decimal) -> Result<Self> {
        let remaining = invoice
            .total
            .checked_sub(paid)
            .ok_or_else(|| ReconError::validation("amount out of range"))?;
        Ok(Self {
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            status: invoice.status,
            total: invoice.total,
            paid,
            remaining,
        })
    }
}
