use super::customer::Customer;
use super::invoice::Invoice;
use super::payment::{Payment, PaymentMethod};
use crate::error::{ReconError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Proof of a completed payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_number: String,
    pub payment_date: DateTime<Utc>,
    pub customer_name: String,
    pub invoice_number: String,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
}

impl Receipt {
    /// Builds the receipt for `payment`, which must be completed.
    pub fn for_payment(
        prefix: &str,
        payment: &Payment,
        invoice: &Invoice,
        customer: &Customer,
    ) -> Result<Self> {
        if !payment.is_completed() {
            return Err(ReconError::conflict(
                "cannot generate receipt for incomplete payment",
            ));
        }
        Ok(Self {
            receipt_number: format!("{prefix}{}", payment.reference),
            payment_date: payment.timestamp,
            customer_name: customer.name.clone(),
            invoice_number: invoice.invoice_number.clone(),
            amount: payment.amount.value(),
            payment_method: payment.method,
        })
    }
}
