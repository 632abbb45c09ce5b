use super::invoice::Invoice;
use super::money::Amount;
use crate::error::{ReconError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// How the customer pays. Opaque to the engine beyond being a known token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    BankTransfer,
    Ach,
    Wire,
    Check,
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Ach => "ach",
            PaymentMethod::Wire => "wire",
            PaymentMethod::Check => "check",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "debit_card" => Ok(PaymentMethod::DebitCard),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "ach" => Ok(PaymentMethod::Ach),
            "wire" => Ok(PaymentMethod::Wire),
            "check" => Ok(PaymentMethod::Check),
            "paypal" => Ok(PaymentMethod::Paypal),
            other => Err(ReconError::validation(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

/// A single payment attempt against an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    /// Externally visible token, generated once and never reused.
    pub reference: String,
    pub invoice_id: Uuid,
    /// Always the customer of `invoice_id`.
    pub customer_id: Uuid,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Payment {
    /// Creates a pending attempt against `invoice` with a fresh reference.
    pub fn pending(
        invoice: &Invoice,
        amount: Amount,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: Uuid::new_v4().to_string(),
            invoice_id: invoice.id,
            customer_id: invoice.customer_id,
            amount,
            method,
            status: PaymentStatus::Pending,
            timestamp: now,
            failure_reason: None,
        }
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(PaymentStatus::Completed)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(PaymentStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    fn transition(&mut self, next: PaymentStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(ReconError::conflict(format!(
                "payment {} is already {}",
                self.reference, self.status
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Sum of the amounts of the completed payments in `payments`.
///
/// Fails with a validation error instead of overflowing `Decimal`.
pub fn completed_total<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> Result<Decimal> {
    payments
        .into_iter()
        .filter(|p| p.is_completed())
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.amount.value()))
        .ok_or_else(|| ReconError::validation("amount out of range"))
}

/// A request to apply a payment to an invoice, as received from a caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentRequest {
    #[serde(rename = "invoice")]
    pub invoice_id: Uuid,
    pub amount: Decimal,
    #[serde(default)]
    pub method: Option<String>,
}

impl PaymentRequest {
    pub fn new(invoice_id: Uuid, amount: Decimal, method: impl Into<String>) -> Self {
        Self {
            invoice_id,
            amount,
            method: Some(method.into()),
        }
    }

    /// Checks the request shape; touches no state.
    pub fn validate(&self) -> Result<(Amount, PaymentMethod)> {
        let amount = Amount::new(self.amount)?;
        let method = match self.method.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => token.parse()?,
            _ => return Err(ReconError::validation("payment method required")),
        };
        Ok((amount, method))
    }
}

/// Outcome of `process_payment`, mirroring the gateway result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentResult {
    pub success: bool,
    pub payment_id: Uuid,
    pub reference: String,
    pub message: String,
}

impl From<&Payment> for PaymentResult {
    fn from(payment: &Payment) -> Self {
        let success = payment.is_completed();
        let message = if success {
            "Payment successful".to_string()
        } else {
            format!(
                "Payment failed: {}",
                payment.failure_reason.as_deref().unwrap_or("unknown")
            )
        };
        Self {
            success,
            payment_id: payment.id,
            reference: payment.reference.clone(),
            message,
        }
    }
}
