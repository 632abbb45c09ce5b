use super::invoice::Invoice;
use super::payment::Payment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// How a customer has been paying, derived from their payment attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTrends {
    pub customer_id: Uuid,
    /// Every attempt, whatever its status.
    pub total_payments: usize,
    pub completed_payments: usize,
    /// Mean whole days from invoice issue to payment, over completed payments.
    pub average_days_to_pay: f64,
    /// Percentage of all attempts that completed on or before the due date.
    pub on_time_payment_rate: f64,
}

impl PaymentTrends {
    /// Aggregates `payments` against their linked `invoices`.
    ///
    /// Completed payments whose invoice is not in `invoices` count as attempts
    /// but contribute to neither the day average nor the on-time count.
    pub fn compute(customer_id: Uuid, payments: &[Payment], invoices: &[Invoice]) -> Self {
        let by_id: HashMap<Uuid, &Invoice> = invoices.iter().map(|i| (i.id, i)).collect();

        let completed: Vec<&Payment> = payments.iter().filter(|p| p.is_completed()).collect();

        let mut days_total: i64 = 0;
        let mut days_count: usize = 0;
        let mut on_time: usize = 0;
        for payment in &completed {
            let Some(invoice) = by_id.get(&payment.invoice_id) else {
                tracing::warn!(
                    payment_reference = %payment.reference,
                    invoice_id = %payment.invoice_id,
                    "completed payment without invoice skipped in trends"
                );
                continue;
            };
            let paid_on = payment.timestamp.date_naive();
            days_total += (paid_on - invoice.issue_date).num_days();
            days_count += 1;
            if paid_on <= invoice.due_date {
                on_time += 1;
            }
        }

        let average_days_to_pay = if days_count == 0 {
            0.0
        } else {
            days_total as f64 / days_count as f64
        };
        let on_time_payment_rate = if payments.is_empty() {
            0.0
        } else {
            on_time as f64 / payments.len() as f64 * 100.0
        };

        Self {
            customer_id,
            total_payments: payments.len(),
            completed_payments: completed.len(),
            average_days_to_pay,
            on_time_payment_rate,
        }
    }
}
