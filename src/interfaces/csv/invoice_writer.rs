use crate::domain::invoice::{Invoice, InvoiceBalance, InvoiceStatus};
use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct BalanceRow<'a> {
    invoice: String,
    number: &'a str,
    status: InvoiceStatus,
    total: Decimal,
    paid: Decimal,
    remaining: Decimal,
}

#[derive(Serialize)]
struct InvoiceRow<'a> {
    invoice: String,
    number: &'a str,
    status: InvoiceStatus,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    total: Decimal,
}

/// Writes invoice state as CSV.
pub struct InvoiceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> InvoiceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes `invoice,number,status,total,paid,remaining` rows.
    pub fn write_balances(&mut self, balances: &[InvoiceBalance]) -> Result<()> {
        for balance in balances {
            self.writer.serialize(BalanceRow {
                invoice: balance.invoice_id.to_string(),
                number: &balance.invoice_number,
                status: balance.status,
                total: balance.total,
                paid: balance.paid,
                remaining: balance.remaining,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes `invoice,number,status,issue_date,due_date,total` rows.
    pub fn write_invoices(&mut self, invoices: &[Invoice]) -> Result<()> {
        for invoice in invoices {
            self.writer.serialize(InvoiceRow {
                invoice: invoice.id.to_string(),
                number: &invoice.invoice_number,
                status: invoice.status,
                issue_date: invoice.issue_date,
                due_date: invoice.due_date,
                total: invoice.total,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
