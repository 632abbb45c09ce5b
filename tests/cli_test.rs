use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const CUSTOMER: &str = "6f1c2a9e-3b1f-4c55-9a57-1f0f3f3a0001";

fn recon() -> Command {
    let mut cmd = Command::new(cargo_bin!("invoice-recon"));
    cmd.arg("--ledger")
        .arg("tests/fixtures/ledger.json")
        .arg("--approval-rate")
        .arg("1");
    cmd
}

#[test]
fn test_cli_process_batch() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = recon();
    cmd.arg("process").arg("tests/fixtures/payments.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "invoice,number,status,total,paid,remaining",
        ))
        .stdout(predicate::str::contains(
            "0b7e8c4a-5d2f-4f0e-8a11-2c9d7e6b0001,INV-001,paid,100.00,100.00,0.00",
        ))
        .stdout(predicate::str::contains(
            "0b7e8c4a-5d2f-4f0e-8a11-2c9d7e6b0002,INV-002,partially_paid,250.00,100.00,150.00",
        ))
        .stderr(predicate::str::contains("Payment successful"));

    Ok(())
}

#[test]
fn test_cli_outstanding() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = recon();
    cmd.arg("outstanding").arg("--customer").arg(CUSTOMER);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "invoice,number,status,issue_date,due_date,total",
        ))
        .stdout(predicate::str::contains("INV-001,issued,2024-01-01,2024-01-31,100.00"))
        .stdout(predicate::str::contains("INV-002,issued,2024-02-01,2024-02-29,250.00"));

    Ok(())
}

#[test]
fn test_cli_trends_for_new_customer() -> Result<(), Box<dyn std::error::Error>> {
    let output = recon()
        .arg("trends")
        .arg("--customer")
        .arg(CUSTOMER)
        .output()?;
    assert!(output.status.success());

    let trends: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(trends["customer_id"], CUSTOMER);
    assert_eq!(trends["total_payments"], 0);
    assert_eq!(trends["average_days_to_pay"], 0.0);
    assert_eq!(trends["on_time_payment_rate"], 0.0);

    Ok(())
}

#[test]
fn test_cli_mark_overdue() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = recon();
    cmd.arg("mark-overdue").arg("--as-of").arg("2024-02-15");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("INV-001,overdue"))
        .stdout(predicate::str::contains("INV-002").not());

    Ok(())
}

#[test]
fn test_cli_receipt_unknown_payment() {
    let mut cmd = recon();
    cmd.arg("receipt")
        .arg("--payment")
        .arg("00000000-0000-4000-8000-000000000000");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("payment not found"));
}

#[test]
fn test_cli_rejects_nan_approval_rate() {
    let mut cmd = Command::new(cargo_bin!("invoice-recon"));
    cmd.arg("--approval-rate")
        .arg("NaN")
        .arg("outstanding")
        .arg("--customer")
        .arg(CUSTOMER);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("approval rate must be a finite number"));
}
