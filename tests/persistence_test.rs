#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

const INVOICE: &str = "0b7e8c4a-5d2f-4f0e-8a11-2c9d7e6b0001";

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: seed the ledger and pay part of INV-001
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "invoice, amount, method").unwrap();
    writeln!(csv1, "{INVOICE}, 40.00, wire").unwrap();

    let mut cmd1 = Command::new(cargo_bin!("invoice-recon"));
    cmd1.arg("--db-path")
        .arg(&db_path)
        .arg("--ledger")
        .arg("tests/fixtures/ledger.json")
        .arg("--approval-rate")
        .arg("1")
        .arg("process")
        .arg(csv1.path());

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("INV-001,partially_paid,100.00,40.00,60.00"));

    // 2. Second run: the same seed is skipped, the earlier payment is recovered
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "invoice, amount, method").unwrap();
    writeln!(csv2, "{INVOICE}, 60.00, wire").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("invoice-recon"));
    cmd2.arg("--db-path")
        .arg(&db_path)
        .arg("--ledger")
        .arg("tests/fixtures/ledger.json")
        .arg("--approval-rate")
        .arg("1")
        .arg("process")
        .arg(csv2.path());

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // 40.00 recovered plus 60.00 settles the invoice
    assert!(stdout2.contains("INV-001,paid,100.00,100.00,0.00"));

    // 3. Third run: only INV-002 is still outstanding
    let mut cmd3 = Command::new(cargo_bin!("invoice-recon"));
    cmd3.arg("--db-path")
        .arg(&db_path)
        .arg("outstanding")
        .arg("--customer")
        .arg("6f1c2a9e-3b1f-4c55-9a57-1f0f3f3a0001");

    let output3 = cmd3.output().expect("Failed to execute command");
    assert!(output3.status.success());
    let stdout3 = String::from_utf8_lossy(&output3.stdout);
    assert!(stdout3.contains("INV-002"));
    assert!(!stdout3.contains("INV-001"));
}
