mod common;

use common::Fixture;
use invoice_recon::domain::customer::Customer;
use invoice_recon::domain::invoice::InvoiceStatus;
use invoice_recon::domain::payment::{PaymentMethod, PaymentRequest, PaymentStatus};
use invoice_recon::domain::ports::{ChargeRequest, LedgerStoreBox, PaymentGatewayBox};
use invoice_recon::infrastructure::gateway::{ScriptedGateway, ScriptedOutcome};
use invoice_recon::infrastructure::in_memory::InMemoryLedger;
use rust_decimal_macros::dec;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_split_payments() {
    let fx = Fixture::new(vec![]).await;
    let invoice = fx.issue("INV-CC", dec!(100.00)).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = fx.engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .process_payment(PaymentRequest::new(invoice.id, dec!(10.00), "wire"))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().success);
    }

    let balance = fx.engine.get_invoice_balance(invoice.id).await.unwrap();
    assert_eq!(balance.paid, dec!(100.00));
    assert_eq!(balance.status, InvoiceStatus::Paid);
    assert_eq!(fx.payments().await.len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_gateway_does_not_block_other_invoices() {
    let fx = Fixture::new(vec![
        ScriptedOutcome::Delay(Duration::from_millis(200)),
        ScriptedOutcome::Approve,
    ])
    .await;
    let slow = fx.issue("INV-SLOW", dec!(50.00)).await;
    let fast = fx.issue("INV-FAST", dec!(50.00)).await;

    let engine = fx.engine.clone();
    let slow_payment = tokio::spawn(async move {
        engine
            .process_payment(PaymentRequest::new(slow.id, dec!(50.00), "wire"))
            .await
            .unwrap()
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fast_result = fx
        .engine
        .process_payment(PaymentRequest::new(fast.id, dec!(50.00), "wire"))
        .await
        .unwrap();
    assert!(fast_result.success);
    assert_eq!(fx.invoice(fast.id).await.status, InvoiceStatus::Paid);
    assert!(!slow_payment.is_finished());

    assert!(slow_payment.await.unwrap().success);
    assert_eq!(fx.invoice(slow.id).await.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let ledger: LedgerStoreBox = Box::new(InMemoryLedger::new());
    let gateway: PaymentGatewayBox = Box::new(ScriptedGateway::new(vec![
        ScriptedOutcome::Decline(Some("card expired".to_string())),
    ]));

    let customer = Customer::new("Initech");
    let id = customer.id;

    // Verify Send + Sync by spawning tasks
    let ledger_handle = tokio::spawn(async move {
        let mut tx = ledger.begin().await.unwrap();
        tx.save_customer(customer).await.unwrap();
        tx.commit().await.unwrap();
        ledger.get_customer(id).await.unwrap().unwrap()
    });

    let gateway_handle = tokio::spawn(async move {
        gateway
            .charge(&ChargeRequest {
                reference: "ref-1".to_string(),
                method: PaymentMethod::Wire,
                amount: dec!(10.00).try_into().unwrap(),
            })
            .await
            .unwrap()
    });

    assert_eq!(ledger_handle.await.unwrap().name, "Initech");
    let response = gateway_handle.await.unwrap();
    assert!(!response.approved);
    assert_eq!(response.reason.as_deref(), Some("card expired"));
}

#[tokio::test]
async fn test_completed_payments_are_final() {
    let fx = Fixture::new(vec![]).await;
    let invoice = fx.issue("INV-T", dec!(10.00)).await;
    fx.engine
        .process_payment(PaymentRequest::new(invoice.id, dec!(10.00), "wire"))
        .await
        .unwrap();

    let mut payment = fx.payments().await.remove(0);
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.fail("late decline").is_err());
    assert!(payment.complete().is_err());
}
