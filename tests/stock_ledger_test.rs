mod common;

use assert_matches::assert_matches;
use common::TestApp;
use futures::future::join_all;
use inventory_api::errors::ServiceError;
use uuid::Uuid;

async fn seeded() -> (TestApp, Uuid, Uuid, Uuid) {
    let app = TestApp::new().await;
    let w1 = app.create_warehouse("North").await;
    let w2 = app.create_warehouse("South").await;
    let product_id = app.create_product(w1, "LEDGER-1", 10).await;
    (app, w1, w2, product_id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_decreases_never_oversell() {
    let (app, w1, _, product_id) = seeded().await;
    let ledger = app.state.services.ledger.clone();

    let tasks = (0..20).map(|_| {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.decrease(product_id, w1, 1, None).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 10);
    for failure in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_matches!(failure, ServiceError::InsufficientStock(_));
    }

    let level = ledger.lookup(product_id, w1).await.unwrap();
    assert_eq!(level.stock_quantity, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposite_transfers_conserve_the_total() {
    let (app, w1, w2, product_id) = seeded().await;
    let ledger = app.state.services.ledger.clone();
    ledger.transfer(product_id, w1, w2, 5, None).await.unwrap();

    let tasks = (0..8).map(|i| {
        let ledger = ledger.clone();
        let (from, to) = if i % 2 == 0 { (w1, w2) } else { (w2, w1) };
        tokio::spawn(async move { ledger.transfer(product_id, from, to, 1, None).await })
    });
    for joined in join_all(tasks).await {
        joined.expect("task panicked").expect("transfer succeeds");
    }

    let north = ledger.lookup(product_id, w1).await.unwrap().stock_quantity;
    let south = ledger.lookup(product_id, w2).await.unwrap().stock_quantity;
    assert_eq!(north + south, 10);
    assert_eq!((north, south), (5, 5));
}

#[tokio::test]
async fn failed_movements_change_nothing() {
    let (app, w1, w2, product_id) = seeded().await;
    let ledger = &app.state.services.ledger;

    for _ in 0..2 {
        assert_matches!(
            ledger.decrease(product_id, w1, 11, Some("audit".into())).await,
            Err(ServiceError::InsufficientStock(_))
        );
        assert_matches!(
            ledger.transfer(product_id, w1, w2, 11, None).await,
            Err(ServiceError::InsufficientStock(_))
        );
    }
    assert_matches!(
        ledger.increase(product_id, w1, 0, None).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        ledger.transfer(product_id, w1, w1, 1, None).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        ledger.increase(product_id, w1, 1, Some(Uuid::new_v4())).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        ledger.decrease(product_id, w2, 1, None).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        ledger.increase(product_id, w1, i32::MAX, None).await,
        Err(ServiceError::InvalidInput(_))
    );

    assert_eq!(ledger.lookup(product_id, w1).await.unwrap().stock_quantity, 10);
    assert_matches!(ledger.lookup(product_id, w2).await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn product_total_follows_every_warehouse() {
    let (app, w1, w2, product_id) = seeded().await;
    let ledger = &app.state.services.ledger;
    let products = &app.state.services.products;

    ledger.transfer(product_id, w1, w2, 4, None).await.unwrap();
    ledger.increase(product_id, w2, 6, None).await.unwrap();
    ledger.decrease(product_id, w1, 1, None).await.unwrap();

    let detail = products.get_in_warehouse(w2, product_id).await.unwrap();
    assert_eq!(detail.warehouse_stock_quantity, 10);
    assert_eq!(detail.stock_quantity, 15);

    let from_north = products.get_in_warehouse(w1, product_id).await.unwrap();
    assert_eq!(from_north.warehouse_stock_quantity, 5);
    assert_eq!(from_north.stock_quantity, 15);
}

#[tokio::test]
async fn draining_to_zero_keeps_the_record() {
    let (app, w1, _, product_id) = seeded().await;
    let ledger = &app.state.services.ledger;

    assert_eq!(ledger.decrease(product_id, w1, 10, None).await.unwrap(), 0);
    let level = ledger.lookup(product_id, w1).await.unwrap();
    assert_eq!(level.stock_quantity, 0);
    assert_eq!(ledger.list_inventory(w1).await.unwrap().len(), 1);
    assert_eq!(ledger.increase(product_id, w1, 2, None).await.unwrap(), 2);
}

#[tokio::test]
async fn linked_warehouses_and_suppliers_cannot_be_deleted() {
    let (app, w1, w2, product_id) = seeded().await;
    let services = &app.state.services;
    let supplier_id = app.create_supplier("Acme").await;
    let unused_supplier = app.create_supplier("Idle").await;

    services
        .ledger
        .increase(product_id, w1, 1, Some(supplier_id))
        .await
        .unwrap();

    assert_matches!(services.warehouses.delete(w1).await, Err(ServiceError::Conflict(_)));
    assert_matches!(
        services.suppliers.delete(supplier_id).await,
        Err(ServiceError::Conflict(_))
    );

    services.warehouses.delete(w2).await.unwrap();
    assert_matches!(services.warehouses.get(w2).await, Err(ServiceError::NotFound(_)));
    services.suppliers.delete(unused_supplier).await.unwrap();

    // Once the product is drained and removed, its links go with it.
    services.ledger.decrease(product_id, w1, 11, None).await.unwrap();
    services.products.delete(w1, product_id).await.unwrap();
    services.suppliers.delete(supplier_id).await.unwrap();
    services.warehouses.delete(w1).await.unwrap();
}
