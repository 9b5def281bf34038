use chrono::Utc;
use common::{CartId, ProductId};
use criterion::{Criterion, criterion_group, criterion_main};
use document_store::InMemoryDocumentStore;
use domain::{InventoryRecord, Money, Product, encode};
use saga::{
    Action, AddProductRequest, AddProductToShoppingCart, Collections, ExpireCarts,
    ExpireCartsRequest, Instrumentation, UpdateReservationQuantityForAProduct,
    UpdateReservationRequest,
};

async fn seeded(stock: u32) -> Collections<InMemoryDocumentStore> {
    let collections = Collections::new(InMemoryDocumentStore::new());
    collections
        .inventories
        .insert_one(encode(&InventoryRecord::new("SKU-001", stock)).unwrap())
        .await
        .unwrap();
    collections
}

fn add_request(cart: String) -> AddProductRequest {
    AddProductRequest {
        cart_id: CartId::new(cart),
        product: Product::new("SKU-001", "Widget", Money::from_cents(1000)),
        quantity: 1,
    }
}

fn bench_add_product(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let collections = rt.block_on(seeded(u32::MAX));
    let saga = AddProductToShoppingCart::new(&collections, Instrumentation::disabled());
    let mut n = 0_u64;

    c.bench_function("saga/add_product_to_shopping_cart", |b| {
        b.iter(|| {
            n += 1;
            rt.block_on(saga.execute(&add_request(format!("user-{n}")))).unwrap();
        });
    });
}

fn bench_add_product_compensated(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let collections = rt.block_on(seeded(0));
    let saga = AddProductToShoppingCart::new(&collections, Instrumentation::disabled());

    c.bench_function("saga/add_product_compensated", |b| {
        b.iter(|| {
            rt.block_on(saga.execute(&add_request("user-1".to_string())))
                .unwrap_err();
        });
    });
}

fn bench_update_reservation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let collections = rt.block_on(seeded(1_000));
    let add = AddProductToShoppingCart::new(&collections, Instrumentation::disabled());
    rt.block_on(add.execute(&add_request("user-1".to_string())))
        .unwrap();
    let saga = UpdateReservationQuantityForAProduct::new(&collections, Instrumentation::disabled());
    let mut toggle = false;

    c.bench_function("saga/update_reservation_quantity", |b| {
        b.iter(|| {
            toggle = !toggle;
            let request = UpdateReservationRequest {
                cart_id: CartId::new("user-1"),
                product_id: ProductId::new("SKU-001"),
                quantity: if toggle { 5 } else { 1 },
            };
            rt.block_on(saga.execute(&request)).unwrap();
        });
    });
}

fn bench_expire_100_carts(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("saga/expire_100_carts", |b| {
        b.iter_batched(
            || {
                rt.block_on(async {
                    let collections = seeded(1_000).await;
                    let add = AddProductToShoppingCart::new(&collections, Instrumentation::disabled());
                    for i in 0..100 {
                        add.execute(&add_request(format!("user-{i}"))).await.unwrap();
                    }
                    ExpireCarts::new(&collections, Instrumentation::disabled())
                })
            },
            |expire| {
                let report = rt
                    .block_on(expire.execute(&ExpireCartsRequest { cutoff: Utc::now() }))
                    .unwrap();
                assert_eq!(report.expired.len(), 100);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_add_product,
    bench_add_product_compensated,
    bench_update_reservation,
    bench_expire_100_carts
);
criterion_main!(benches);
