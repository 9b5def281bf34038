use criterion::{Criterion, criterion_group, criterion_main};
use document_store::{DocumentStore, Filter, InMemoryDocumentStore, Update, UpdateOptions};
use serde_json::json;

fn seeded_store(rt: &tokio::runtime::Runtime, documents: usize) -> InMemoryDocumentStore {
    rt.block_on(async {
        let store = InMemoryDocumentStore::new();
        for i in 0..documents {
            store
                .insert_one(
                    "inventories",
                    json!({
                        "_id": format!("SKU-{i:04}"),
                        "quantity": 1_000_000,
                        "reservations": []
                    }),
                )
                .await
                .unwrap();
        }
        store
    })
}

fn bench_conditional_decrement(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = seeded_store(&rt, 100);
    let filter = Filter::by_id("SKU-0050").gte("quantity", 1);
    let update = Update::new().inc("quantity", -1);

    c.bench_function("document_store/conditional_decrement", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .update_one("inventories", &filter, &update, UpdateOptions::new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_positional_set(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();
    rt.block_on(async {
        let reservations: Vec<_> = (0..50)
            .map(|i| json!({"_id": format!("user-{i}"), "quantity": 1}))
            .collect();
        store
            .insert_one(
                "inventories",
                json!({"_id": "SKU-0001", "quantity": 10, "reservations": reservations}),
            )
            .await
            .unwrap();
    });
    let filter = Filter::by_id("SKU-0001").eq("reservations._id", "user-40");
    let update = Update::new().set("reservations.$.quantity", 3);

    c.bench_function("document_store/positional_set", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .update_one("inventories", &filter, &update, UpdateOptions::new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_find_many_range(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = seeded_store(&rt, 1000);
    let filter = Filter::new().gte("quantity", 1).exists("reservations", true);

    c.bench_function("document_store/find_many_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                let docs = store.find_many("inventories", &filter).await.unwrap();
                assert_eq!(docs.len(), 1000);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_conditional_decrement,
    bench_positional_set,
    bench_find_many_range,
);
criterion_main!(benches);
