use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use stockroom_core::ProductId;
use stockroom_infra::service::CatalogService;
use stockroom_infra::store::{InMemoryCatalogStore, ProductQuery};
use stockroom_inventory::{warehouse_total, Movement, MovementAction, RecordMovement};
use stockroom_products::CreateProduct;

fn movements(product_id: ProductId, count: usize) -> Vec<Movement> {
    (0..count)
        .map(|i| {
            let action = if i % 3 == 0 {
                MovementAction::Withdrawal
            } else {
                MovementAction::Deposit
            };
            Movement::record(RecordMovement::new(product_id, action, (i % 50) as i64, Utc::now()))
                .unwrap()
        })
        .collect()
}

/// Pure fold over a product's movement history.
fn bench_warehouse_total(c: &mut Criterion) {
    let mut group = c.benchmark_group("warehouse_total");
    let product_id = ProductId::new();

    for count in [10usize, 1_000, 100_000].iter() {
        let history = movements(product_id, *count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("fold", count), &history, |b, history| {
            b.iter(|| black_box(warehouse_total(black_box(history))));
        });
    }

    group.finish();
}

/// List view: every product plus its total, read through the service.
fn bench_product_summaries(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("product_summaries");

    for products in [10usize, 100].iter() {
        let service = CatalogService::new(InMemoryCatalogStore::new());
        rt.block_on(async {
            for i in 0..*products {
                let product = service
                    .create_product(CreateProduct::new(format!("SKU-{i}"), format!("item {i}"), Utc::now()))
                    .await
                    .unwrap();
                for m in movements(product.id_typed(), 20) {
                    let cmd = RecordMovement::new(
                        m.product_id(),
                        m.action(),
                        i64::from(m.quantity()),
                        Utc::now(),
                    );
                    service.record_movement(cmd).await.unwrap();
                }
            }
        });

        group.throughput(Throughput::Elements(*products as u64));
        group.bench_with_input(BenchmarkId::new("in_memory", products), &service, |b, service| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(service.product_summaries(&ProductQuery::default()).await.unwrap())
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_warehouse_total, bench_product_summaries);
criterion_main!(benches);
