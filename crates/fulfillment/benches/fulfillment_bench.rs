use criterion::{Criterion, criterion_group, criterion_main};
use fulfillment::{FulfillmentService, OrderLine};
use schema::{CookieId, Money, NewCookie, NewUser, OrderId};
use store::InMemoryStore;

async fn seeded_order(line_count: usize) -> (FulfillmentService<InMemoryStore>, OrderId) {
    let service = FulfillmentService::new(InMemoryStore::new());
    let user = service
        .register_user(NewUser::new("cookiemon", "mon@cookie.com", "111-111-1111", "pw"))
        .await
        .unwrap();

    let cookies: Vec<NewCookie> = (0..line_count)
        .map(|i| {
            NewCookie::new(
                format!("cookie {i}"),
                "",
                format!("SKU{i:03}"),
                1_000,
                Money::from_cents(50),
            )
        })
        .collect();
    let ids: Vec<CookieId> = service
        .load_inventory(cookies)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();

    let lines = ids.into_iter().map(|id| OrderLine::new(id, 2)).collect();
    let placed = service.place_order(user.id, lines).await.unwrap();
    (service, placed.order.id)
}

fn bench_ship_single_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("fulfillment/ship_single_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (service, order_id) = seeded_order(1).await;
                service.ship_order(order_id).await.unwrap();
            });
        });
    });
}

fn bench_ship_ten_lines(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("fulfillment/ship_ten_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (service, order_id) = seeded_order(10).await;
                service.ship_order(order_id).await.unwrap();
            });
        });
    });
}

fn bench_reship(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (service, order_id) = rt.block_on(async {
        let (service, order_id) = seeded_order(10).await;
        service.ship_order(order_id).await.unwrap();
        (service, order_id)
    });

    c.bench_function("fulfillment/reship_already_shipped", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.ship_order(order_id).await.unwrap();
            });
        });
    });
}

fn bench_place_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("fulfillment/place_order_ten_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                seeded_order(10).await;
            });
        });
    });
}

criterion_group!(
    benches,
    bench_ship_single_line,
    bench_ship_ten_lines,
    bench_reship,
    bench_place_order,
);
criterion_main!(benches);
