use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CartVariant, CatalogProduct};
use serde_json::{Value, json};

fn raw_product(colors: usize, sizes: usize) -> Value {
    let color_values: Vec<Value> = (0..colors)
        .map(|c| json!({"id": c, "name": format!("Color{c}"), "image": format!("https://img/{c}.jpg")}))
        .collect();
    let size_values: Vec<Value> = (0..sizes)
        .map(|s| json!({"id": s, "name": format!("Size{s}")}))
        .collect();

    let skus: Vec<Value> = (0..colors)
        .flat_map(|c| {
            (0..sizes).map(move |s| {
                json!({
                    "sku_id": c * 1000 + s,
                    "attributes": [format!("14:{c}"), format!("5:{s}")],
                    "ladder_price": [
                        {"min_quantity": 1, "max_quantity": 9, "price": "10.00"},
                        {"min_quantity": 10, "max_quantity": -1, "price": "8.00"}
                    ],
                    "inventory_list": [{"warehouse": "CN", "inventory": 100}]
                })
            })
        })
        .collect();

    json!({
        "product_id": "1600123",
        "subject": "Benchmark Shirt",
        "supplier": {"company_id": "C1", "company_name": "Acme"},
        "main_image": {"images": ["https://img/main.jpg"]},
        "sku_attributes": [
            {"attribute_id": 14, "attribute_name": "Color", "values": color_values},
            {"attribute_id": 5, "attribute_name": "Size", "values": size_values}
        ],
        "skus": skus
    })
}

fn bench_normalize(c: &mut Criterion) {
    let raw = raw_product(10, 8);

    c.bench_function("catalog/normalize_80_variants", |b| {
        b.iter(|| CatalogProduct::from_raw(&raw).unwrap());
    });
}

fn bench_match_variant(c: &mut Criterion) {
    let product = CatalogProduct::from_raw(&raw_product(10, 8)).unwrap();
    let by_title = CartVariant::from_title("Size7 / Color9");
    let by_sku = CartVariant::from_sku("5:7;14:9");

    c.bench_function("catalog/match_variant_by_title", |b| {
        b.iter(|| product.match_variant(&by_title).unwrap());
    });

    c.bench_function("catalog/match_variant_by_sku", |b| {
        b.iter(|| product.match_variant(&by_sku).unwrap());
    });
}

criterion_group!(benches, bench_normalize, bench_match_variant);
criterion_main!(benches);
