use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use prequel::data::{Record, Value};
use prequel::normalize::normalize;
use prequel::sql::generate_ddl;

fn generate_listings(rows: usize) -> Vec<Record> {
    (0..rows)
        .map(|i| {
            let mut record = Record::new();
            record.insert("Make".to_string(), Value::from(["Lexus", "Jeep", "Toyota"][i % 3]));
            record.insert("Model".to_string(), Value::Text(format!("model-{}", i % 40)));
            if i % 5 != 0 {
                record.insert("Year".to_string(), Value::Integer(2000 + (i % 24) as i64));
            }
            record.insert("Fuel Economy".to_string(), Value::Float(5.0 + (i % 70) as f64 / 10.0));
            record.insert(
                "features".to_string(),
                Value::List(vec![Value::from("Alarm"), Value::Text(format!("extra-{}", i % 7))]),
            );
            record
        })
        .collect()
}

fn bench_normalize_and_ddl(c: &mut Criterion) {
    let records = generate_listings(10_000);
    let mut group = c.benchmark_group("schema_inference");
    group.bench_function("normalize_10k", |b| {
        b.iter(|| normalize(black_box(&records), None).expect("normalize"))
    });
    group.bench_function("normalize_then_ddl", |b| {
        b.iter_batched(
            || records[..1_000].to_vec(),
            |sample| {
                let normalized = normalize(&sample, None).expect("normalize");
                generate_ddl("listings", &normalized.columns).expect("ddl")
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_normalize_and_ddl);
criterion_main!(benches);
