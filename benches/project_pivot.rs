use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use metric_frames::{
    query::QueryOptions,
    record::{IngestOptions, records_from_json},
    frame_records,
};
use serde_json::{Value as JsonValue, json};

fn generate_samples(points: usize, series: usize) -> JsonValue {
    let mut items = Vec::with_capacity(points * series);
    for t in 0..points {
        for s in 0..series {
            let mut item = json!({
                "time": 1_700_000_000_000_i64 + (t as i64) * 1_000,
                "id": format!("thread-{s}"),
                "utilization": (t * s) as f64 / 100.0,
                "heapUsed": (t * 1_024 + s) as i64,
            });
            // Sparse attribute so the unifier has real work to do.
            if t % 7 == s % 7 {
                item["status"] = json!("gc");
            }
            items.push(item);
        }
    }
    JsonValue::Array(items)
}

fn bench_project_pivot(c: &mut Criterion) {
    let root = generate_samples(2_000, 8);
    let options = QueryOptions {
        metric: "bench".to_string(),
        key: "time".to_string(),
        discriminator: "id".to_string(),
        timestamp_attributes: vec!["time".to_string()],
        ..QueryOptions::default()
    };
    let ingest = IngestOptions {
        timestamp_attributes: options.timestamp_attributes.clone(),
    };
    let records = records_from_json(&root, &ingest).expect("ingest");

    c.bench_function("wide_frame_2000x8", |b| {
        b.iter_batched(
            || records.clone(),
            |records| frame_records(records, &options).expect("frame"),
            BatchSize::LargeInput,
        )
    });

    let mut long_options = options.clone();
    long_options.pivot = false;
    c.bench_function("long_frame_2000x8", |b| {
        b.iter_batched(
            || records.clone(),
            |records| frame_records(records, &long_options).expect("frame"),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_project_pivot);
criterion_main!(benches);
