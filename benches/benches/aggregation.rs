use criterion::{black_box, criterion_group, criterion_main, Criterion};
use finfocus_aggregator::{aggregate, Row};
use finfocus_core::{CostResult, ImpactMetric, MetricKind, ResourceDescriptor};
use rust_decimal::Decimal;

fn sample_rows(n: usize) -> Vec<Row> {
    let providers = ["aws", "gcp", "azure"];
    let regions = ["us-east-1", "us-west-2", "eu-west-1"];
    (0..n)
        .map(|i| {
            let descriptor = ResourceDescriptor {
                provider: providers[i % providers.len()].to_string(),
                resource_type: "aws:ec2:Instance".to_string(),
                region: regions[i % regions.len()].to_string(),
                id: format!("r{i}"),
                ..Default::default()
            };
            let mut result = CostResult::none(&descriptor.id);
            result.adapter = "spec".to_string();
            result.currency = "USD".to_string();
            result.monthly = Some(Decimal::new((i as i64 % 500) * 100 + 1, 2));
            result.impact_metrics.insert(
                MetricKind::Carbon,
                ImpactMetric {
                    kind: MetricKind::Carbon,
                    value: Decimal::new((i as i64 % 50) * 10, 1),
                    unit: "kg".to_string(),
                },
            );
            Row::new(&descriptor, result)
        })
        .collect()
}

fn bench_group_by_provider(c: &mut Criterion) {
    let rows = sample_rows(10_000);
    c.bench_function("aggregate_by_provider_10k", |b| {
        b.iter(|| aggregate(black_box(&rows), "provider").unwrap())
    });
}

fn bench_group_by_region(c: &mut Criterion) {
    let rows = sample_rows(10_000);
    c.bench_function("aggregate_by_region_10k", |b| {
        b.iter(|| aggregate(black_box(&rows), "region").unwrap())
    });
}

criterion_group!(benches, bench_group_by_provider, bench_group_by_region);
criterion_main!(benches);
