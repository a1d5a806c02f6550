use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use usageql_core::{TenantId, evaluate, has_isolation, validate_candidate};

fn candidates() -> Vec<(&'static str, String)> {
    let long_where = (0..50)
        .map(|i| format!("signup_date > CURRENT_DATE - INTERVAL '{i} days'"))
        .collect::<Vec<_>>()
        .join(" AND ");

    vec![
        (
            "count",
            "SELECT COUNT(*) FROM users WHERE tenant_id = 'tenant_123'".to_string(),
        ),
        (
            "join",
            "SELECT f.name, COUNT(*) AS total_events FROM usage_events e \
             JOIN users u ON u.id = e.user_id JOIN features f ON f.id = e.feature_id \
             WHERE u.tenant_id = 'tenant_123' GROUP BY f.name ORDER BY total_events DESC"
                .to_string(),
        ),
        (
            "long_where",
            format!("SELECT id FROM users WHERE {long_where} AND tenant_id = 'tenant_123'"),
        ),
        ("denied", "SELECT * FROM users; DROP TABLE users;".to_string()),
    ]
}

fn bench_guards(c: &mut Criterion) {
    let tenant = TenantId::parse("tenant_123").expect("valid tenant");
    let mut group = c.benchmark_group("guards");

    for (name, query) in candidates() {
        group.bench_with_input(BenchmarkId::new("evaluate", name), &query, |b, q| {
            b.iter(|| evaluate(black_box(q)))
        });
        group.bench_with_input(BenchmarkId::new("has_isolation", name), &query, |b, q| {
            b.iter(|| has_isolation(black_box(q), black_box(tenant.as_str())))
        });
        group.bench_with_input(BenchmarkId::new("validate_candidate", name), &query, |b, q| {
            b.iter(|| validate_candidate(black_box(q), black_box(&tenant)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_guards);
criterion_main!(benches);
