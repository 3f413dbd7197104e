use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;

fn campaign_state() -> sim_core::TurnState {
    sim_core::TurnState::campaign_start(
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        vec![
            sim_core::ProductLine::new("auto", "Auto"),
            sim_core::ProductLine::new("home", "Home"),
            sim_core::ProductLine::new("health", "Health"),
        ],
        Decimal::new(2_000_000, 0),
    )
}

fn bench_resolve(c: &mut Criterion) {
    let config = sim_core::EngineConfig::default();
    let state = campaign_state();
    let decisions = vec![
        sim_core::Decision {
            id: "dec:1:1".to_string(),
            lever: "hr.hiring".to_string(),
            value: 10.0,
            product: None,
        },
        sim_core::Decision {
            id: "dec:1:2".to_string(),
            lever: "finance.asset_allocation".to_string(),
            value: 0.04,
            product: None,
        },
    ];
    c.bench_function("resolve_turn 3 products", |b| {
        b.iter(|| {
            let outcome = sim_runtime::resolve_turn(sim_runtime::ResolveInput {
                state: &state,
                decisions: &decisions,
                events: &[],
                compensations: &[],
                config: &config,
                speed: sim_core::GameSpeed::Medium,
                difficulty: sim_core::Difficulty::Normal,
                seed: 42,
            });
            let _ = black_box(outcome);
        })
    });
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
