use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::StdRng};
use std::hint::black_box;
use tournament_hub::bracket::{Advancement, TeamRef, advance, plan};

fn roster(n: usize) -> Vec<TeamRef> {
    (1..=n as i64)
        .map(|id| TeamRef::new(id, format!("Team {id}")))
        .collect()
}

/// Benchmark bracket planning for growing rosters
fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    for n in [5usize, 16, 100, 1000] {
        let teams = roster(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &teams, |b, teams| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| plan(black_box(teams), &mut rng));
        });
    }
    group.finish();
}

/// Benchmark playing a full bracket, team1 always winning
fn bench_play_out(c: &mut Criterion) {
    let teams = roster(128);
    let planned = plan(&teams, &mut StdRng::seed_from_u64(7)).unwrap();

    c.bench_function("play_out_128", |b| {
        b.iter(|| {
            let mut bracket = planned.clone();
            loop {
                // A slot is unplayed while its successor side is still empty.
                let next = bracket
                    .playable_slots()
                    .find(|s| {
                        s.next.is_none_or(|n| {
                            bracket
                                .slot(n)
                                .is_some_and(|succ| succ.side(s.position().feeds_side()).is_empty())
                        })
                    })
                    .map(|s| (s.position(), s.team1.team().cloned()));
                let Some((position, Some(winner))) = next else { break };
                if let Ok(Advancement::Champion(team)) = advance(&mut bracket, position, &winner) {
                    black_box(team);
                    break;
                }
            }
        });
    });
}

criterion_group!(benches, bench_plan, bench_play_out);
criterion_main!(benches);
