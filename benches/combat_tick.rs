//! Combat tick benchmarks
//!
//! Measures one tick over arenas of evenly matched fighters, plus a crowd of
//! idle spectators that still get their counters advanced.
//!
//! Run with: cargo bench --bench combat_tick

use std::net::SocketAddr;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gladiator_pits_server::game::dice::{LoadedDice, RandomDice};
use gladiator_pits_server::game::outbox::{Inbox, Outbox};
use gladiator_pits_server::game::player::{GameRules, Player, PlayerId, Stat};
use gladiator_pits_server::game::registry::Registry;
use gladiator_pits_server::game::systems::{challenge, character, combat, training};

struct Arena {
    registry: Registry,
    inboxes: Vec<Inbox>,
}

impl Arena {
    /// Throw away queued narration so memory stays flat between iterations
    fn drain(&mut self) {
        for rx in &mut self.inboxes {
            while rx.try_recv().is_ok() {}
        }
    }
}

fn join(arena: &mut Arena, index: usize) -> PlayerId {
    let addr = SocketAddr::from(([127, 0, (index / 60000) as u8, 1], 1024 + (index % 60000) as u16));
    let (outbox, rx) = Outbox::channel();
    arena.inboxes.push(rx);
    arena
        .registry
        .register(Player::new(PlayerId::from(addr), outbox))
        .unwrap()
}

/// Build `pairs` fights between fully trained gladiators plus `crowd` spectators
fn create_arena(pairs: usize, crowd: usize) -> Arena {
    let rules = GameRules::default();
    let mut arena = Arena {
        registry: Registry::new(),
        inboxes: Vec::new(),
    };

    let mut fighters = Vec::with_capacity(pairs * 2);
    for i in 0..pairs * 2 {
        let id = join(&mut arena, i);
        let name = format!("Fighter{}", i);
        character::create(&mut arena.registry, id, &name).unwrap();

        let player = arena.registry.get_mut(id).unwrap();
        training::enter(player).unwrap();
        while player.can_train(&rules) {
            for stat in Stat::ALL {
                let _ = player.train(stat, &rules);
            }
        }
        training::leave(player, &rules).unwrap();
        fighters.push((id, name));
        // Arrival notices go to every named player; keep queues under capacity
        arena.drain();
    }

    for pair in fighters.chunks(2) {
        challenge::challenge(&mut arena.registry, pair[0].0, &pair[1].1).unwrap();
        challenge::accept(&mut arena.registry, pair[1].0).unwrap();
        arena.drain();
    }

    for i in 0..crowd {
        join(&mut arena, pairs * 2 + i);
    }

    arena.drain();
    arena
}

/// Steady state: every contest misses, so no fight ever ends
fn bench_tick_stalemate(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_stalemate");
    group.sample_size(50);

    for pairs in [10, 100, 250, 500] {
        let mut arena = create_arena(pairs, pairs);
        let mut dice = LoadedDice::new([0]);

        group.throughput(Throughput::Elements((pairs * 3) as u64));
        group.bench_with_input(BenchmarkId::new("players", pairs * 3), &pairs, |b, _| {
            b.iter(|| {
                black_box(combat::tick(&mut arena.registry, &mut dice));
                arena.drain();
            })
        });
    }
    group.finish();
}

/// Random contests from fresh arenas, so kills and their broadcasts are included
fn bench_tick_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_random");
    group.sample_size(20);

    for pairs in [50, 250] {
        group.throughput(Throughput::Elements((pairs * 2) as u64));
        group.bench_with_input(BenchmarkId::new("fight_to_end", pairs * 2), &pairs, |b, &pairs| {
            b.iter_batched(
                || create_arena(pairs, 0),
                |mut arena| {
                    let mut dice = RandomDice::seeded(7);
                    for _ in 0..64 {
                        black_box(combat::tick(&mut arena.registry, &mut dice));
                        arena.drain();
                    }
                    arena
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick_stalemate, bench_tick_random);

criterion_main!(benches);
