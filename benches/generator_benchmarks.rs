use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nexus_seq::chaos::MutationKind;
use nexus_seq::generator::interference::create_quantum_interference;
use nexus_seq::generator::markov::{MarkovGenerator, MarkovModel, classic_corpus};
use nexus_seq::generator::structural;
use nexus_seq::messaging::NoteEvent;
use nexus_seq::{PatternBank, STEPS, Transport, VoiceId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

/// Markov generation per order (runs on the control thread, must stay cheap)
fn bench_markov_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("markov_generate");
    let mut rng = StdRng::seed_from_u64(1);

    for order in [1, 2, 4, 8] {
        let generator = MarkovGenerator::new(order);
        group.bench_with_input(BenchmarkId::from_parameter(order), &order, |b, _| {
            b.iter(|| black_box(generator.generate(VoiceId::Drum, &mut rng)));
        });
    }
    group.finish();
}

fn bench_markov_training(c: &mut Criterion) {
    let corpus = classic_corpus(VoiceId::Drum);

    c.bench_function("markov_train_drum_corpus", |b| {
        b.iter(|| {
            let mut model = MarkovModel::new(2);
            for pattern in &corpus {
                model.train(pattern);
            }
            black_box(model.state_count())
        });
    });
}

/// Every chaos transform against a live bank
fn bench_transforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("chaos_transform");
    let bank = Arc::new(PatternBank::new());
    bank.apply_preset("Breakbeat");
    let mut rng = StdRng::seed_from_u64(2);

    for kind in MutationKind::ALL {
        // The cascade spawns a thread per call
        if kind == MutationKind::ButterflyCascade {
            continue;
        }
        group.bench_with_input(BenchmarkId::from_parameter(kind.name()), &kind, |b, &kind| {
            b.iter(|| kind.apply(&bank, 0.5, &mut rng));
        });
    }
    group.finish();
}

fn bench_structural(c: &mut Criterion) {
    let grid = [structural::euclidean(5), structural::fractal(), structural::golden_ratio()];

    c.bench_function("conway_step", |b| {
        b.iter(|| black_box(structural::conway_step(black_box(&grid))));
    });
    c.bench_function("cellular_automaton_rule_110", |b| {
        b.iter(|| black_box(structural::cellular_automaton_1d(black_box(&grid[0]), 110)));
    });
}

fn bench_interference(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let a = structural::euclidean(7);
    let b_steps = structural::golden_ratio();

    c.bench_function("quantum_interference", |b| {
        b.iter(|| black_box(create_quantum_interference(&a, &b_steps, &mut rng)));
    });
}

/// One bar of dispatch with every voice firing on every step
fn bench_dispatch(c: &mut Criterion) {
    let bank = Arc::new(PatternBank::new());
    for voice in VoiceId::ALL {
        bank.with_pattern(voice, |p| p.set_pattern(&[true; STEPS]));
    }
    let mut transport = Transport::new(bank);
    let mut events: Vec<NoteEvent> = Vec::with_capacity(STEPS * 3);

    c.bench_function("dispatch_one_bar", |b| {
        b.iter(|| {
            events.clear();
            transport.start(0.0);
            black_box(transport.dispatch_due(1.9, &mut events))
        });
    });
}

criterion_group!(
    benches,
    bench_markov_generation,
    bench_markov_training,
    bench_transforms,
    bench_structural,
    bench_interference,
    bench_dispatch
);
criterion_main!(benches);
