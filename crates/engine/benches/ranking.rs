//! Benchmarks for vote tallying and ranking
//!
//! Run with: cargo bench --package engine
//!
//! Uses a synthetic round far larger than a real family night, so the
//! numbers bound what a results request costs.

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engine::VoteTally;
use model::{MemberId, Movie, Provenance, Suggestion, Vote, VoteDirection};
use uuid::Uuid;

const SLATE_SIZE: u32 = 50;
const MEMBERS: usize = 200;

fn create_round() -> (Vec<Suggestion>, Vec<Vote>, Vec<MemberId>) {
    let round_id = Uuid::new_v4();
    let slate: Vec<Suggestion> = (0..SLATE_SIZE)
        .map(|id| Suggestion {
            round_id,
            position: id as usize,
            movie: Movie::new(id, format!("Movie {id}")).with_popularity((id % 7) as f32),
            score: 0.0,
            reason: String::new(),
            provenance: Provenance::Algorithm,
        })
        .collect();

    let members: Vec<MemberId> = (0..MEMBERS).map(|_| Uuid::new_v4()).collect();
    let now = Utc::now();
    let votes = members
        .iter()
        .enumerate()
        .flat_map(|(m, member)| {
            (0..SLATE_SIZE).map(move |movie_id| Vote {
                round_id,
                movie_id,
                member_id: *member,
                direction: if (m + movie_id as usize) % 3 == 0 {
                    VoteDirection::Down
                } else {
                    VoteDirection::Up
                },
                voted_at: now + Duration::milliseconds(m as i64),
            })
        })
        .collect();

    (slate, votes, members)
}

fn bench_tally(c: &mut Criterion) {
    let (slate, votes, members) = create_round();

    c.bench_function("vote_tally_new", |b| {
        b.iter(|| {
            let tally = VoteTally::new(black_box(&slate), black_box(&votes), black_box(&members));
            black_box(tally)
        })
    });
}

fn bench_ranking(c: &mut Criterion) {
    let (slate, votes, members) = create_round();
    let tally = VoteTally::new(&slate, &votes, &members);

    c.bench_function("vote_tally_ranking", |b| {
        b.iter(|| {
            let ranking = black_box(&tally).ranking();
            black_box(ranking)
        })
    });
}

criterion_group!(benches, bench_tally, bench_ranking);
criterion_main!(benches);
