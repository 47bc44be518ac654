//! Hot-path benchmarks: every authenticated request verifies a session token
//! and asks the policy for a decision.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use taskboard_auth::{
    Action, Actor, Resource, Role, TaskQuery, TokenIssuer, authorize, task_scope,
};
use taskboard_core::{TaskStatus, UserId};

fn bench_authorize(c: &mut Criterion) {
    let me = UserId::new();
    let other = UserId::new();

    c.bench_function("authorize/member_task_update", |b| {
        b.iter(|| {
            authorize(
                black_box(Role::Member),
                black_box(me),
                Action::Update,
                Resource::Task {
                    assigned_to: Some(black_box(other)),
                },
            )
        })
    });

    c.bench_function("scope/member_task_list_1000", |b| {
        let assignees: Vec<Option<UserId>> = (0..1000)
            .map(|i| if i % 3 == 0 { Some(me) } else { Some(UserId::new()) })
            .collect();
        b.iter(|| {
            let scope = task_scope(Role::Member, me, TaskQuery::default());
            assignees
                .iter()
                .filter(|a| scope.permits(**a, TaskStatus::ToDo))
                .count()
        })
    });
}

fn bench_tokens(c: &mut Criterion) {
    let issuer = TokenIssuer::new(b"bench-session-secret", b"bench-refresh-secret")
        .expect("non-empty secrets");
    let token = issuer
        .issue_session(&Actor::new(UserId::new(), Role::Manager))
        .expect("issue session token");

    c.bench_function("token/verify_session", |b| {
        b.iter(|| issuer.verify_session(black_box(&token)))
    });
}

criterion_group!(benches, bench_authorize, bench_tokens);
criterion_main!(benches);
