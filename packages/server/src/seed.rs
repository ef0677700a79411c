use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::entity::{problem, test_case};

struct SampleProblem {
    title: &'static str,
    description: &'static str,
    difficulty: i32,
    cases: &'static [(&'static str, &'static str)],
}

/// Problems inserted into an empty problem table.
const SAMPLE_PROBLEMS: &[SampleProblem] = &[
    SampleProblem {
        title: "Sum of Two Numbers",
        description: "Read two integers `a` and `b` and print `a + b`.",
        difficulty: 1,
        cases: &[("1 2", "3"), ("10 -4", "6"), ("0 0", "0"), ("123456 654321", "777777")],
    },
    SampleProblem {
        title: "Reverse a String",
        description: "Read a single line and print it reversed.",
        difficulty: 1,
        cases: &[("hello", "olleh"), ("abc", "cba"), ("racecar", "racecar")],
    },
    SampleProblem {
        title: "Fibonacci",
        description: "Read `n` (0 <= n <= 40) and print the n-th Fibonacci number, F(0) = 0.",
        difficulty: 2,
        cases: &[("0", "0"), ("1", "1"), ("10", "55"), ("40", "102334155")],
    },
];

/// Seed sample problems when the problem table is empty.
pub async fn seed_sample_problems(db: &DatabaseConnection) -> Result<(), DbErr> {
    if problem::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let txn = db.begin().await?;
    let now = Utc::now();
    for sample in SAMPLE_PROBLEMS {
        let created = problem::ActiveModel {
            title: Set(sample.title.to_owned()),
            description: Set(sample.description.to_owned()),
            difficulty: Set(sample.difficulty),
            time_limit_ms: Set(2000),
            memory_limit_mb: Set(256),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for (position, (input, expected)) in sample.cases.iter().enumerate() {
            test_case::ActiveModel {
                problem_id: Set(created.id),
                position: Set(position as i32),
                input: Set((*input).to_owned()),
                expected_output: Set((*expected).to_owned()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }
    txn.commit().await?;

    info!("Seeded {} sample problems", SAMPLE_PROBLEMS.len());
    Ok(())
}
