//! Full duels driven over the match sockets.

use serde_json::Value;
use server::config::DrawPolicy;

use crate::common::TestApp;

fn change_for(end: &Value, user_id: i32) -> Value {
    end["rating_changes"]
        .as_array()
        .expect("rating_changes missing")
        .iter()
        .find(|c| c["user_id"] == user_id)
        .cloned()
        .unwrap_or_else(|| panic!("no rating change for user {user_id}"))
}

mod accepted {
    use super::*;

    #[tokio::test]
    async fn accepted_submission_wins_outright() {
        let app = TestApp::spawn().await;
        let mut duel = app.start_duel(3).await;

        duel.alice_ws.submit("pass all", "python").await;

        let pending = duel.bob_ws.expect_event("submission.pending").await;
        assert_eq!(pending["user_id"], duel.alice);

        let verdict = duel.bob_ws.expect_verdict(duel.alice).await;
        assert_eq!(verdict["status"], "ACCEPTED");
        assert_eq!(verdict["test_cases_passed"], 3);
        assert_eq!(verdict["total_test_cases"], 3);

        let end = duel.alice_ws.expect_event("match_end").await;
        assert_eq!(end["match_id"], duel.match_id);
        assert_eq!(end["status"], "COMPLETED");
        assert_eq!(end["winner_id"], duel.alice);
        assert_eq!(end["loser_id"], duel.bob);
        assert_eq!(end["reason"], "accepted");

        // Test case points land before the win bonus.
        let alice = change_for(&end, duel.alice);
        assert_eq!(alice["old_rating"], 1203);
        assert_eq!(alice["new_rating"], 1218);
        let bob = change_for(&end, duel.bob);
        assert_eq!(bob["old_rating"], 1200);
        assert_eq!(bob["new_rating"], 1180);

        let bob_end = duel.bob_ws.expect_event("match_end").await;
        assert_eq!(bob_end["winner_id"], duel.alice);

        let record = app.duel(duel.match_id).await;
        assert_eq!(record["status"], "COMPLETED");
        assert_eq!(record["winner_id"], duel.alice);
        assert_eq!(record["end_reason"], "accepted");
        assert!(record["end_time"].is_string());

        let alice = app.profile(duel.alice).await;
        assert_eq!(alice["rating"], 1218);
        assert_eq!(alice["wins"], 1);
        assert_eq!(alice["total_battles"], 1);
        assert_eq!(alice["current_streak"], 1);
        assert_eq!(alice["win_rate"], 100.0);
        let bob = app.profile(duel.bob).await;
        assert_eq!(bob["rating"], 1180);
        assert_eq!(bob["losses"], 1);
        assert_eq!(bob["current_streak"], 0);
    }

    #[tokio::test]
    async fn match_channel_closes_after_match_end() {
        let app = TestApp::spawn().await;
        let mut duel = app.start_duel(2).await;

        duel.bob_ws.submit("pass all", "cpp").await;

        let kinds = duel.alice_ws.drain_types().await;
        assert_eq!(kinds.last().map(String::as_str), Some("match_end"));
        assert_eq!(app.duel(duel.match_id).await["winner_id"], duel.bob);
    }
}

mod compared {
    use super::*;

    #[tokio::test]
    async fn more_passed_cases_wins_once_both_are_judged() {
        let app = TestApp::spawn().await;
        let mut duel = app.start_duel(10).await;

        duel.alice_ws.submit("pass 7", "python").await;
        let verdict = duel.alice_ws.expect_verdict(duel.alice).await;
        assert_eq!(verdict["status"], "WRONG_ANSWER");
        assert_eq!(verdict["test_cases_passed"], 7);

        // One verdict is not enough to decide the match.
        assert_eq!(app.duel(duel.match_id).await["status"], "ACTIVE");
        assert_eq!(app.rating(duel.alice).await, 1207);

        duel.bob_ws.submit("pass 4", "python").await;

        let end = duel.bob_ws.expect_event("match_end").await;
        assert_eq!(end["status"], "COMPLETED");
        assert_eq!(end["winner_id"], duel.alice);
        assert_eq!(end["loser_id"], duel.bob);
        assert_eq!(end["reason"], "more_tests_passed");

        let alice = change_for(&end, duel.alice);
        assert_eq!(alice["old_rating"], 1207);
        assert_eq!(alice["new_rating"], 1222);
        let bob = change_for(&end, duel.bob);
        assert_eq!(bob["old_rating"], 1204);
        assert_eq!(bob["new_rating"], 1184);

        assert_eq!(app.rating(duel.alice).await, 1222);
        assert_eq!(app.rating(duel.bob).await, 1184);
        assert_eq!(app.profile(duel.bob).await["losses"], 1);
    }

    #[tokio::test]
    async fn equal_passed_cases_is_a_draw() {
        let app = TestApp::spawn().await;
        let mut duel = app.start_duel(10).await;

        duel.alice_ws.submit("pass 5", "python").await;
        duel.alice_ws.expect_verdict(duel.alice).await;
        duel.bob_ws.submit("pass 5", "python").await;

        let end = duel.alice_ws.expect_event("match_end").await;
        assert_eq!(end["status"], "COMPLETED");
        assert_eq!(end["reason"], "draw");
        assert!(end["winner_id"].is_null());
        assert!(end["loser_id"].is_null());
        assert_eq!(end["rating_changes"], serde_json::json!([]));

        for player in [duel.alice, duel.bob] {
            let profile = app.profile(player).await;
            assert_eq!(profile["rating"], 1205);
            assert_eq!(profile["total_battles"], 0);
        }
    }

    #[tokio::test]
    async fn draw_counts_as_a_battle_when_configured() {
        let app = TestApp::spawn_with(|config| {
            config.stats.draw_policy = DrawPolicy::CountBattle;
        })
        .await;
        let mut duel = app.start_duel(4).await;

        duel.alice_ws.submit("pass 2", "python").await;
        duel.alice_ws.expect_verdict(duel.alice).await;
        duel.bob_ws.submit("pass 2", "python").await;

        let end = duel.bob_ws.expect_event("match_end").await;
        assert_eq!(end["reason"], "draw");

        for player in [duel.alice, duel.bob] {
            let profile = app.profile(player).await;
            assert_eq!(profile["rating"], 1202);
            assert_eq!(profile["total_battles"], 1);
            assert_eq!(profile["wins"], 0);
            assert_eq!(profile["losses"], 0);
        }
    }

    #[tokio::test]
    async fn latest_verdict_replaces_earlier_attempts() {
        let app = TestApp::spawn().await;
        let mut duel = app.start_duel(10).await;

        duel.alice_ws.submit("pass 2", "python").await;
        duel.alice_ws.expect_verdict(duel.alice).await;
        duel.alice_ws.submit("pass 6", "python").await;
        duel.alice_ws.expect_verdict(duel.alice).await;

        duel.bob_ws.submit("pass 4", "python").await;

        let end = duel.alice_ws.expect_event("match_end").await;
        assert_eq!(end["winner_id"], duel.alice);
        assert_eq!(end["reason"], "more_tests_passed");
    }
}
