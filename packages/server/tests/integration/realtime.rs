use std::time::Duration;

use serde_json::json;

use crate::common::TestApp;

mod presence {
    use super::*;

    #[tokio::test]
    async fn match_activates_when_both_players_connect() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let problem = app.create_problem(2).await;
        let match_id = app.create_match(alice, bob, problem).await;

        let mut alice_ws = app.connect(match_id, alice).await;
        let joined = alice_ws.expect_event("player.event").await;
        assert_eq!(joined["event"], "joined");
        assert_eq!(joined["user_id"], alice);
        assert_eq!(app.duel(match_id).await["status"], "PENDING");

        let _bob_ws = app.connect(match_id, bob).await;
        let start = alice_ws.expect_event("match.start").await;
        assert_eq!(start["match_id"], match_id);
        assert_eq!(start["problem"]["id"], problem);
        assert_eq!(start["players"].as_array().map(Vec::len), Some(2));

        let record = app.duel(match_id).await;
        assert_eq!(record["status"], "ACTIVE");
        assert!(record["start_time"].is_string());
        assert_eq!(app.profile(alice).await["is_online"], true);
    }

    #[tokio::test]
    async fn leaving_an_active_match_forfeits_it() {
        let app = TestApp::spawn().await;
        let duel = app.start_duel(3).await;
        let mut bob_ws = duel.bob_ws;

        duel.alice_ws.close().await;

        let left = bob_ws
            .expect_matching("player.event", |p| p["event"] == "left")
            .await;
        assert_eq!(left["user_id"], duel.alice);

        let end = bob_ws.expect_event("match_end").await;
        assert_eq!(end["status"], "COMPLETED");
        assert_eq!(end["reason"], "disconnect");
        assert_eq!(end["winner_id"], duel.bob);
        assert_eq!(end["loser_id"], duel.alice);

        assert_eq!(app.rating(duel.bob).await, 1215);
        assert_eq!(app.rating(duel.alice).await, 1180);
    }

    #[tokio::test]
    async fn second_connection_gets_a_snapshot_and_closing_it_keeps_the_match() {
        let app = TestApp::spawn().await;
        let duel = app.start_duel(3).await;

        let mut second = app.connect(duel.match_id, duel.alice).await;
        let snapshot = second.expect_event("match.start").await;
        assert_eq!(snapshot["match_id"], duel.match_id);
        second.close().await;

        // Alice is still connected through her first socket.
        let mut alice_ws = duel.alice_ws;
        alice_ws.submit("pass 1", "python").await;
        alice_ws.expect_verdict(duel.alice).await;
        assert_eq!(app.duel(duel.match_id).await["status"], "ACTIVE");
    }

    #[tokio::test]
    async fn leaving_a_pending_match_changes_nothing() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let problem = app.create_problem(1).await;
        let match_id = app.create_match(alice, bob, problem).await;

        let mut alice_ws = app.connect(match_id, alice).await;
        alice_ws.expect_event("player.event").await;
        alice_ws.close().await;
        app.wait_offline(alice).await;
        assert_eq!(app.duel(match_id).await["status"], "PENDING");
        assert_eq!(app.rating(alice).await, 1200);

        // Alice's earlier visit does not count towards activation.
        let mut bob_ws = app.connect(match_id, bob).await;
        let joined = bob_ws.expect_event("player.event").await;
        assert_eq!(joined["user_id"], bob);
        assert_eq!(app.duel(match_id).await["status"], "PENDING");
    }
}

mod handshake {
    use super::*;

    #[tokio::test]
    async fn identity_is_required() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let problem = app.create_problem(1).await;
        let match_id = app.create_match(alice, bob, problem).await;

        assert_eq!(app.try_connect(match_id, None).await.err(), Some(401));
    }

    #[tokio::test]
    async fn outsiders_are_refused() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let mallory = app.create_user("mallory").await;
        let problem = app.create_problem(1).await;
        let match_id = app.create_match(alice, bob, problem).await;

        assert_eq!(app.try_connect(match_id, Some(mallory)).await.err(), Some(403));
        assert_eq!(app.try_connect(9999, Some(alice)).await.err(), Some(404));
    }

    #[tokio::test]
    async fn finished_matches_are_refused() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let problem = app.create_problem(1).await;
        let match_id = app.create_match(alice, bob, problem).await;
        app.post_as(&crate::common::routes::cancel(match_id), &json!({}), alice)
            .await;

        assert_eq!(app.try_connect(match_id, Some(alice)).await.err(), Some(409));
    }
}

mod client_messages {
    use super::*;

    #[tokio::test]
    async fn unknown_action_gets_an_error_event() {
        let app = TestApp::spawn().await;
        let mut duel = app.start_duel(1).await;

        duel.alice_ws.send(json!({ "action": "resign" })).await;
        let error = duel.alice_ws.expect_event("error").await;
        assert_eq!(error["message"], "Unsupported action: resign");

        duel.alice_ws.send(json!({ "code": "x" })).await;
        let error = duel.alice_ws.expect_event("error").await;
        assert_eq!(error["message"], "Missing action");
    }

    #[tokio::test]
    async fn incomplete_submission_is_rejected() {
        let app = TestApp::spawn().await;
        let mut duel = app.start_duel(1).await;

        duel.alice_ws
            .send(json!({ "action": "submit_code", "code": "pass all" }))
            .await;
        let error = duel.alice_ws.expect_event("error").await;
        assert_eq!(error["message"], "Missing code or language");
    }

    #[tokio::test]
    async fn unsupported_language_is_rejected() {
        let app = TestApp::spawn().await;
        let mut duel = app.start_duel(1).await;

        duel.alice_ws.submit("pass all", "brainfuck").await;
        let error = duel.alice_ws.expect_event("error").await;
        assert_eq!(error["message"], "Unsupported language: brainfuck");
        assert_eq!(app.duel(duel.match_id).await["status"], "ACTIVE");
    }

    #[tokio::test]
    async fn submitting_before_the_match_starts_is_rejected() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let problem = app.create_problem(1).await;
        let match_id = app.create_match(alice, bob, problem).await;

        let mut alice_ws = app.connect(match_id, alice).await;
        alice_ws.submit("pass all", "python").await;
        let error = alice_ws.expect_event("error").await;
        assert_eq!(error["message"], "Match is not active");
    }

    #[tokio::test]
    async fn errors_go_only_to_the_sender() {
        let app = TestApp::spawn().await;
        let mut duel = app.start_duel(1).await;

        duel.alice_ws.send(json!({ "action": "resign" })).await;
        duel.alice_ws.expect_event("error").await;

        duel.bob_ws.submit("pass all", "python").await;
        let kinds = duel.bob_ws.drain_types().await;
        assert!(!kinds.iter().any(|k| k == "error"), "{kinds:?}");
    }
}

mod dashboard {
    use super::*;

    #[tokio::test]
    async fn rating_changes_reach_the_dashboard() {
        let app = TestApp::spawn().await;
        let mut feed = app.connect_dashboard().await;
        let mut duel = app.start_duel(2).await;

        duel.alice_ws.submit("pass all", "python").await;

        // Skip the presence updates sent when the players connected.
        let points = feed
            .expect_matching("user_update", |p| {
                p["user_id"] == duel.alice && p["rating"] != 1200
            })
            .await;
        assert_eq!(points["rating"], 1202);
        assert_eq!(points["username"], "alice");

        let win = feed
            .expect_matching("user_update", |p| p["user_id"] == duel.alice)
            .await;
        assert_eq!(win["rating"], 1217);

        let loss = feed
            .expect_matching("user_update", |p| {
                p["user_id"] == duel.bob && p["rating"] != 1200
            })
            .await;
        assert_eq!(loss["rating"], 1180);
        assert_eq!(loss["rank"], "Silver");
    }

    #[tokio::test]
    async fn presence_changes_reach_the_dashboard() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let problem = app.create_problem(1).await;
        let match_id = app.create_match(alice, bob, problem).await;
        let mut feed = app.connect_dashboard().await;

        let alice_ws = app.connect(match_id, alice).await;
        let online = feed
            .expect_matching("user_update", |p| p["user_id"] == alice)
            .await;
        assert_eq!(online["is_online"], true);
        assert_eq!(online["username"], "alice");
        assert_eq!(online["rating"], 1200);

        alice_ws.close().await;
        let offline = feed
            .expect_matching("user_update", |p| p["user_id"] == alice)
            .await;
        assert_eq!(offline["is_online"], false);
        app.wait_offline(alice).await;
    }

    #[tokio::test]
    async fn a_second_socket_keeps_the_player_online() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let problem = app.create_problem(1).await;
        let match_id = app.create_match(alice, bob, problem).await;

        let mut lobby = app.connect_dashboard_as(alice).await;
        lobby.expect_event("player_list").await;
        let alice_ws = app.connect(match_id, alice).await;
        alice_ws.close().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(app.profile(alice).await["is_online"], true);

        lobby.close().await;
        app.wait_offline(alice).await;
    }
}
