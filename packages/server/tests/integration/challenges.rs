//! Dashboard handshake: challenge, answer, and the match it produces.

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::json;
use server::entity::{matches, user_profile};

use crate::common::{TestApp, WsClient, routes};

async fn dashboard(app: &TestApp, user_id: i32) -> WsClient {
    let mut ws = app.connect_dashboard_as(user_id).await;
    ws.expect_event("player_list").await;
    ws
}

async fn challenge(ws: &mut WsClient, target: i32) {
    ws.send(json!({ "action": "send_challenge", "target_user_id": target }))
        .await;
}

async fn answer(ws: &mut WsClient, challenger: i32, response: &str) {
    ws.send(json!({
        "action": "challenge_response",
        "challenger_id": challenger,
        "response": response,
    }))
    .await;
}

async fn set_online_with_rating(app: &TestApp, user_id: i32, rating: i32) {
    user_profile::Entity::update_many()
        .set(user_profile::ActiveModel {
            rating: Set(rating),
            is_online: Set(true),
            ..Default::default()
        })
        .filter(user_profile::Column::UserId.eq(user_id))
        .exec(&app.db)
        .await
        .unwrap();
}

mod handshake {
    use super::*;

    #[tokio::test]
    async fn accepted_challenge_creates_a_match_for_both() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        app.create_problem(1).await;
        let mut alice_dash = dashboard(&app, alice).await;
        let mut bob_dash = dashboard(&app, bob).await;

        challenge(&mut alice_dash, bob).await;
        let offer = bob_dash.expect_event("receive_challenge").await;
        assert_eq!(offer["challenger"]["user_id"], alice);
        assert_eq!(offer["challenger"]["username"], "alice");

        answer(&mut bob_dash, alice, "accepted").await;
        let for_alice = alice_dash.expect_event("match_start_countdown").await;
        let for_bob = bob_dash.expect_event("match_start_countdown").await;
        assert_eq!(for_alice["match_id"], for_bob["match_id"]);

        let match_id = for_alice["match_id"].as_i64().unwrap() as i32;
        let duel = app.duel(match_id).await;
        assert_eq!(duel["status"], "PENDING");
        assert_eq!(duel["player1_id"], alice);
        assert_eq!(duel["player2_id"], bob);

        let mut alice_ws = app.connect(match_id, alice).await;
        let mut bob_ws = app.connect(match_id, bob).await;
        alice_ws.expect_event("match.start").await;
        bob_ws.expect_event("match.start").await;
    }

    #[tokio::test]
    async fn declined_challenge_tells_the_challenger() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let mut alice_dash = dashboard(&app, alice).await;
        let mut bob_dash = dashboard(&app, bob).await;

        challenge(&mut alice_dash, bob).await;
        bob_dash.expect_event("receive_challenge").await;
        answer(&mut bob_dash, alice, "declined").await;

        let reply = alice_dash.expect_event("challenge_response").await;
        assert_eq!(reply["response"], "declined");
        assert_eq!(reply["responder"]["user_id"], bob);

        // The offer is gone once answered.
        answer(&mut bob_dash, alice, "accepted").await;
        let err = bob_dash.expect_event("error").await;
        assert_eq!(
            err["message"],
            format!("No pending challenge from user {alice}")
        );
    }

    #[tokio::test]
    async fn cancelled_challenge_cannot_be_accepted() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        app.create_problem(1).await;
        let mut alice_dash = dashboard(&app, alice).await;
        let mut bob_dash = dashboard(&app, bob).await;

        challenge(&mut alice_dash, bob).await;
        bob_dash.expect_event("receive_challenge").await;
        alice_dash
            .send(json!({ "action": "cancel_challenge", "target_user_id": bob }))
            .await;

        let cancelled = bob_dash.expect_event("challenge_cancelled").await;
        assert_eq!(cancelled["challenger"]["user_id"], alice);

        answer(&mut bob_dash, alice, "accepted").await;
        bob_dash.expect_event("error").await;
        let created = matches::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(created, 0);
    }

    #[tokio::test]
    async fn leaving_the_dashboard_withdraws_open_challenges() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let mut alice_dash = dashboard(&app, alice).await;
        let mut bob_dash = dashboard(&app, bob).await;

        challenge(&mut alice_dash, bob).await;
        bob_dash.expect_event("receive_challenge").await;
        alice_dash.close().await;

        let cancelled = bob_dash.expect_event("challenge_cancelled").await;
        assert_eq!(cancelled["challenger"]["username"], "alice");
    }

    #[tokio::test]
    async fn no_problem_to_play_fails_for_both() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let mut alice_dash = dashboard(&app, alice).await;
        let mut bob_dash = dashboard(&app, bob).await;

        challenge(&mut alice_dash, bob).await;
        bob_dash.expect_event("receive_challenge").await;
        answer(&mut bob_dash, alice, "accepted").await;

        let err = alice_dash.expect_event("error").await;
        assert_eq!(err["message"], "No problems available");
        let err = bob_dash.expect_event("error").await;
        assert_eq!(err["message"], "No problems available");
    }
}

mod refusals {
    use super::*;

    #[tokio::test]
    async fn target_must_be_on_the_dashboard() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let mut alice_dash = dashboard(&app, alice).await;

        challenge(&mut alice_dash, bob).await;
        let err = alice_dash.expect_event("error").await;
        assert_eq!(err["message"], format!("User {bob} is not on the dashboard"));

        challenge(&mut alice_dash, alice).await;
        let err = alice_dash.expect_event("error").await;
        assert_eq!(err["message"], "You cannot challenge yourself");
    }

    #[tokio::test]
    async fn unknown_dashboard_action_gets_an_error() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let mut alice_dash = dashboard(&app, alice).await;

        alice_dash.send(json!({ "action": "resign" })).await;
        let err = alice_dash.expect_event("error").await;
        assert_eq!(err["message"], "Unsupported action: resign");

        alice_dash
            .send(json!({ "action": "send_challenge" }))
            .await;
        let err = alice_dash.expect_event("error").await;
        assert!(
            err["message"]
                .as_str()
                .unwrap()
                .starts_with("Malformed message")
        );
    }

    #[tokio::test]
    async fn anonymous_dashboard_cannot_act() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob").await;
        let mut feed = app.connect_dashboard().await;

        feed.send(json!({ "action": "send_challenge", "target_user_id": bob }))
            .await;
        let err = feed.expect_event("error").await;
        assert_eq!(err["message"], "Missing caller identity");
    }
}

mod online_players {
    use super::*;

    #[tokio::test]
    async fn nearest_ratings_come_first() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let near = app.create_user("near").await;
        let mid = app.create_user("mid").await;
        let far = app.create_user("far").await;
        let offline = app.create_user("offline").await;
        set_online_with_rating(&app, near, 1195).await;
        set_online_with_rating(&app, mid, 1210).await;
        set_online_with_rating(&app, far, 1500).await;

        let res = app.get_as(routes::ONLINE_PLAYERS, alice).await;
        assert_eq!(res.status, 200, "{}", res.text);
        let ids: Vec<i64> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["user_id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![near as i64, mid as i64, far as i64]);
        assert!(!ids.contains(&(offline as i64)));
        assert_eq!(res.body[0]["username"], "near");
        assert_eq!(res.body[0]["rank"], "Silver");
    }

    #[tokio::test]
    async fn at_most_ten_players_are_listed() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        for i in 0..12 {
            let id = app.create_user(&format!("player{i}")).await;
            set_online_with_rating(&app, id, 1200 + i * 10).await;
        }

        let res = app.get_as(routes::ONLINE_PLAYERS, alice).await;
        let players = res.body.as_array().unwrap();
        assert_eq!(players.len(), 10);
        assert_eq!(players[0]["username"], "player0");
        assert_eq!(players[9]["username"], "player9");
    }

    #[tokio::test]
    async fn caller_identity_is_required() {
        let app = TestApp::spawn().await;
        assert_eq!(app.get_anonymous(routes::ONLINE_PLAYERS).await.status, 401);
        assert_eq!(app.get_as(routes::ONLINE_PLAYERS, 999).await.status, 404);
    }

    #[tokio::test]
    async fn dashboard_opens_with_the_player_list() {
        let app = TestApp::spawn().await;
        let (alice, bob) = app.create_players().await;
        let _bob_dash = dashboard(&app, bob).await;

        let mut alice_dash = app.connect_dashboard_as(alice).await;
        let list = alice_dash.expect_event("player_list").await;
        let players = list["players"].as_array().unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0]["user_id"], bob);
        assert_eq!(players[0]["username"], "bob");
    }
}

mod languages {
    use super::*;

    #[tokio::test]
    async fn supported_languages_are_listed_by_key() {
        let app = TestApp::spawn().await;

        let res = app.get_anonymous(routes::LANGUAGES).await;
        assert_eq!(res.status, 200, "{}", res.text);
        let languages = res.body.as_array().unwrap();
        let keys: Vec<&str> = languages
            .iter()
            .map(|l| l["key"].as_str().unwrap())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);

        let python = languages.iter().find(|l| l["key"] == "python").unwrap();
        assert_eq!(python["language_id"], 71);
    }
}
