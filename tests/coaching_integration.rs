mod helpers;

use axum::Router;
use axum::http::StatusCode;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

async fn create_exercise(app: &Router, admin: &str, name: &str, difficulty: i32) -> (StatusCode, Value) {
    helpers::post_json(
        app,
        admin,
        "/api/v1/coaching/exercises",
        serde_json::json!({
            "name": name,
            "description": "Foot strengthening drill",
            "instructions": "Repeat slowly",
            "difficulty_level": difficulty,
            "target_area": "arch",
        }),
    )
    .await
}

async fn create_plan(app: &Router, admin: &str, client_uid: Uuid) -> Uuid {
    let (status, body) = helpers::post_json(
        app,
        admin,
        "/api/v1/coaching/workout-plans",
        serde_json::json!({
            "client_uid": client_uid,
            "name": "Arch rebuild",
            "start_date": "2025-03-01",
            "end_date": "2025-04-01",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create plan failed: {body}");
    Uuid::parse_str(body["uid"].as_str().unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn sessions_admin_creates_client_reads(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());

    let admin = helpers::admin_login(&app).await;
    let (alice, alice_token, _) =
        helpers::create_user(&app, &state, "alice", "alice@example.com").await;
    let (_, bob_token, _) = helpers::create_user(&app, &state, "bob", "bob@example.com").await;

    // Clients cannot book sessions themselves
    let session_body = |title: &str, date: &str| {
        serde_json::json!({
            "client_uid": alice,
            "title": title,
            "session_type": "personal",
            "session_date": date,
        })
    };
    let (status, _) = helpers::post_json(
        &app,
        &alice_token,
        "/api/v1/coaching/sessions",
        session_body("Self-booked", "2025-03-01T10:00:00Z"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for (title, date) in [
        ("Intro", "2025-03-01T10:00:00Z"),
        ("Follow-up", "2025-03-15T10:00:00Z"),
    ] {
        let (status, body) = helpers::post_json(
            &app,
            &admin,
            "/api/v1/coaching/sessions",
            session_body(title, date),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["status"], "scheduled");
        assert_eq!(body["duration_minutes"], 60);
    }

    let path = format!("/api/v1/coaching/sessions/client/{alice}");

    let (status, body) = helpers::get_json(&app, &alice_token, &path).await;
    assert_eq!(status, StatusCode::OK);
    let sessions = body.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["title"], "Follow-up", "newest session first");

    let (status, body) = helpers::get_json(&app, &bob_token, &path).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only view your own sessions");

    let (status, body) = helpers::get_json(&app, &admin, &path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn sessions_on_same_date_newest_booking_first(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());

    let admin = helpers::admin_login(&app).await;
    let (client, token, _) = helpers::create_user(&app, &state, "tie", "tie@example.com").await;

    for title in ["Booked first", "Booked second"] {
        let (status, body) = helpers::post_json(
            &app,
            &admin,
            "/api/v1/coaching/sessions",
            serde_json::json!({
                "client_uid": client,
                "title": title,
                "session_type": "group",
                "session_date": "2025-04-01T09:00:00Z",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = helpers::get_json(
        &app,
        &token,
        &format!("/api/v1/coaching/sessions/client/{client}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sessions = body.as_array().unwrap();
    assert_eq!(sessions[0]["title"], "Booked second");
    assert_eq!(sessions[1]["title"], "Booked first");
}

#[sqlx::test(migrations = "./migrations")]
async fn session_update_partial(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());

    let admin = helpers::admin_login(&app).await;
    let (client, _, _) = helpers::create_user(&app, &state, "carol", "carol@example.com").await;

    let (_, body) = helpers::post_json(
        &app,
        &admin,
        "/api/v1/coaching/sessions",
        serde_json::json!({
            "client_uid": client,
            "title": "Gait analysis",
            "session_type": "virtual",
            "session_date": "2025-03-01T10:00:00Z",
            "meeting_link": "https://meet.example.com/abc",
        }),
    )
    .await;
    let session_uid = body["uid"].as_str().unwrap().to_owned();

    let (status, body) = helpers::put_json(
        &app,
        &admin,
        &format!("/api/v1/coaching/sessions/{session_uid}"),
        serde_json::json!({ "status": "completed", "notes": "Overpronation noted" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["notes"], "Overpronation noted");
    assert_eq!(body["title"], "Gait analysis");
    assert_eq!(body["meeting_link"], "https://meet.example.com/abc");

    let (status, body) = helpers::put_json(
        &app,
        &admin,
        &format!("/api/v1/coaching/sessions/{}", Uuid::new_v4()),
        serde_json::json!({ "status": "cancelled" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");
}

#[sqlx::test(migrations = "./migrations")]
async fn session_for_unknown_client(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state);
    let admin = helpers::admin_login(&app).await;

    let (status, body) = helpers::post_json(
        &app,
        &admin,
        "/api/v1/coaching/sessions",
        serde_json::json!({
            "client_uid": Uuid::new_v4(),
            "title": "Ghost",
            "session_type": "group",
            "session_date": "2025-03-01T10:00:00Z",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "referenced resource does not exist");
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn progress_self_service(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());

    let (dana, dana_token, _) =
        helpers::create_user(&app, &state, "dana", "dana@example.com").await;
    let (erin, erin_token, _) =
        helpers::create_user(&app, &state, "erin", "erin@example.com").await;

    for (date, pain) in [("2025-03-01", 7), ("2025-03-08", 5)] {
        let (status, body) = helpers::post_json(
            &app,
            &dana_token,
            "/api/v1/coaching/progress",
            serde_json::json!({
                "client_uid": dana,
                "date_recorded": date,
                "pain_level": pain,
                "mobility_score": 4,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = helpers::post_json(
        &app,
        &erin_token,
        "/api/v1/coaching/progress",
        serde_json::json!({ "client_uid": dana, "date_recorded": "2025-03-09" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only create progress entries for yourself");

    let (status, body) = helpers::get_json(
        &app,
        &dana_token,
        &format!("/api/v1/coaching/progress/client/{dana}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["date_recorded"], "2025-03-08");
    assert_eq!(entries[0]["pain_level"], 5);

    let (status, body) = helpers::get_json(
        &app,
        &dana_token,
        &format!("/api/v1/coaching/progress/client/{erin}"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only view your own progress");
}

#[sqlx::test(migrations = "./migrations")]
async fn progress_scores_validated(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());

    let (uid, token, _) = helpers::create_user(&app, &state, "fay", "fay@example.com").await;

    let (status, body) = helpers::post_json(
        &app,
        &token,
        "/api/v1/coaching/progress",
        serde_json::json!({
            "client_uid": uid,
            "date_recorded": "2025-03-01",
            "pain_level": 11,
            "strength_score": -2,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields = body["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 2);
    assert!(fields[0].as_str().unwrap().starts_with("pain_level"));
}

#[sqlx::test(migrations = "./migrations")]
async fn progress_for_unknown_session(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());

    let (uid, token, _) = helpers::create_user(&app, &state, "gil", "gil@example.com").await;

    let (status, body) = helpers::post_json(
        &app,
        &token,
        "/api/v1/coaching/progress",
        serde_json::json!({
            "client_uid": uid,
            "session_uid": Uuid::new_v4(),
            "date_recorded": "2025-03-01",
            "pain_level": 3,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "referenced resource does not exist");

    let (status, body) = helpers::get_json(
        &app,
        &token,
        &format!("/api/v1/coaching/progress/client/{uid}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Exercises
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn exercises_catalog(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());

    let admin = helpers::admin_login(&app).await;
    let (_, user_token, _) = helpers::create_user(&app, &state, "gus", "gus@example.com").await;

    let (status, _) = create_exercise(&app, &user_token, "Toe spread", 2).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = create_exercise(&app, &admin, "Too hard", 6).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    for name in ["Towel curls", "Marble pickup", "Calf raise"] {
        let (status, body) = create_exercise(&app, &admin, name, 2).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = helpers::get_json(&app, &user_token, "/api/v1/coaching/exercises").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Calf raise", "Marble pickup", "Towel curls"]);

    let (status, _) = helpers::get_json(&app, "", "/api/v1/coaching/exercises").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn exercise_update(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state);
    let admin = helpers::admin_login(&app).await;

    let (_, body) = create_exercise(&app, &admin, "Short foot", 1).await;
    let uid = body["uid"].as_str().unwrap().to_owned();

    let (status, body) = helpers::put_json(
        &app,
        &admin,
        &format!("/api/v1/coaching/exercises/{uid}"),
        serde_json::json!({ "difficulty_level": 3, "equipment_needed": "none" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["difficulty_level"], 3);
    assert_eq!(body["equipment_needed"], "none");
    assert_eq!(body["name"], "Short foot");

    let (status, body) = helpers::put_json(
        &app,
        &admin,
        &format!("/api/v1/coaching/exercises/{}", Uuid::new_v4()),
        serde_json::json!({ "name": "Nothing" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Exercise not found");
}

// ---------------------------------------------------------------------------
// Workout plans
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn workout_plan_with_exercises(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());

    let admin = helpers::admin_login(&app).await;
    let (hana, hana_token, _) =
        helpers::create_user(&app, &state, "hana", "hana@example.com").await;
    let (_, ivan_token, _) = helpers::create_user(&app, &state, "ivan", "ivan@example.com").await;

    let plan = create_plan(&app, &admin, hana).await;
    let (_, first) = create_exercise(&app, &admin, "Towel curls", 1).await;
    let (_, second) = create_exercise(&app, &admin, "Calf raise", 2).await;

    let slots_path = format!("/api/v1/coaching/workout-plans/{plan}/exercises");
    for (exercise, order) in [(&second, 1), (&first, 0)] {
        let (status, body) = helpers::post_json(
            &app,
            &admin,
            &slots_path,
            serde_json::json!({
                "exercise_uid": exercise["uid"],
                "sets": 3,
                "reps": 12,
                "order_index": order,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["message"], "Exercise added to plan successfully");
        assert!(body["uid"].is_string());
    }

    let (status, body) = helpers::get_json(&app, &hana_token, &slots_path).await;
    assert_eq!(status, StatusCode::OK);
    let slots = body.as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["exercise_name"], "Towel curls");
    assert_eq!(slots[0]["rest_seconds"], 30);
    assert_eq!(slots[1]["exercise_name"], "Calf raise");

    let (status, _) = helpers::get_json(&app, &ivan_token, &slots_path).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = helpers::get_json(
        &app,
        &hana_token,
        &format!("/api/v1/coaching/workout-plans/client/{hana}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["is_active"], true);

    let (status, body) = helpers::get_json(
        &app,
        &ivan_token,
        &format!("/api/v1/coaching/workout-plans/client/{hana}"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only view your own workout plans");
}

#[sqlx::test(migrations = "./migrations")]
async fn add_to_missing_plan_or_exercise(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());

    let admin = helpers::admin_login(&app).await;
    let (client, _, _) = helpers::create_user(&app, &state, "jo", "jo@example.com").await;
    let plan = create_plan(&app, &admin, client).await;
    let (_, exercise) = create_exercise(&app, &admin, "Heel walk", 1).await;

    let (status, body) = helpers::post_json(
        &app,
        &admin,
        &format!("/api/v1/coaching/workout-plans/{}/exercises", Uuid::new_v4()),
        serde_json::json!({ "exercise_uid": exercise["uid"] }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Workout plan not found");

    let (status, body) = helpers::post_json(
        &app,
        &admin,
        &format!("/api/v1/coaching/workout-plans/{plan}/exercises"),
        serde_json::json!({ "exercise_uid": Uuid::new_v4() }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Exercise not found");
}

// ---------------------------------------------------------------------------
// Assessments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn assessments_access(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());

    let admin = helpers::admin_login(&app).await;
    let (kai, kai_token, _) = helpers::create_user(&app, &state, "kai", "kai@example.com").await;
    let (_, lee_token, _) = helpers::create_user(&app, &state, "lee", "lee@example.com").await;

    let (status, _) = helpers::post_json(
        &app,
        &admin,
        "/api/v1/coaching/assessments",
        serde_json::json!({
            "client_uid": kai,
            "assessment_date": "2025-03-01",
            "current_activity_level": 0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    for date in ["2025-01-10", "2025-03-01"] {
        let (status, body) = helpers::post_json(
            &app,
            &admin,
            "/api/v1/coaching/assessments",
            serde_json::json!({
                "client_uid": kai,
                "assessment_date": date,
                "foot_type": "high arch",
                "current_activity_level": 3,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let path = format!("/api/v1/coaching/assessments/client/{kai}");
    let (status, body) = helpers::get_json(&app, &kai_token, &path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["assessment_date"], "2025-03-01");
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = helpers::get_json(&app, &lee_token, &path).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only view your own assessments");

    let (status, _) = helpers::post_json(
        &app,
        &kai_token,
        "/api/v1/coaching/assessments",
        serde_json::json!({ "client_uid": kai, "assessment_date": "2025-03-02" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
