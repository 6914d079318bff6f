//! Ledger API router.
//!
//! Returns a composable `Router` with all endpoints nested under
//! `/api/`. Caller identity arrives in gateway-set headers and is
//! pulled by the `Caller` extractor; requests without it get 401.

use axum::routing::{get, post};
use axum::Router;
use rusqlite::Connection;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the ledger API router over an open database connection.
pub fn ledger_router(conn: Connection) -> Router {
    let ctx = ApiContext::new(conn);
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/visits", post(endpoints::visits::create))
        .route(
            "/visits/draft-candidates",
            get(endpoints::visits::draft_candidates),
        )
        .route(
            "/visits/sign-off-candidates",
            get(endpoints::visits::sign_off_candidates),
        )
        .route(
            "/visits/:id",
            get(endpoints::visits::detail).patch(endpoints::visits::update),
        )
        .route("/claims", post(endpoints::claims::create))
        .route("/claims/:id/submit", post(endpoints::claims::submit))
        .route(
            "/claims/:id",
            get(endpoints::claims::detail).delete(endpoints::claims::delete),
        )
        .route("/sign-offs", post(endpoints::signoff::record))
        .route("/export/monthly", get(endpoints::export::monthly))
        .with_state(ctx);

    Router::new().nest("/api", api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router() -> Router {
        ledger_router(open_memory_database().unwrap())
    }

    fn authed(request: Request<Body>) -> Request<Body> {
        let (mut parts, body) = request.into_parts();
        parts
            .headers
            .insert("x-caller-uid", "uid-1".parse().unwrap());
        parts
            .headers
            .insert("x-caller-email", "sw@example.org".parse().unwrap());
        Request::from_parts(parts, body)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn draft_body() -> Value {
        json!({
            "id": null,
            "member_id": "m-1",
            "member_name": "Pat",
            "member_room": null,
            "rcfe_id": "rcfe-1",
            "rcfe_name": "Sunrise Home",
            "rcfe_address": "12 Oak St",
            "visit_date": "2026-03-07",
            "completed_at": null,
            "raw": {"flags": []},
            "total_score": 1.5
        })
    }

    async fn create_visit(app: &Router) -> Value {
        let response = app
            .clone()
            .oneshot(authed(
                Request::post("/api/visits")
                    .header("content-type", "application/json")
                    .body(Body::from(draft_body().to_string()))
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    async fn create_claim(app: &Router, visit_ids: &[&str]) -> Value {
        let body = json!({
            "rcfe_id": "rcfe-1",
            "claim_day": "2026-03-07",
            "visit_ids": visit_ids,
        });
        let response = app
            .clone()
            .oneshot(authed(
                Request::post("/api/claims")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn health_needs_no_identity() {
        let response = router()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_identity_is_401() {
        let response = router()
            .oneshot(
                Request::post("/api/visits")
                    .header("content-type", "application/json")
                    .body(Body::from(draft_body().to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn visit_claim_submit_flow() {
        let app = router();
        let visit = create_visit(&app).await;
        let visit_id = visit["id"].as_str().unwrap().to_string();

        let claim = create_claim(&app, &[&visit_id]).await;
        assert_eq!(claim["visit_count"], 1);
        assert_eq!(claim["total_amount"], 65);
        assert_eq!(claim["status"], "draft");

        let claim_id = claim["id"].as_str().unwrap();
        let response = app
            .clone()
            .oneshot(authed(
                Request::post(format!("/api/claims/{claim_id}/submit"))
                    .body(Body::empty())
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let submitted = body_json(response).await;
        assert_eq!(submitted["status"], "submitted");

        // Resubmission conflicts.
        let response = app
            .clone()
            .oneshot(authed(
                Request::post(format!("/api/claims/{claim_id}/submit"))
                    .body(Body::empty())
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Frozen visit rejects edits with 409.
        let response = app
            .clone()
            .oneshot(authed(
                Request::patch(format!("/api/visits/{visit_id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"member_name": "X"}).to_string()))
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn draft_candidates_listing() {
        let app = router();
        let visit = create_visit(&app).await;

        let response = app
            .clone()
            .oneshot(authed(
                Request::get("/api/visits/draft-candidates?rcfe_id=rcfe-1&day=2026-03-07")
                    .body(Body::empty())
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["visits"].as_array().unwrap().len(), 1);
        assert_eq!(body["visits"][0]["id"], visit["id"]);
        assert_eq!(body["rcfe_name"], "Sunrise Home");
    }

    #[tokio::test]
    async fn sign_off_candidates_listing() {
        let app = router();
        let visit = create_visit(&app).await;

        let response = app
            .clone()
            .oneshot(authed(
                Request::get("/api/visits/sign-off-candidates?rcfe_id=rcfe-1&day=2026-03-07")
                    .body(Body::empty())
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["visits"][0]["id"], visit["id"]);
    }

    #[tokio::test]
    async fn delete_draft_claim_releases_visits() {
        let app = router();
        let visit = create_visit(&app).await;
        let visit_id = visit["id"].as_str().unwrap().to_string();
        let claim = create_claim(&app, &[&visit_id]).await;
        let claim_id = claim["id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(authed(
                Request::delete(format!("/api/claims/{claim_id}"))
                    .body(Body::empty())
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(authed(
                Request::get(format!("/api/claims/{claim_id}"))
                    .body(Body::empty())
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sign_off_and_lookup() {
        let app = router();
        let visit = create_visit(&app).await;
        let visit_id = visit["id"].as_str().unwrap().to_string();
        let claim = create_claim(&app, &[&visit_id]).await;
        let claim_id = claim["id"].as_str().unwrap().to_string();

        app.clone()
            .oneshot(authed(
                Request::post(format!("/api/claims/{claim_id}/submit"))
                    .body(Body::empty())
                    .unwrap(),
            ))
            .await
            .unwrap();

        let body = json!({
            "rcfe_id": "rcfe-1",
            "visit_ids": [visit_id],
            "attestation": {
                "rcfe_staff_name": "J. Nguyen",
                "rcfe_staff_title": "Administrator",
                "signature_blob": "data:image/png;base64,AAAA",
                "signed_at": null,
                "geolocation": {"lat": 34.05, "lng": -118.24}
            }
        });
        let response = app
            .clone()
            .oneshot(authed(
                Request::post("/api/sign-offs")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary = body_json(response).await;
        assert_eq!(summary["signed"].as_array().unwrap().len(), 1);
        assert_eq!(summary["location_verified"], true);

        let response = app
            .clone()
            .oneshot(authed(
                Request::get(format!("/api/claims/{claim_id}"))
                    .body(Body::empty())
                    .unwrap(),
            ))
            .await
            .unwrap();
        let detail = body_json(response).await;
        assert_eq!(detail["signoffs"].as_array().unwrap().len(), 1);
        assert_eq!(detail["events"][0]["payload"]["event"], "signed_off");
    }

    #[tokio::test]
    async fn monthly_export_totals() {
        let app = router();
        let visit = create_visit(&app).await;
        let visit_id = visit["id"].as_str().unwrap().to_string();
        let claim = create_claim(&app, &[&visit_id]).await;
        let claim_id = claim["id"].as_str().unwrap();

        app.clone()
            .oneshot(authed(
                Request::post(format!("/api/claims/{claim_id}/submit"))
                    .body(Body::empty())
                    .unwrap(),
            ))
            .await
            .unwrap();

        let month = chrono::Utc::now().format("%Y-%m").to_string();
        let response = app
            .clone()
            .oneshot(authed(
                Request::get(format!("/api/export/monthly?month={month}"))
                    .body(Body::empty())
                    .unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let export = body_json(response).await;
        assert_eq!(export["total_visits"], 1);
        assert_eq!(export["total_amount"], 65);
    }
}
