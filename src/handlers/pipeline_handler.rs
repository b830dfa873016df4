use std::sync::Arc;

use actix_web::{post, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::request::{
        ExtractEvidenceRequest, GenerateQuizRequest, GradeAnswerRequest, TranslateRequest,
    },
};

#[post("/api/documents/{document_id}/summaries")]
pub async fn summarize_document(
    state: web::Data<Arc<AppState>>,
    document_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let response = state.orchestrator.summarize_document(&document_id).await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/api/documents/{document_id}/quizzes")]
pub async fn generate_quiz(
    state: web::Data<Arc<AppState>>,
    document_id: web::Path<String>,
    request: web::Json<GenerateQuizRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state
        .orchestrator
        .generate_quiz(&document_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/api/attempt-items/{attempt_item_id}/grade")]
pub async fn grade_answer(
    state: web::Data<Arc<AppState>>,
    attempt_item_id: web::Path<String>,
    request: web::Json<GradeAnswerRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state
        .orchestrator
        .grade_answer(&attempt_item_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/api/documents/{document_id}/evidence")]
pub async fn extract_evidence(
    state: web::Data<Arc<AppState>>,
    document_id: web::Path<String>,
    request: web::Json<ExtractEvidenceRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state
        .orchestrator
        .extract_evidence(&document_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/api/documents/{document_id}/translations")]
pub async fn translate_document(
    state: web::Data<Arc<AppState>>,
    document_id: web::Path<String>,
    request: Option<web::Json<TranslateRequest>>,
) -> Result<HttpResponse, AppError> {
    let request = request.map(web::Json::into_inner).unwrap_or_default();
    let response = state
        .orchestrator
        .translate_document(&document_id, request)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    use crate::{
        config::Config,
        errors::AppError,
        repositories::InMemoryStore,
        services::{
            generation_client::MockGenerationClient, pipeline_orchestrator::PipelineOrchestrator,
        },
        test_utils::{fixtures, test_helpers},
    };

    async fn state_with(client: MockGenerationClient, store: &InMemoryStore) -> Arc<AppState> {
        let config = Config::test_config();
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(client),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(config.clone()),
        );
        Arc::new(AppState::from_orchestrator(orchestrator, config))
    }

    #[actix_web::test]
    async fn summaries_route_returns_created_with_labels() {
        let store = InMemoryStore::new();
        store.seed_units(fixtures::content_units("doc-1", 12)).await;
        let mut client = MockGenerationClient::new();
        client
            .expect_generate()
            .returning(|_, _| Ok("- note".to_string()));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(client, &store).await))
                .service(summarize_document),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/documents/doc-1/summaries")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["artifactCount"], 2);
        assert_eq!(body["labels"][1], "10-11");
    }

    #[actix_web::test]
    async fn upstream_failure_renders_error_shape() {
        let store = InMemoryStore::new();
        store.seed_units(fixtures::content_units("doc-1", 1)).await;
        let mut client = MockGenerationClient::new();
        client
            .expect_generate()
            .returning(|_, _| Err(AppError::UpstreamUnavailable("timeout".to_string())));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(client, &store).await))
                .service(summarize_document),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/documents/doc-1/summaries")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error_kind"], "UPSTREAM_UNAVAILABLE");
    }

    #[actix_web::test]
    async fn invalid_quiz_request_is_bad_request() {
        let store = InMemoryStore::new();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(
                    state_with(MockGenerationClient::new(), &store).await,
                ))
                .service(generate_quiz),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/documents/doc-1/quizzes")
            .set_json(serde_json::json!({ "questionCount": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn grade_route_grades_objective_answers() {
        let store = InMemoryStore::new();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(
                    state_with(MockGenerationClient::new(), &store).await,
                ))
                .service(grade_answer),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/attempt-items/item-1/grade")
            .set_json(serde_json::json!({
                "userId": "user-1",
                "quizType": "ox",
                "question": "Attention is linear.",
                "referenceAnswer": "X",
                "candidateAnswer": "O"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        test_helpers::assert_success_status(resp.status());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["result"]["is_correct"], false);
        assert_eq!(body["gradedBy"], "exact_match");
        assert_eq!(body["wrongAnswer"]["mistake_count"], 1);
    }

    #[actix_web::test]
    async fn translations_route_accepts_missing_body() {
        let store = InMemoryStore::new();
        store.seed_units(fixtures::content_units("doc-1", 1)).await;
        let mut client = MockGenerationClient::new();
        client
            .expect_generate()
            .returning(|_, _| Ok("번역된 문단".to_string()));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(client, &store).await))
                .service(translate_document),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/documents/doc-1/translations")
            .to_request();
        let resp = test::call_service(&app, req).await;
        test_helpers::assert_success_status(resp.status());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["processedCount"], 1);
    }

    #[actix_web::test]
    async fn evidence_route_for_unknown_document_reports_missing_units() {
        let store = InMemoryStore::new();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(
                    state_with(MockGenerationClient::new(), &store).await,
                ))
                .service(extract_evidence),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/documents/doc-9/evidence")
            .set_json(serde_json::json!({
                "items": [{
                    "attemptItemId": "item-1",
                    "contentId": "unit-1",
                    "question": "Q?",
                    "correctAnswer": "A"
                }]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        test_helpers::assert_success_status(resp.status());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["degradedCount"], 1);
        assert_eq!(body["results"][0]["success"], false);
    }

    #[actix_web::test]
    async fn malformed_json_body_is_client_error() {
        let store = InMemoryStore::new();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(
                    state_with(MockGenerationClient::new(), &store).await,
                ))
                .service(grade_answer),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/attempt-items/item-1/grade")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        test_helpers::assert_error_status(resp.status());
    }
}
