#[cfg(test)]
pub mod tests {
    use actix_web::{test, web, App};
    use serde_json::{json, Value};
    use std::time::Duration;

    use crate::apis::jobs_api::run::{configure, parse_job};
    use crate::cores::schemas::ResponsePayload;
    use crate::test::fakes::tests::{builder, count, harness, FakeDevice};
    use crate::utils::log::format_job_line;

    #[actix_rt::test]
    async fn test_health() {
        let data = web::Data::new(harness().worker);
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body = test::read_body(resp).await;
        assert_eq!(body, "OK");
    }

    #[actix_rt::test]
    async fn test_run_success() {
        let data = web::Data::new(harness().worker);
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/run")
            .set_json(json!({"id": "job-42", "input": {"prompt": "A professional headshot", "user_id": "user1"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["image_url"].as_str().unwrap().contains("/user1/generated/"));
        assert!(body["processing_time"].is_number());
        assert!(body.get("error").is_none());
    }

    #[actix_rt::test]
    async fn test_run_error_payloads() {
        let data = web::Data::new(harness().worker);
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let cases = vec![
            (json!({"input": {"invalid": "data"}}).to_string(), "missing_field"),
            (json!({}).to_string(), "missing_field"),
            (json!({"input": null}).to_string(), "missing_field"),
            ("".to_string(), "missing_field"),
            ("{not json".to_string(), "invalid_type"),
            ("[1,2,3]".to_string(), "invalid_type"),
        ];
        for (body, expected) in cases {
            let req = test::TestRequest::post()
                .uri("/run")
                .insert_header(("Content-Type", "application/json"))
                .set_payload(body.clone())
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status().as_u16(), 400, "body {}", body);
            let payload: ResponsePayload = test::read_body_json(resp).await;
            assert_eq!(payload.error_type(), Some(expected), "body {}", body);
        }
    }

    #[actix_rt::test]
    async fn test_ready_reports_initialization_failure() {
        let mut b = builder();
        b.device = FakeDevice::missing();
        let h = b.build();
        let data = web::Data::new(h.worker);
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/ready").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 503);

        assert!(data.initialize().await.is_err());
        let req = test::TestRequest::get().uri("/ready").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 503);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["ready"], json!(false));
        assert!(body["error"].as_str().unwrap().contains("No accelerator available"));

        let req = test::TestRequest::post()
            .uri("/run")
            .set_json(json!({"input": {"prompt": "A professional headshot", "user_id": "user1"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 503);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error_type"], json!("initialization_error"));
    }

    #[actix_rt::test]
    async fn test_job_outlives_dropped_request() {
        let mut b = builder();
        b.delay = Duration::from_millis(200);
        let h = b.build();
        let (pipeline, device) = (h.pipeline.clone(), h.device.clone());
        let data = web::Data::new(h.worker);
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;
        let job = json!({"input": {"prompt": "A professional headshot", "user_id": "user1"}});

        // the client goes away while the model is still generating
        let req = test::TestRequest::post().uri("/run").set_json(&job).to_request();
        let dropped = tokio::time::timeout(Duration::from_millis(50), test::call_service(&app, req)).await;
        assert!(dropped.is_err());

        // the job still finishes and releases the accelerator
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(count(&device.releases), 1);

        let req = test::TestRequest::post().uri("/run").set_json(&job).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(count(&device.releases), 2);
        assert_eq!(count(&pipeline.calls), 2);
        assert_eq!(count(&pipeline.max_active), 1);
    }

    #[actix_rt::test]
    async fn test_back_to_back_requests_after_disconnect_do_not_overlap() {
        let mut b = builder();
        b.delay = Duration::from_millis(150);
        let h = b.build();
        let (pipeline, device) = (h.pipeline.clone(), h.device.clone());
        let data = web::Data::new(h.worker);
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;
        let job = json!({"input": {"prompt": "A professional headshot", "user_id": "user1"}});

        let req = test::TestRequest::post().uri("/run").set_json(&job).to_request();
        let dropped = tokio::time::timeout(Duration::from_millis(30), test::call_service(&app, req)).await;
        assert!(dropped.is_err());

        // sent right away; must wait for the first generation
        let req = test::TestRequest::post().uri("/run").set_json(&job).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(count(&pipeline.max_active), 1);
        assert_eq!(count(&device.releases), 2);
    }

    #[actix_rt::test]
    async fn test_parse_job_envelope() {
        let job = parse_job(br#"{"id": "abc", "input": {"prompt": "x"}}"#).unwrap();
        assert_eq!(job.id.as_deref(), Some("abc"));
        assert_eq!(job.input["prompt"], json!("x"));

        let job = parse_job(b"{}").unwrap();
        assert!(job.id.is_none());
        assert!(job.input.is_null());
    }

    #[actix_rt::test]
    async fn test_job_log_line() {
        let payload = ResponsePayload::Error { error: "boom".to_string(), error_type: "model_error".to_string() };
        let line = format_job_line("job-1", "user1", &payload, std::time::Duration::from_millis(1500));
        assert!(line.ends_with("job=job-1 user=user1 outcome=model_error elapsed=1.500s"));
    }
}
