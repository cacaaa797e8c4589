#[cfg(test)]
pub mod tests {
    use serde_json::json;

    use crate::cores::validator::{
        sanitize_file_path, sanitize_prompt, sanitize_user_id, validate_request, ValidationKind,
        DEFAULT_GUIDANCE_SCALE, DEFAULT_IMAGE_SIZE, DEFAULT_INFERENCE_STEPS, MAX_PROMPT_LENGTH,
    };

    fn kind_of(input: serde_json::Value) -> ValidationKind {
        validate_request(&input).unwrap_err().kind
    }

    #[test]
    fn test_valid_request_uses_defaults() {
        let request = validate_request(&json!({
            "prompt": "A professional headshot of a business person",
            "user_id": "test_user_123"
        }))
        .unwrap();
        assert_eq!(request.prompt(), "A professional headshot of a business person");
        assert_eq!(request.user_id(), "test_user_123");
        assert_eq!(request.num_inference_steps(), DEFAULT_INFERENCE_STEPS);
        assert_eq!(request.guidance_scale(), DEFAULT_GUIDANCE_SCALE);
        assert_eq!(request.width(), DEFAULT_IMAGE_SIZE);
        assert_eq!(request.height(), DEFAULT_IMAGE_SIZE);
        assert_eq!(request.seed(), None);
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(kind_of(json!({})), ValidationKind::MissingField);
        assert_eq!(kind_of(json!(null)), ValidationKind::MissingField);
        assert_eq!(kind_of(json!({"user_id": "test_user_123"})), ValidationKind::MissingField);
        assert_eq!(kind_of(json!({"prompt": "A professional headshot"})), ValidationKind::MissingField);
        assert_eq!(kind_of(json!({"prompt": null, "user_id": null})), ValidationKind::MissingField);
        assert_eq!(kind_of(json!({"invalid": "data"})), ValidationKind::MissingField);
    }

    #[test]
    fn test_wrong_shapes() {
        assert_eq!(kind_of(json!("a headshot")), ValidationKind::InvalidType);
        assert_eq!(kind_of(json!([1, 2])), ValidationKind::InvalidType);
        assert_eq!(kind_of(json!({"prompt": 42, "user_id": "u1"})), ValidationKind::InvalidType);
    }

    #[test]
    fn test_prompt_length_limits() {
        let at_limit = "A".repeat(MAX_PROMPT_LENGTH);
        assert!(validate_request(&json!({"prompt": at_limit, "user_id": "test_user"})).is_ok());

        let too_long = "A".repeat(MAX_PROMPT_LENGTH + 1);
        let err = validate_request(&json!({"prompt": too_long, "user_id": "test_user"})).unwrap_err();
        assert_eq!(err.kind, ValidationKind::PromptTooLong);
        assert_eq!(err.kind.as_str(), "prompt_too_long");

        assert_eq!(kind_of(json!({"prompt": "   ", "user_id": "u1"})), ValidationKind::PromptTooShort);
        assert_eq!(kind_of(json!({"prompt": "<>{}", "user_id": "u1"})), ValidationKind::PromptTooShort);
    }

    #[test]
    fn test_prompt_checked_before_user_id() {
        let too_long = "A".repeat(MAX_PROMPT_LENGTH + 1);
        assert_eq!(kind_of(json!({"prompt": too_long, "user_id": "user@domain.com"})), ValidationKind::PromptTooLong);
    }

    #[test]
    fn test_sanitize_prompt() {
        assert_eq!(sanitize_prompt("  a\tportrait\n\nof {{user}} <b>smiling</b>  ").unwrap(), "a portrait of user bsmiling/b");
        assert_eq!(sanitize_prompt("office `rm -rf` \\ light").unwrap(), "office rm -rf light");
        assert_eq!(sanitize_prompt("Café headshot, soft light").unwrap(), "Café headshot, soft light");
    }

    #[test]
    fn test_user_id_format() {
        assert_eq!(kind_of(json!({"prompt": "A professional headshot", "user_id": "user@domain.com"})), ValidationKind::UserIdInvalidFormat);
        assert_eq!(kind_of(json!({"prompt": "A professional headshot", "user_id": "../etc"})), ValidationKind::UserIdInvalidFormat);
        assert_eq!(kind_of(json!({"prompt": "A professional headshot", "user_id": ""})), ValidationKind::UserIdInvalidFormat);
        assert_eq!(kind_of(json!({"prompt": "A professional headshot", "user_id": 12345})), ValidationKind::UserIdInvalidFormat);
        assert_eq!(kind_of(json!({"prompt": "A professional headshot", "user_id": "a".repeat(65)})), ValidationKind::UserIdInvalidFormat);

        assert_eq!(sanitize_user_id(&json!("  user-1_A ")).unwrap(), "user-1_A");
    }

    #[test]
    fn test_numeric_parameters_are_clamped() {
        let request = validate_request(&json!({
            "prompt": "A professional headshot",
            "user_id": "u1",
            "num_inference_steps": 5000,
            "guidance_scale": -3.0,
            "width": 100,
            "height": 1001,
            "seed": 42
        }))
        .unwrap();
        assert_eq!(request.num_inference_steps(), 100);
        assert_eq!(request.guidance_scale(), 0.0);
        assert_eq!(request.width(), 256);
        assert_eq!(request.height(), 1000);
        assert_eq!(request.seed(), Some(42));

        let request = validate_request(&json!({
            "prompt": "A professional headshot",
            "user_id": "u1",
            "num_inference_steps": 0,
            "guidance_scale": 3.5
        }))
        .unwrap();
        assert_eq!(request.num_inference_steps(), 1);
        assert_eq!(request.guidance_scale(), 3.5);
    }

    #[test]
    fn test_numeric_parameters_with_wrong_type() {
        let base = |key: &str, value: serde_json::Value| {
            let mut input = json!({"prompt": "A professional headshot", "user_id": "u1"});
            input[key] = value;
            kind_of(input)
        };
        assert_eq!(base("num_inference_steps", json!("25")), ValidationKind::InvalidParameter);
        assert_eq!(base("num_inference_steps", json!(2.5)), ValidationKind::InvalidParameter);
        assert_eq!(base("guidance_scale", json!("high")), ValidationKind::InvalidParameter);
        assert_eq!(base("seed", json!(-1)), ValidationKind::InvalidParameter);
    }

    #[test]
    fn test_sanitize_file_path() {
        assert_eq!(sanitize_file_path("test_user_123"), Some("test_user_123"));
        assert_eq!(sanitize_file_path("20240101120000_deadbeef.png"), Some("20240101120000_deadbeef.png"));
        assert_eq!(sanitize_file_path(".."), None);
        assert_eq!(sanitize_file_path("."), None);
        assert_eq!(sanitize_file_path("a/b"), None);
        assert_eq!(sanitize_file_path("a\\b"), None);
        assert_eq!(sanitize_file_path("x..y"), None);
        assert_eq!(sanitize_file_path(""), None);
    }
}
