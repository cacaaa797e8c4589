use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

pub const MAX_PROMPT_LENGTH: usize = 1000;
pub const MIN_PROMPT_LENGTH: usize = 3;
pub const ALLOWED_USER_ID_PATTERN: &str = r"^[A-Za-z0-9_-]{1,64}$";

pub const DEFAULT_INFERENCE_STEPS: u32 = 25;
pub const DEFAULT_GUIDANCE_SCALE: f64 = 7.5;
pub const DEFAULT_IMAGE_SIZE: u32 = 1024;

const STEPS_RANGE: (u32, u32) = (1, 100);
const GUIDANCE_RANGE: (f64, f64) = (0.0, 20.0);
const SIZE_RANGE: (u32, u32) = (256, 1536);

// Stripped from prompts: template delimiters, markup and path escapes.
const UNSAFE_PROMPT_CHARS: [char; 6] = ['<', '>', '{', '}', '`', '\\'];

static USER_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(ALLOWED_USER_ID_PATTERN).expect("user id pattern is a valid regex")
});
static PATH_SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]{1,128}$").expect("path segment pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    MissingField,
    InvalidType,
    PromptTooShort,
    PromptTooLong,
    UserIdInvalidFormat,
    InvalidParameter,
}

impl ValidationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationKind::MissingField => "missing_field",
            ValidationKind::InvalidType => "invalid_type",
            ValidationKind::PromptTooShort => "prompt_too_short",
            ValidationKind::PromptTooLong => "prompt_too_long",
            ValidationKind::UserIdInvalidFormat => "user_id_invalid_format",
            ValidationKind::InvalidParameter => "invalid_parameter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ValidationKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ValidationKind, message: impl Into<String>) -> Self {
        ValidationError { kind, message: message.into() }
    }
}

/// A job input that passed every check. Only [`validate_request`] builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    user_id: String,
    num_inference_steps: u32,
    guidance_scale: f64,
    width: u32,
    height: u32,
    seed: Option<u64>,
}

impl GenerationRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn num_inference_steps(&self) -> u32 {
        self.num_inference_steps
    }

    pub fn guidance_scale(&self) -> f64 {
        self.guidance_scale
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

/// Validate an untyped job input into a [`GenerationRequest`].
///
/// Checks run in a fixed order and stop at the first failure: input shape,
/// prompt, user id, then the optional generation parameters.
pub fn validate_request(input: &Value) -> Result<GenerationRequest, ValidationError> {
    // 1. The input itself
    let fields = match input {
        Value::Object(fields) => fields,
        Value::Null => {
            return Err(ValidationError::new(
                ValidationKind::MissingField,
                "Invalid request: input is required and must contain prompt and user_id",
            ))
        }
        _ => {
            return Err(ValidationError::new(
                ValidationKind::InvalidType,
                "Invalid request: input must be a JSON object",
            ))
        }
    };

    // 2. Prompt
    let raw_prompt = match non_null(fields, "prompt") {
        None => {
            return Err(ValidationError::new(
                ValidationKind::MissingField,
                "Invalid request: prompt is a required field",
            ))
        }
        Some(Value::String(prompt)) => prompt,
        Some(_) => {
            return Err(ValidationError::new(
                ValidationKind::InvalidType,
                "Invalid request: prompt must be a string",
            ))
        }
    };
    let prompt = sanitize_prompt(raw_prompt)?;

    // 3. User id
    let raw_user_id = non_null(fields, "user_id").ok_or_else(|| {
        ValidationError::new(ValidationKind::MissingField, "Invalid request: user_id is a required field")
    })?;
    let user_id = sanitize_user_id(raw_user_id)?;

    // 4. Optional generation parameters
    let num_inference_steps = match non_null(fields, "num_inference_steps") {
        None => DEFAULT_INFERENCE_STEPS,
        Some(value) => clamp_u32(integer_param(value, "num_inference_steps")?, STEPS_RANGE),
    };
    let guidance_scale = match non_null(fields, "guidance_scale") {
        None => DEFAULT_GUIDANCE_SCALE,
        Some(value) => float_param(value, "guidance_scale")?.clamp(GUIDANCE_RANGE.0, GUIDANCE_RANGE.1),
    };
    let width = match non_null(fields, "width") {
        None => DEFAULT_IMAGE_SIZE,
        Some(value) => image_size(integer_param(value, "width")?),
    };
    let height = match non_null(fields, "height") {
        None => DEFAULT_IMAGE_SIZE,
        Some(value) => image_size(integer_param(value, "height")?),
    };
    let seed = match non_null(fields, "seed") {
        None => None,
        Some(value) => Some(value.as_u64().ok_or_else(|| {
            ValidationError::new(ValidationKind::InvalidParameter, "Invalid request: seed must be a non-negative integer")
        })?),
    };

    Ok(GenerationRequest {
        prompt,
        user_id,
        num_inference_steps,
        guidance_scale,
        width,
        height,
        seed,
    })
}

/// Normalize a prompt: control characters become spaces, unsafe characters
/// are dropped and whitespace runs collapse to a single space.
pub fn sanitize_prompt(prompt: &str) -> Result<String, ValidationError> {
    let length = prompt.chars().count();
    if length > MAX_PROMPT_LENGTH {
        return Err(ValidationError::new(
            ValidationKind::PromptTooLong,
            format!("Prompt is too long: {} characters (maximum {})", length, MAX_PROMPT_LENGTH),
        ));
    }

    let cleaned: String = prompt
        .chars()
        .filter(|c| !UNSAFE_PROMPT_CHARS.contains(c))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let sanitized = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if sanitized.chars().count() < MIN_PROMPT_LENGTH {
        return Err(ValidationError::new(
            ValidationKind::PromptTooShort,
            format!("Prompt is too short: at least {} visible characters are required", MIN_PROMPT_LENGTH),
        ));
    }
    Ok(sanitized)
}

pub fn sanitize_user_id(user_id: &Value) -> Result<String, ValidationError> {
    let user_id = user_id.as_str().map(str::trim).unwrap_or_default();
    if !USER_ID_RE.is_match(user_id) {
        return Err(ValidationError::new(
            ValidationKind::UserIdInvalidFormat,
            "Invalid user_id: only letters, digits, '_' and '-' are allowed (1-64 characters)",
        ));
    }
    Ok(user_id.to_string())
}

/// Accept a single storage path segment. Separators, `..` and anything
/// outside `[A-Za-z0-9._-]` are refused so paths cannot leave their namespace.
pub fn sanitize_file_path(segment: &str) -> Option<&str> {
    if segment == "." || segment.contains("..") || !PATH_SEGMENT_RE.is_match(segment) {
        return None;
    }
    Some(segment)
}

fn non_null<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|value| !value.is_null())
}

fn integer_param(value: &Value, name: &str) -> Result<i64, ValidationError> {
    value
        .as_i64()
        .or_else(|| value.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
        .ok_or_else(|| {
            ValidationError::new(ValidationKind::InvalidParameter, format!("Invalid request: {} must be an integer", name))
        })
}

fn float_param(value: &Value, name: &str) -> Result<f64, ValidationError> {
    value.as_f64().filter(|v| v.is_finite()).ok_or_else(|| {
        ValidationError::new(ValidationKind::InvalidParameter, format!("Invalid request: {} must be a number", name))
    })
}

fn clamp_u32(value: i64, (min, max): (u32, u32)) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}

fn image_size(value: i64) -> u32 {
    let size = clamp_u32(value, SIZE_RANGE);
    size - size % 8
}
