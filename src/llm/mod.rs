//! LLM 모듈 - Gemini API를 통한 텍스트 생성
//!
//! 프롬프트를 받아 생성된 텍스트를 반환하는 언어 모델 프로바이더입니다.
//! API 키는 시작 시 환경변수에서 읽지만, 키가 없어도 생성자는 성공하고
//! 실제 generate 호출에서 Service 에러로 실패합니다.
//! 네트워크 호출은 재시도 없이 한 번만 수행되며 실패는 즉시 전파됩니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RagError;

// ============================================================================
// LanguageModelProvider Trait
// ============================================================================

/// 언어 모델 프로바이더 트레이트
#[async_trait]
pub trait LanguageModelProvider: Send + Sync {
    /// 프롬프트로부터 텍스트 생성
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// 우선순위:
/// 1. `GEMINI_API_KEY` 환경변수
/// 2. `GOOGLE_API_KEY` 환경변수
pub fn get_api_key() -> Option<String> {
    for var in ["GEMINI_API_KEY", "GOOGLE_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                tracing::debug!("Using API key from {}", var);
                return Some(key);
            }
        }
    }
    None
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    get_api_key().is_some()
}

// ============================================================================
// Google Gemini LLM
// ============================================================================

/// Gemini 생성 API 엔드포인트
/// source: https://ai.google.dev/gemini-api/docs
const GEMINI_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

/// Google Gemini 텍스트 생성 구현체
pub struct GeminiLlm {
    api_key: Option<String>,
    client: reqwest::Client,
    temperature: f32,
}

impl GeminiLlm {
    /// 새 Gemini LLM 인스턴스 생성
    ///
    /// temperature는 호출자가 이미 [0, 1] 범위로 검증했다고 가정합니다
    /// (RunConfig::validate). 여기서 재검증하지 않습니다.
    pub fn new(api_key: Option<String>, temperature: f32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            client,
            temperature,
        })
    }

    /// 환경변수에서 API 키를 읽어 생성
    pub fn from_env(temperature: f32) -> Result<Self> {
        Self::new(get_api_key(), temperature)
    }

    /// 설정된 temperature 반환
    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

/// Gemini generateContent 요청 본문
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Gemini generateContent 응답
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini API 에러 응답
#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

#[async_trait]
impl LanguageModelProvider for GeminiLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        // 키 부재는 호출 시점에 Service 에러로 표면화
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            RagError::Service(
                "API key not set; export GEMINI_API_KEY or GOOGLE_API_KEY".to_string(),
            )
        })?;

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        // API 키는 URL이 아닌 헤더로 전송
        let response = self
            .client
            .post(GEMINI_GENERATE_URL)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Service(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RagError::Service(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<GeminiError>(&body) {
                return Err(RagError::Service(format!(
                    "Gemini API error ({}): {}",
                    error.error.status, error.error.message
                ))
                .into());
            }
            return Err(RagError::Service(format!("Gemini API error ({}): {}", status, body)).into());
        }

        let generate_response: GenerateResponse =
            serde_json::from_str(&body).context("Failed to parse generation response")?;

        let candidate = generate_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Service("no candidates in response".to_string()))?;

        let text = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini-pro"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.7 },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"generationConfig\""));
        assert!(json.contains("\"temperature\":0.7"));
        assert!(json.contains("\"text\":\"hello\""));
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "The sky is "}, {"text": "blue."}]}}
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.candidates[0].content.parts.len(), 2);
    }

    #[test]
    fn test_error_response_parsing() {
        let body = r#"{"error": {"message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        let error: GeminiError = serde_json::from_str(body).unwrap();
        assert_eq!(error.error.status, "INVALID_ARGUMENT");
        assert!(error.error.message.contains("API key"));
    }

    #[tokio::test]
    async fn test_generate_without_key_is_service_error() {
        let llm = GeminiLlm::new(None, 0.0).unwrap();
        let err = llm.generate("any prompt").await.expect_err("expected error");

        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::Service(_))
        ));
    }

    #[test]
    fn test_temperature_stored_as_given() {
        let llm = GeminiLlm::new(Some("fake-key".to_string()), 0.3).unwrap();
        assert!((llm.temperature() - 0.3).abs() < f32::EPSILON);
    }
}
