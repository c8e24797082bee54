//! 에러 타입 정의
//!
//! 파이프라인 전역에서 사용하는 에러 종류입니다.
//! 함수 시그니처는 anyhow::Result를 사용하고, 종류 판별이 필요한 곳에서는
//! `err.downcast_ref::<RagError>()`로 꺼내 씁니다.

use thiserror::Error;

/// 파이프라인 에러 종류
#[derive(Debug, Error)]
pub enum RagError {
    /// 잘못된 설정 값 (인덱싱 모드, 청크 크기, temperature 등)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// 폴더/파일/노드를 찾을 수 없음
    #[error("not found: {0}")]
    NotFound(String),

    /// 노드 ID 충돌
    #[error("duplicate node id: {0}")]
    DuplicateId(String),

    /// 임베딩 모델 아티팩트 다운로드 실패 (캐시도 없음)
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// 빈 노드 집합으로 인덱스 생성 시도
    #[error("cannot build an index over an empty node set")]
    EmptyIndex,

    /// 빈 쿼리 (공백만 있는 경우 포함)
    #[error("query must not be empty")]
    EmptyQuery,

    /// LLM API 호출 실패 (네트워크/인증)
    #[error("language model service error: {0}")]
    Service(String),
}

// ============================================================================
// Tests
// ============================================================================
