//! 실행 설정
//!
//! 파이프라인 전체에 명시적으로 전달되는 설정 구조체입니다.
//! 전역 상태 없이 검증된 설정만 파이프라인에 들어갑니다.

use std::path::PathBuf;

use anyhow::Result;

use crate::error::RagError;
use crate::index::IndexMode;

// ============================================================================
// RunConfig
// ============================================================================

/// 한 번의 실행에 필요한 전체 설정
///
/// `validate()`가 성공한 뒤에만 파이프라인 작업이 시작됩니다 (fail fast).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// 문서 폴더 경로
    pub data_folder: PathBuf,
    /// 인덱싱 모드
    pub indexing_mode: IndexMode,
    /// LLM temperature (0.0 ~ 1.0)
    pub temperature: f32,
    /// 청크 최대 크기 (문자 수)
    pub chunk_size: usize,
    /// 벡터 검색 상위 K
    pub similarity_top_k: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("./data"),
            indexing_mode: IndexMode::Vector,
            temperature: 0.0,
            chunk_size: 1024,
            similarity_top_k: 2,
        }
    }
}

impl RunConfig {
    /// 설정 값 검증
    ///
    /// 파이프라인 작업이 시작되기 전에 호출되어야 합니다.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(RagError::Config(format!(
                "temperature must be between 0 and 1 (got {})",
                self.temperature
            ))
            .into());
        }

        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be positive".to_string()).into());
        }

        if self.similarity_top_k == 0 {
            return Err(RagError::Config("similarity_top_k must be positive".to_string()).into());
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
