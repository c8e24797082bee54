//! Index 모듈 - 세 가지 인덱스 구조
//!
//! 고정된 노드 집합 위에 summary / vector / keyword 인덱스를 구축합니다.
//! 각 인덱스는 한 번 구축되면 읽기 전용이며, 모드별 검색은 `Index` 열거형의
//! 단일 인터페이스 (`build` / `retrieve`)로 통일되어 있습니다.

mod chunker;
mod keyword;
mod store;
mod vector;

use anyhow::Result;
use clap::ValueEnum;

use crate::embedding::EmbeddingProvider;
use crate::error::RagError;

// Re-exports
pub use chunker::{nodes_from_documents, Chunker, SentenceSplitter};
pub use keyword::{extract_keywords, KeywordIndex, MAX_KEYWORDS_PER_NODE};
pub use store::{DocumentStore, Node, StoreStats};
pub use vector::{cosine_similarity, ScoredNode, VectorEntry, VectorIndex};

// ============================================================================
// IndexMode
// ============================================================================

/// 인덱싱 모드 (닫힌 집합)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexMode {
    /// 전체 노드를 순서대로 유지 (필터링 없음)
    Summary,
    /// 임베딩 기반 최근접 이웃 검색
    Vector,
    /// 키워드 역색인 검색
    Keyword,
}

impl std::fmt::Display for IndexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IndexMode::Summary => "summary",
            IndexMode::Vector => "vector",
            IndexMode::Keyword => "keyword",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// SummaryIndex
// ============================================================================

/// Summary 인덱스
///
/// 전체 노드 ID를 삽입 순서대로 보관합니다. 검색 시 필터링이 없습니다.
#[derive(Debug)]
pub struct SummaryIndex {
    node_ids: Vec<String>,
}

impl SummaryIndex {
    /// 저장소의 전체 노드로 구축
    pub fn build(store: &DocumentStore) -> Self {
        Self {
            node_ids: store.iter().map(|n| n.id.clone()).collect(),
        }
    }

    /// 전체 노드 ID (삽입 순서)
    pub fn node_ids(&self) -> &[String] {
        &self.node_ids
    }
}

// ============================================================================
// Index
// ============================================================================

/// 구축된 인덱스 (모드별 변형)
#[derive(Debug)]
pub enum Index {
    Summary(SummaryIndex),
    Vector(VectorIndex),
    Keyword(KeywordIndex),
}

impl Index {
    /// 고정된 노드 집합으로 인덱스 구축
    ///
    /// vector 모드에서만 embedder가 필요하며, 노드당 한 번 임베딩을
    /// 호출합니다. 빈 노드 집합이면 EmptyIndex 에러를 반환합니다.
    pub async fn build(
        mode: IndexMode,
        store: &DocumentStore,
        embedder: Option<&dyn EmbeddingProvider>,
    ) -> Result<Self> {
        if store.is_empty() {
            return Err(RagError::EmptyIndex.into());
        }

        let index = match mode {
            IndexMode::Summary => Index::Summary(SummaryIndex::build(store)),
            IndexMode::Vector => {
                let embedder = embedder.ok_or_else(|| {
                    RagError::Config("vector mode requires an embedding provider".to_string())
                })?;
                Index::Vector(VectorIndex::build(store, embedder).await?)
            }
            IndexMode::Keyword => Index::Keyword(KeywordIndex::build(store)),
        };

        tracing::info!("Built {} index over {} nodes", mode, store.len());
        Ok(index)
    }

    /// 쿼리와 관련된 노드 ID 검색
    ///
    /// - summary: 전체 노드 (필터링 없음)
    /// - vector: 쿼리 임베딩과의 코사인 유사도 상위 top_k개
    /// - keyword: 쿼리 키워드와 일치하는 노드의 합집합 (없으면 빈 목록)
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        embedder: Option<&dyn EmbeddingProvider>,
    ) -> Result<Vec<String>> {
        match self {
            Index::Summary(index) => Ok(index.node_ids().to_vec()),
            Index::Vector(index) => {
                let embedder = embedder.ok_or_else(|| {
                    RagError::Config("vector mode requires an embedding provider".to_string())
                })?;
                let query_embedding = embedder.embed(query).await?;
                Ok(index
                    .search(&query_embedding, top_k)
                    .into_iter()
                    .map(|r| r.node_id)
                    .collect())
            }
            Index::Keyword(index) => Ok(index.retrieve(query)),
        }
    }

    /// 인덱스 모드
    pub fn mode(&self) -> IndexMode {
        match self {
            Index::Summary(_) => IndexMode::Summary,
            Index::Vector(_) => IndexMode::Vector,
            Index::Keyword(_) => IndexMode::Keyword,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
