//! Vector Index - 인메모리 코사인 유사도 검색
//!
//! 노드 ID -> 임베딩 벡터 매핑을 전수 비교로 검색합니다.
//! 유사도 내림차순 정렬이며, 동률은 원본 노드 순서로 깨집니다.

use anyhow::Result;

use crate::embedding::EmbeddingProvider;
use crate::index::store::DocumentStore;

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 노드 ID
    pub node_id: String,
    /// 저장소 삽입 순번 (동률 타이브레이크용)
    pub ordinal: usize,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct ScoredNode {
    /// 노드 ID
    pub node_id: String,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub similarity: f32,
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 두 벡터 간의 코사인 유사도를 계산합니다. 길이가 다르거나 영벡터면
/// 0.0을 반환합니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// VectorIndex
// ============================================================================

/// 인메모리 벡터 인덱스
#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<VectorEntry>,
}

impl VectorIndex {
    /// 저장소의 전체 노드를 임베딩하여 인덱스 구축
    ///
    /// 노드당 한 번 임베딩을 호출합니다 (배치).
    pub async fn build(store: &DocumentStore, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        let texts: Vec<String> = store.iter().map(|n| n.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        let entries = store
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(ordinal, (node, embedding))| VectorEntry {
                node_id: node.id.clone(),
                ordinal,
                embedding,
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Built vector index: {} entries (dimension {})",
            entries.len(),
            embedder.dimension()
        );

        Ok(Self { entries })
    }

    /// 미리 계산된 엔트리로 인덱스 생성
    pub fn from_entries(entries: Vec<VectorEntry>) -> Self {
        Self { entries }
    }

    /// 쿼리 임베딩과 가장 유사한 상위 limit개 노드 검색
    ///
    /// 유사도 내림차순, 동률은 저장소 순번 오름차순입니다.
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Vec<ScoredNode> {
        let mut scored: Vec<(usize, f32, &str)> = self
            .entries
            .iter()
            .map(|entry| {
                (
                    entry.ordinal,
                    cosine_similarity(query_embedding, &entry.embedding),
                    entry.node_id.as_str(),
                )
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(_, similarity, node_id)| ScoredNode {
                node_id: node_id.to_string(),
                similarity,
            })
            .collect()
    }

    /// 인덱싱된 벡터 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 인덱스가 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
