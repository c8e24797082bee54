//! Document Store - 인메모리 노드 저장소
//!
//! 청킹된 노드를 노드 ID로 조회하는 저장소입니다.
//! 삽입 순서가 보존되며 (summary 모드에 필요), 한 실행 안에서
//! 로드 시점에만 늘어나고 이후에는 수정되지 않습니다.

use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;

use crate::error::RagError;

// ============================================================================
// Types
// ============================================================================

/// 인덱싱/검색의 기본 단위
///
/// 정확히 하나의 문서에서 파생된 연속 텍스트 구간입니다.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    /// 노드 ID ("{doc_id}#{seq}")
    pub id: String,
    /// 원본 문서 ID (소유가 아닌 참조)
    pub doc_id: String,
    /// 문서 내 순서 (0-based, 단조 증가)
    pub seq: usize,
    /// 청크 텍스트
    pub text: String,
    /// 임베딩 벡터 (vector 모드에서만 채워짐)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// 저장소 통계
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub node_count: usize,
    pub document_count: usize,
    pub total_text_bytes: usize,
}

// ============================================================================
// DocumentStore
// ============================================================================

/// 인메모리 노드 저장소
///
/// 노드 ID -> 노드 매핑이며, `iter()`는 삽입 순서를 따릅니다.
#[derive(Debug, Default)]
pub struct DocumentStore {
    nodes: HashMap<String, Node>,
    order: Vec<String>,
}

impl DocumentStore {
    /// 빈 저장소 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 노드 일괄 추가
    ///
    /// ID 충돌이 있으면 DuplicateId 에러를 반환하며, 이 경우 어떤 노드도
    /// 추가되지 않습니다 (부분 삽입 없음).
    pub fn add(&mut self, nodes: Vec<Node>) -> Result<usize> {
        // 기존 노드 및 배치 내부 충돌 검사
        let mut incoming: Vec<&str> = Vec::with_capacity(nodes.len());
        for node in &nodes {
            if self.nodes.contains_key(&node.id) || incoming.contains(&node.id.as_str()) {
                return Err(RagError::DuplicateId(node.id.clone()).into());
            }
            incoming.push(&node.id);
        }

        let count = nodes.len();
        for node in nodes {
            self.order.push(node.id.clone());
            self.nodes.insert(node.id.clone(), node);
        }

        tracing::debug!("Stored {} nodes (total {})", count, self.nodes.len());
        Ok(count)
    }

    /// ID로 노드 조회
    pub fn get(&self, id: &str) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| RagError::NotFound(format!("node not found: {}", id)).into())
    }

    /// 삽입 순서대로 노드 순회
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// 노드 개수
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 저장소가 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 저장소 통계
    pub fn stats(&self) -> StoreStats {
        let mut doc_ids: Vec<&str> = self.nodes.values().map(|n| n.doc_id.as_str()).collect();
        doc_ids.sort_unstable();
        doc_ids.dedup();

        StoreStats {
            node_count: self.nodes.len(),
            document_count: doc_ids.len(),
            total_text_bytes: self.nodes.values().map(|n| n.text.len()).sum(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
