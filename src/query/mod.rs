//! Query Engine - 검색 + 답변 합성
//!
//! 구축된 인덱스에서 쿼리 관련 노드를 찾고, 그 텍스트를 컨텍스트로
//! 묶은 QA 프롬프트를 LLM에 보내 최종 답변을 만듭니다.
//! 검색 결과가 비어도 치명적이지 않습니다 - 빈 컨텍스트로 합성을
//! 진행하고, 관련 정보가 없다는 답변은 모델의 몫입니다.

use anyhow::Result;

use crate::embedding::EmbeddingProvider;
use crate::error::RagError;
use crate::index::{DocumentStore, Index};
use crate::llm::LanguageModelProvider;

// ============================================================================
// Types
// ============================================================================

/// 합성된 답변
#[derive(Debug, Clone)]
pub struct Response {
    /// LLM이 생성한 답변 텍스트 (그대로 반환)
    pub answer: String,
    /// 컨텍스트로 사용된 노드 ID 목록
    pub source_node_ids: Vec<String>,
}

// ============================================================================
// Prompt
// ============================================================================

/// QA 프롬프트 생성
///
/// 검색된 노드 텍스트와 쿼리를 하나의 프롬프트로 묶습니다.
pub fn build_qa_prompt(context_texts: &[&str], query: &str) -> String {
    let context = context_texts.join("\n\n");

    format!(
        "Context information is below.\n\
         ---------------------\n\
         {}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the query.\n\
         If the context is empty or does not contain the answer, say that you do not \
         have relevant information.\n\
         Query: {}\n\
         Answer:",
        context, query
    )
}

// ============================================================================
// QueryEngine
// ============================================================================

/// 쿼리 엔진
///
/// 구축된 인덱스, 노드 저장소, 프로바이더들을 묶어 하나의 질의를
/// 처리합니다. 모든 구성 요소는 호출자가 소유합니다.
pub struct QueryEngine<'a> {
    index: &'a Index,
    store: &'a DocumentStore,
    llm: &'a dyn LanguageModelProvider,
    embedder: Option<&'a dyn EmbeddingProvider>,
    similarity_top_k: usize,
}

impl<'a> QueryEngine<'a> {
    /// 새 쿼리 엔진 생성
    pub fn new(
        index: &'a Index,
        store: &'a DocumentStore,
        llm: &'a dyn LanguageModelProvider,
        embedder: Option<&'a dyn EmbeddingProvider>,
        similarity_top_k: usize,
    ) -> Self {
        Self {
            index,
            store,
            llm,
            embedder,
            similarity_top_k,
        }
    }

    /// 쿼리에 대한 답변 생성
    ///
    /// 1. 모드별 검색으로 컨텍스트 노드 선정
    /// 2. QA 프롬프트 합성 후 LLM 호출
    pub async fn answer(&self, query: &str) -> Result<Response> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery.into());
        }

        let node_ids = self
            .index
            .retrieve(query, self.similarity_top_k, self.embedder)
            .await?;

        if node_ids.is_empty() {
            tracing::warn!("Retrieval returned no context nodes for query");
        }

        let mut context_texts = Vec::with_capacity(node_ids.len());
        for id in &node_ids {
            context_texts.push(self.store.get(id)?.text.as_str());
        }

        let prompt = build_qa_prompt(&context_texts, query);
        tracing::debug!(
            "Synthesizing answer with {} ({} context nodes)",
            self.llm.name(),
            node_ids.len()
        );

        let answer = self.llm.generate(&prompt).await?;

        Ok(Response {
            answer,
            source_node_ids: node_ids,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexMode, Node};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 받은 프롬프트를 기록하고 고정 답변을 돌려주는 테스트용 LLM
    struct EchoLlm {
        prompts: Mutex<Vec<String>>,
    }

    impl EchoLlm {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LanguageModelProvider for EchoLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("synthesized answer".to_string())
        }

        fn name(&self) -> &str {
            "echo-llm"
        }
    }

    fn store_with(texts: &[&str]) -> DocumentStore {
        let mut store = DocumentStore::new();
        let nodes = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Node {
                id: format!("doc.txt#{}", i),
                doc_id: "doc.txt".to_string(),
                seq: i,
                text: text.to_string(),
                embedding: None,
            })
            .collect();
        store.add(nodes).unwrap();
        store
    }

    #[test]
    fn test_prompt_contains_context_and_query() {
        let prompt = build_qa_prompt(
            &["The sky is blue.", "Grass is green."],
            "What color is the sky?",
        );

        assert!(prompt.contains("The sky is blue."));
        assert!(prompt.contains("Grass is green."));
        assert!(prompt.contains("Query: What color is the sky?"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_prompt_with_empty_context() {
        let prompt = build_qa_prompt(&[], "anything?");
        assert!(prompt.contains("Query: anything?"));
        assert!(prompt.contains("Context information is below."));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let store = store_with(&["some text"]);
        let index = Index::build(IndexMode::Summary, &store, None).await.unwrap();
        let llm = EchoLlm::new();
        let engine = QueryEngine::new(&index, &store, &llm, None, 2);

        for query in ["", "   ", "\n\t"] {
            let err = engine.answer(query).await.expect_err("expected error");
            assert!(matches!(
                err.downcast_ref::<RagError>(),
                Some(RagError::EmptyQuery)
            ));
        }
    }

    #[tokio::test]
    async fn test_summary_mode_prompt_includes_full_document() {
        let store = store_with(&["The sky is blue. Grass is green."]);
        let index = Index::build(IndexMode::Summary, &store, None).await.unwrap();
        let llm = EchoLlm::new();
        let engine = QueryEngine::new(&index, &store, &llm, None, 2);

        let response = engine.answer("What color is the sky?").await.unwrap();

        assert_eq!(response.answer, "synthesized answer");
        assert_eq!(response.source_node_ids, vec!["doc.txt#0"]);
        assert!(llm.last_prompt().contains("The sky is blue. Grass is green."));
    }

    #[tokio::test]
    async fn test_empty_retrieval_still_synthesizes() {
        let store = store_with(&["the sky is blue"]);
        let index = Index::build(IndexMode::Keyword, &store, None).await.unwrap();
        let llm = EchoLlm::new();
        let engine = QueryEngine::new(&index, &store, &llm, None, 2);

        // 일치하는 키워드 없음 -> 빈 컨텍스트로 합성 진행
        let response = engine.answer("quantum entanglement").await.unwrap();

        assert_eq!(response.answer, "synthesized answer");
        assert!(response.source_node_ids.is_empty());
        assert!(llm.last_prompt().contains("Query: quantum entanglement"));
    }

    #[tokio::test]
    async fn test_keyword_mode_retrieves_matching_node() {
        let store = store_with(&["the sky is blue", "rust compiles fast"]);
        let index = Index::build(IndexMode::Keyword, &store, None).await.unwrap();
        let llm = EchoLlm::new();
        let engine = QueryEngine::new(&index, &store, &llm, None, 2);

        let response = engine.answer("how fast does rust compile?").await.unwrap();

        assert_eq!(response.source_node_ids, vec!["doc.txt#1"]);
        assert!(llm.last_prompt().contains("rust compiles fast"));
        assert!(!llm.last_prompt().contains("the sky is blue"));
    }
}
