//! docquery - 로컬 문서 폴더 기반 RAG 질의응답
//!
//! 폴더의 문서를 로드해 청크 노드로 나누고, summary / vector / keyword
//! 인덱스 중 하나를 구축한 뒤, 검색된 컨텍스트로 Gemini LLM에 질의해
//! 답변을 합성합니다.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod loader;
pub mod query;

// Re-exports
pub use config::RunConfig;
pub use embedding::{EmbeddingProvider, HashEmbedding, LocalEmbedding, EMBEDDING_DIMENSION};
pub use error::RagError;
pub use index::{
    cosine_similarity, extract_keywords, nodes_from_documents, Chunker, DocumentStore, Index,
    IndexMode, KeywordIndex, Node, SentenceSplitter, StoreStats, SummaryIndex, VectorIndex,
};
pub use llm::{get_api_key, has_api_key, GeminiLlm, LanguageModelProvider};
pub use loader::{Document, DocumentLoader, LoaderConfig};
pub use query::{build_qa_prompt, QueryEngine, Response};
