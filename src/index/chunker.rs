//! Text Chunking Module
//!
//! 문장 경계를 우선하는 텍스트 분할을 제공합니다.
//! 문서를 chunk_size(문자 수) 이하의 노드로 나누며, 단일 문장이
//! chunk_size를 넘으면 문자 경계에서 강제 분할합니다.

use regex::Regex;

use crate::index::store::Node;
use crate::loader::Document;

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// SentenceSplitter
// ============================================================================

/// 문장 인식 청커
///
/// 문장 종결 부호(. ! ?) 뒤의 공백을 경계로 문장을 나눈 뒤,
/// 연속된 문장을 chunk_size 이하로 탐욕적으로 묶습니다.
pub struct SentenceSplitter {
    chunk_size: usize,
    boundary_re: Regex,
}

impl SentenceSplitter {
    /// 청크 크기(문자 수)를 지정하여 생성
    ///
    /// chunk_size는 양수여야 합니다 (RunConfig::validate에서 보장).
    pub fn new(chunk_size: usize) -> Self {
        // 종결 부호 + 닫는 따옴표/괄호 + 공백
        let boundary_re = Regex::new(r#"[.!?]["')\]]*\s+"#).expect("valid sentence regex");
        Self {
            chunk_size,
            boundary_re,
        }
    }

    /// 텍스트를 문장 단위로 분할
    fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for m in self.boundary_re.find_iter(text) {
            let sentence = text[start..m.end()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = m.end();
        }

        // 마지막 문장 (종결 부호 없이 끝나는 경우 포함)
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }

        sentences
    }

    /// chunk_size를 넘는 문장을 문자 경계에서 강제 분할
    fn hard_split(&self, sentence: &str) -> Vec<String> {
        let chars: Vec<char> = sentence.chars().collect();
        chars
            .chunks(self.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }
}

impl Chunker for SentenceSplitter {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        let sentences = self.split_sentences(text);

        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0;

        for sentence in sentences {
            let sentence_chars = sentence.chars().count();

            // 문장 자체가 최대 크기 초과 -> 강제 분할
            if sentence_chars > self.chunk_size {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_chars = 0;
                }
                chunks.extend(self.hard_split(sentence));
                continue;
            }

            // 현재 청크에 추가하면 최대 크기 초과?
            if !current.is_empty() && current_chars + 1 + sentence_chars > self.chunk_size {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }

            if !current.is_empty() {
                current.push(' ');
                current_chars += 1;
            }
            current.push_str(sentence);
            current_chars += sentence_chars;
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "SentenceSplitter"
    }
}

// ============================================================================
// Node Construction
// ============================================================================

/// 문서 목록을 청킹하여 노드 목록 생성
///
/// 노드 ID는 "{doc_id}#{seq}"이며, seq는 문서 내에서 0부터 단조 증가합니다.
/// 노드 순서는 문서 순서와 문서 내 위치를 보존합니다.
pub fn nodes_from_documents(documents: &[Document], chunker: &dyn Chunker) -> Vec<Node> {
    let mut nodes = Vec::new();

    for doc in documents {
        for (seq, text) in chunker.chunk(&doc.text).into_iter().enumerate() {
            nodes.push(Node {
                id: format!("{}#{}", doc.id, seq),
                doc_id: doc.id.clone(),
                seq,
                text,
                embedding: None,
            });
        }
    }

    tracing::debug!(
        "Chunked {} documents into {} nodes",
        documents.len(),
        nodes.len()
    );
    nodes
}

// ============================================================================
// Tests
// ============================================================================
