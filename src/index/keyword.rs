//! Keyword Table Index - 인메모리 역색인
//!
//! 노드별로 핵심 키워드를 추출하여 (키워드 -> 노드 집합) 역색인을 만듭니다.
//!
//! 추출 알고리즘 (동일 입력에 대해 결정적):
//! 1. 소문자 영숫자 토큰화 ('_'와 '-'는 토큰 내부에서 유지)
//! 2. 2자 미만 토큰 및 불용어 제거
//! 3. 노드 내 빈도 내림차순 정렬 (동률은 첫 등장 순서), 상위 N개만 유지

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::index::store::DocumentStore;

/// 노드당 최대 키워드 수
pub const MAX_KEYWORDS_PER_NODE: usize = 10;

/// 쿼리당 최대 키워드 수
pub const MAX_QUERY_KEYWORDS: usize = 10;

/// 영어 불용어 목록
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "could", "did", "do",
    "does", "for", "from", "had", "has", "have", "he", "her", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "me", "my", "no", "not", "of", "on", "or", "our", "she", "so",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "to", "up", "was",
    "we", "were", "what", "when", "where", "which", "who", "why", "will", "with", "would", "you",
    "your",
];

// ============================================================================
// Keyword Extraction
// ============================================================================

/// 불용어 여부 확인
fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// 텍스트를 소문자 영숫자 토큰으로 분할
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_string())
        .collect()
}

/// 핵심 키워드 추출
///
/// 빈도 내림차순, 동률은 첫 등장 순서로 정렬하여 최대 max_keywords개를
/// 반환합니다. 동일 입력에 대해 항상 같은 결과를 냅니다.
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let tokens = tokenize(text);

    // 토큰 -> (빈도, 첫 등장 위치)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (pos, token) in tokens.into_iter().enumerate() {
        if is_stopword(&token) {
            continue;
        }
        let entry = counts.entry(token).or_insert((0, pos));
        entry.0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(token, (count, first))| (token, count, first))
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.truncate(max_keywords);

    ranked.into_iter().map(|(token, _, _)| token).collect()
}

// ============================================================================
// KeywordIndex
// ============================================================================

/// 키워드 역색인
///
/// 키워드 -> 노드 순번 집합 매핑입니다. 순번은 저장소 삽입 순서이므로
/// 검색 결과는 항상 원본 노드 순서를 따릅니다.
#[derive(Debug)]
pub struct KeywordIndex {
    table: BTreeMap<String, BTreeSet<usize>>,
    node_ids: Vec<String>,
}

impl KeywordIndex {
    /// 저장소의 전체 노드로 역색인 구축
    pub fn build(store: &DocumentStore) -> Self {
        let mut table: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        let mut node_ids = Vec::with_capacity(store.len());

        for (ordinal, node) in store.iter().enumerate() {
            node_ids.push(node.id.clone());

            for keyword in extract_keywords(&node.text, MAX_KEYWORDS_PER_NODE) {
                table.entry(keyword).or_default().insert(ordinal);
            }
        }

        tracing::debug!(
            "Built keyword table: {} keywords over {} nodes",
            table.len(),
            node_ids.len()
        );

        Self { table, node_ids }
    }

    /// 쿼리 키워드와 일치하는 노드 ID 검색
    ///
    /// 인덱싱과 동일한 추출 알고리즘으로 쿼리 키워드를 뽑아, 일치하는
    /// 키워드들의 노드 집합을 합집합으로 반환합니다. 일치하는 키워드가
    /// 없으면 빈 목록을 반환합니다 (에러 아님).
    pub fn retrieve(&self, query: &str) -> Vec<String> {
        let keywords = extract_keywords(query, MAX_QUERY_KEYWORDS);

        let mut matched: BTreeSet<usize> = BTreeSet::new();
        for keyword in &keywords {
            if let Some(ordinals) = self.table.get(keyword) {
                matched.extend(ordinals.iter().copied());
            }
        }

        matched
            .into_iter()
            .filter_map(|ordinal| self.node_ids.get(ordinal).cloned())
            .collect()
    }

    /// 역색인에 등록된 키워드 수
    pub fn keyword_count(&self) -> usize {
        self.table.len()
    }

    /// 인덱싱된 노드 수
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    /// 인덱스가 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::store::Node;

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
    fn test_tokenize_lowercases_and_filters() {
        let tokens = tokenize("The Sky, is BLUE! x");
        assert_eq!(tokens, vec!["the", "sky", "is", "blue"]);
    }

    #[test]
    fn test_extract_drops_stopwords() {
        let keywords = extract_keywords("the sky is blue and the grass is green", 10);
        assert!(keywords.contains(&"sky".to_string()));
        assert!(keywords.contains(&"blue".to_string()));
        assert!(!keywords.contains(&"the".to_string()));
        assert!(!keywords.contains(&"is".to_string()));
    }

    #[test]
    fn test_extract_is_deterministic() {
        let text = "rust makes systems programming safe and fast, rust is fast";
        let first = extract_keywords(text, 10);
        let second = extract_keywords(text, 10);
        assert_eq!(first, second);

        // 최다 빈도 토큰이 앞에 와야 함
        assert_eq!(first[0], "rust");
    }

    #[test]
    fn test_extract_respects_cap() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let keywords = extract_keywords(text, 5);
        assert_eq!(keywords.len(), 5);
    }

    #[test]
    fn test_keyword_retrievable_after_indexing() {
        let store = store_with(&[
            "The sky is blue today",
            "Grass is green in spring",
            "Rust compiles to native code",
        ]);
        let index = KeywordIndex::build(&store);

        let results = index.retrieve("what color is the sky?");
        assert_eq!(results, vec!["doc.txt#0"]);

        let results = index.retrieve("tell me about rust code");
        assert_eq!(results, vec!["doc.txt#2"]);
    }

    #[test]
    fn test_no_matching_keywords_yields_empty() {
        let store = store_with(&["The sky is blue"]);
        let index = KeywordIndex::build(&store);

        let results = index.retrieve("quantum entanglement");
        assert!(results.is_empty());
    }

    #[test]
    fn test_stopword_only_query_yields_empty() {
        let store = store_with(&["The sky is blue"]);
        let index = KeywordIndex::build(&store);

        let results = index.retrieve("is the of and");
        assert!(results.is_empty());
    }

    #[test]
    fn test_union_preserves_node_order() {
        let store = store_with(&[
            "green grass everywhere",
            "blue sky above",
            "green trees and blue water",
        ]);
        let index = KeywordIndex::build(&store);

        let results = index.retrieve("green blue");
        assert_eq!(results, vec!["doc.txt#0", "doc.txt#1", "doc.txt#2"]);
    }
}
