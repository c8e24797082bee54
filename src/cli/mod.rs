//! CLI 모듈
//!
//! docquery 명령줄 인터페이스 정의 및 파이프라인 실행
//!
//! 설정 에러는 파이프라인 작업이 시작되기 전에 검증되어
//! 사용법 출력과 함께 종료 코드 1로 종료합니다 (fail fast).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};

use crate::config::RunConfig;
use crate::embedding::{EmbeddingProvider, LocalEmbedding};
use crate::index::{nodes_from_documents, DocumentStore, Index, IndexMode, SentenceSplitter};
use crate::llm::GeminiLlm;
use crate::loader::DocumentLoader;
use crate::query::QueryEngine;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "docquery")]
#[command(version, about = "로컬 문서 폴더 기반 RAG 질의응답", long_about = None)]
pub struct Cli {
    /// 검색 쿼리
    #[arg(long)]
    pub query: Option<String>,

    /// 문서 폴더 경로
    #[arg(long = "data_folder", default_value = "./data")]
    pub data_folder: PathBuf,

    /// 인덱싱 모드 (summary, vector, keyword)
    #[arg(long = "indexing_mode", value_enum, default_value_t = IndexMode::Vector)]
    pub indexing_mode: IndexMode,

    /// LLM temperature (0 ~ 1)
    #[arg(long, default_value_t = 0.0)]
    pub temperature: f32,

    /// 청크 최대 크기 (문자 수)
    #[arg(long = "chunk_size", default_value_t = 1024)]
    pub chunk_size: usize,

    /// 벡터 검색 상위 K
    #[arg(long = "similarity_top_k", default_value_t = 2)]
    pub similarity_top_k: usize,
}

// ============================================================================
// Argument Validation
// ============================================================================

/// CLI 인자 검증
///
/// 유효하면 (설정, 쿼리)를 반환하고, 아니면 사용자에게 보여줄 에러
/// 메시지를 반환합니다. 파이프라인 작업 전에 호출됩니다.
pub fn validate_args(cli: &Cli) -> Result<(RunConfig, String), String> {
    let config = RunConfig {
        data_folder: cli.data_folder.clone(),
        indexing_mode: cli.indexing_mode,
        temperature: cli.temperature,
        chunk_size: cli.chunk_size,
        similarity_top_k: cli.similarity_top_k,
    };

    if let Err(e) = config.validate() {
        return Err(e.to_string());
    }

    match &cli.query {
        Some(q) if !q.trim().is_empty() => Ok((config, q.clone())),
        _ => Err("the argument '--query' cannot be an empty string".to_string()),
    }
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 실행
pub async fn run(cli: Cli) -> Result<()> {
    let (config, query) = match validate_args(&cli) {
        Ok(v) => v,
        Err(message) => {
            // 사용법을 표준 출력으로 내보내고 종료 코드 1로 종료
            let mut cmd = Cli::command();
            let _ = cmd.print_help();
            println!("\nerror: {}\n", message);
            std::process::exit(1);
        }
    };

    cmd_query(&config, &query).await
}

/// 질의 파이프라인 실행
///
/// 로드 -> 청킹 -> 저장 -> (임베딩) -> 인덱스 구축 -> 검색/합성 -> 출력.
/// 단일 패스이며 실행 간 상태를 남기지 않습니다 (모델 캐시 제외).
async fn cmd_query(config: &RunConfig, query: &str) -> Result<()> {
    // 1. 문서 로드
    println!("[*] Loading documents from {}", config.data_folder.display());
    let loader = DocumentLoader::with_defaults();
    let documents = loader
        .load_directory(&config.data_folder)
        .context("Failed to load documents")?;
    println!("[*] Loaded {} documents", documents.len());

    // 2. 청킹 및 저장
    let splitter = SentenceSplitter::new(config.chunk_size);
    let nodes = nodes_from_documents(&documents, &splitter);
    let mut store = DocumentStore::new();
    store.add(nodes).context("Failed to store nodes")?;
    println!("[*] Stored nodes: {}", store.len());

    // 3. 임베딩 모델 준비 (vector 모드에서만)
    let embedder = if config.indexing_mode == IndexMode::Vector {
        println!("[*] Preparing local embedding model...");
        Some(
            LocalEmbedding::load()
                .await
                .context("Failed to prepare embedding model")?,
        )
    } else {
        None
    };
    let embedder_ref: Option<&dyn EmbeddingProvider> =
        embedder.as_ref().map(|e| e as &dyn EmbeddingProvider);

    // 4. 인덱스 구축
    println!("[*] Building {} index...", config.indexing_mode);
    let index = Index::build(config.indexing_mode, &store, embedder_ref)
        .await
        .context("Failed to build index")?;

    // 5. 검색 및 답변 합성
    let llm = GeminiLlm::from_env(config.temperature)?;
    println!("[*] Querying: \"{}\"", query);
    let engine = QueryEngine::new(&index, &store, &llm, embedder_ref, config.similarity_top_k);
    let response = engine.answer(query).await?;

    // 6. 답변 출력
    println!("{}", "*".repeat(50));
    println!("{} index response:\n{}", config.indexing_mode, response.answer);

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
