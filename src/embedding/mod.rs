//! 임베딩 모듈 - 로컬 BGE 모델 기반 텍스트 벡터화
//!
//! 텍스트를 고정 차원 벡터로 변환합니다. BGE-small-en-v1.5 모델을
//! candle로 로컬 추론하며, 모델 아티팩트는 첫 사용 시 Hugging Face
//! 허브에서 내려받아 로컬 캐시(~/.docquery/models/)에 보관합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = LocalEmbedding::load().await?;
//! let embedding = embedder.embed("Hello, world!").await?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use tokenizers::Tokenizer;

use crate::error::RagError;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 동일 입력과 동일 모델에 대해 결정적인 벡터를 반환해야 합니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            tracing::debug!("Embedding batch {}/{}", i + 1, texts.len());
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Model Artifacts
// ============================================================================

/// 임베딩 모델 저장소 (Hugging Face)
const MODEL_REPO: &str = "BAAI/bge-small-en-v1.5";

/// BGE-small 임베딩 차원
pub const EMBEDDING_DIMENSION: usize = 384;

/// 로컬 추론에 필요한 아티팩트 파일 목록
const MODEL_ARTIFACTS: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// 입력 최대 토큰 수
const MAX_TOKENS: usize = 512;

/// 모델 캐시 디렉토리 경로 (~/.docquery/models/bge-small-en-v1.5/)
pub fn get_model_cache_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docquery")
        .join("models")
        .join("bge-small-en-v1.5")
}

// ============================================================================
// LocalEmbedding
// ============================================================================

/// 로컬 BGE 임베딩 구현체
///
/// CLS 풀링 + L2 정규화로 문장 벡터를 만듭니다.
pub struct LocalEmbedding {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl LocalEmbedding {
    /// 기본 캐시 디렉토리에서 모델 로드
    ///
    /// 아티팩트가 없으면 먼저 내려받습니다 (명시적 초기화 단계).
    pub async fn load() -> Result<Self> {
        Self::load_from(&get_model_cache_dir()).await
    }

    /// 지정된 디렉토리에서 모델 로드
    ///
    /// # Arguments
    /// * `model_dir` - 아티팩트 캐시 디렉토리
    pub async fn load_from(model_dir: &Path) -> Result<Self> {
        ensure_artifacts(model_dir).await?;
        Self::from_dir(model_dir)
    }

    /// 캐시된 아티팩트만으로 모델 로드 (다운로드 없음)
    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        let device = Device::Cpu;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            anyhow!(
                "Failed to load tokenizer from {}: {}",
                tokenizer_path.display(),
                e
            )
        })?;

        let config_path = model_dir.join("config.json");
        let config: Config = serde_json::from_str(
            &std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?,
        )
        .context("Failed to parse model config")?;

        let weights_path = model_dir.join("model.safetensors");
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&weights_path], DTYPE, &device) }
            .with_context(|| format!("Failed to load weights from {}", weights_path.display()))?;

        let model = BertModel::load(vb, &config).context("Failed to build BERT model")?;

        tracing::info!("Loaded embedding model from {:?}", model_dir);

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: EMBEDDING_DIMENSION,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // 빈 텍스트 처리
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let mut ids = encoding.get_ids().to_vec();
        if ids.len() > MAX_TOKENS {
            ids.truncate(MAX_TOKENS);
        }

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, None)?;

        // CLS 풀링 (BGE 권장) + L2 정규화
        let mut embedding: Vec<f32> = hidden.i((0, 0))?.to_vec1()?;
        let norm = embedding
            .iter()
            .map(|x| x * x)
            .sum::<f32>()
            .sqrt()
            .max(1e-12);
        for x in &mut embedding {
            *x /= norm;
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "bge-small-en-v1.5"
    }
}

// ============================================================================
// Artifact Download
// ============================================================================

/// 모델 아티팩트 준비
///
/// 캐시에 없는 파일만 Hugging Face 허브에서 내려받습니다.
/// 다운로드는 재시도 없이 한 번만 시도하며, 실패하면 ModelUnavailable
/// 에러를 반환합니다 (성공한 파일만 디스크에 기록됩니다).
async fn ensure_artifacts(model_dir: &Path) -> Result<()> {
    let missing: Vec<&str> = MODEL_ARTIFACTS
        .iter()
        .copied()
        .filter(|name| !model_dir.join(name).exists())
        .collect();

    if missing.is_empty() {
        tracing::debug!("Using cached model artifacts at {:?}", model_dir);
        return Ok(());
    }

    std::fs::create_dir_all(model_dir)
        .with_context(|| format!("Failed to create model cache dir {:?}", model_dir))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()
        .context("Failed to create HTTP client")?;

    for name in missing {
        let url = format!(
            "https://huggingface.co/{}/resolve/main/{}",
            MODEL_REPO, name
        );
        tracing::info!("Downloading model artifact: {}", url);

        let bytes = fetch_artifact(&client, &url)
            .await
            .map_err(|e| RagError::ModelUnavailable(format!("failed to fetch {}: {}", name, e)))?;

        std::fs::write(model_dir.join(name), &bytes)
            .with_context(|| format!("Failed to write artifact {}", name))?;
    }

    Ok(())
}

/// 단일 아티팩트 다운로드
async fn fetch_artifact(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("HTTP {}", status);
    }

    Ok(response.bytes().await?.to_vec())
}

// ============================================================================
// HashEmbedding
// ============================================================================

/// 해시 기반 결정적 임베딩
///
/// 모델 없이 동작하는 bag-of-words 해시 임베딩입니다.
/// 테스트 및 오프라인 동작 확인용으로, 동일 입력에 항상 같은 벡터를
/// 반환하고 L2 정규화되어 있습니다.
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    /// 차원을 지정하여 생성
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dimension];

        for token in text.to_lowercase().split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();

            let idx = (h as usize) % self.dimension;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }

        Ok(v)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash-embedding"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_cache_dir_layout() {
        let dir = get_model_cache_dir();
        assert!(dir.ends_with("models/bge-small-en-v1.5"));
    }

    #[tokio::test]
    async fn test_hash_embedding_deterministic() {
        let embedder = HashEmbedding::new(64);

        let first = embedder.embed("the sky is blue").await.unwrap();
        let second = embedder.embed("the sky is blue").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[tokio::test]
    async fn test_hash_embedding_normalized() {
        let embedder = HashEmbedding::new(64);
        let v = embedder.embed("normalize me please").await.unwrap();

        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_hash_embedding_distinguishes_texts() {
        let embedder = HashEmbedding::new(64);

        let a = embedder.embed("the sky is blue").await.unwrap();
        let b = embedder.embed("compilers are programs").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_embed_batch_order() {
        let embedder = HashEmbedding::new(32);
        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];

        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0], embedder.embed("one").await.unwrap());
        assert_eq!(batch[2], embedder.embed("three").await.unwrap());
    }

    #[test]
    fn test_missing_artifacts_fail_without_network() {
        // 캐시가 비어있으면 from_dir는 다운로드 없이 실패해야 함
        let dir = tempfile::TempDir::new().unwrap();
        let result = LocalEmbedding::from_dir(dir.path());
        assert!(result.is_err());
    }
}
