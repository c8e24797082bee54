//! 문서 로더 모듈
//!
//! 로컬 폴더에서 텍스트 문서를 읽어 Document 시퀀스로 반환합니다.
//! .gitignore 패턴을 존중하고, 지원하는 확장자만 수집하며,
//! 순회 순서는 경로 기준 정렬로 결정적입니다.

use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::WalkBuilder;

use crate::error::RagError;

// ============================================================================
// Document
// ============================================================================

/// 로드된 문서
///
/// 로드 이후에는 수정되지 않습니다.
#[derive(Debug, Clone)]
pub struct Document {
    /// 문서 ID (폴더 기준 상대 경로)
    pub id: String,
    /// 파일 절대 경로
    pub path: PathBuf,
    /// 문서 본문
    pub text: String,
}

/// 지원하는 텍스트 확장자 확인
fn is_supported_extension(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "md" | "txt" | "rst" | "html" | "csv" | "json" | "toml" | "yaml" | "yml" | "xml"
    )
}

/// 경로가 지원하는 문서 파일인지 확인
fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(is_supported_extension)
        .unwrap_or(false)
}

// ============================================================================
// Loader Config
// ============================================================================

/// 문서 로더 설정
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// .gitignore 패턴 존중 여부
    pub respect_gitignore: bool,
    /// 숨김 파일 포함 여부
    pub include_hidden: bool,
    /// 최대 파일 크기 (바이트, 0이면 제한 없음)
    pub max_file_size: u64,
    /// 특정 확장자만 수집 (비어있으면 모든 지원 확장자)
    pub extensions: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            include_hidden: false,
            max_file_size: 10 * 1024 * 1024, // 10MB
            extensions: vec![],
        }
    }
}

// ============================================================================
// Document Loader
// ============================================================================

/// 문서 로더
pub struct DocumentLoader {
    config: LoaderConfig,
}

impl DocumentLoader {
    /// 새 로더 생성
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 로더 생성
    pub fn with_defaults() -> Self {
        Self::new(LoaderConfig::default())
    }

    /// 폴더의 문서를 모두 로드
    ///
    /// 폴더가 없거나 읽을 수 있는 문서가 하나도 없으면 NotFound 에러를 반환합니다.
    /// 반환 순서는 경로 기준 정렬로 결정적입니다.
    pub fn load_directory(&self, path: &Path) -> Result<Vec<Document>> {
        let abs_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        if !abs_path.exists() {
            return Err(
                RagError::NotFound(format!("data folder does not exist: {:?}", abs_path)).into(),
            );
        }

        if !abs_path.is_dir() {
            return Err(RagError::NotFound(format!("not a directory: {:?}", abs_path)).into());
        }

        let mut documents = Vec::new();

        // ignore 크레이트로 .gitignore 지원, 정렬 순회
        let walker = WalkBuilder::new(&abs_path)
            .hidden(!self.config.include_hidden)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    continue;
                }
            };

            // 파일만 처리
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            let file_path = entry.path();

            if !self.should_include(file_path) {
                continue;
            }

            // 텍스트로 읽을 수 없는 파일은 건너뜀
            let text = match std::fs::read_to_string(file_path) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("Skipping unreadable file {:?}: {}", file_path, e);
                    continue;
                }
            };

            let id = file_path
                .strip_prefix(&abs_path)
                .unwrap_or(file_path)
                .to_string_lossy()
                .replace('\\', "/");

            documents.push(Document {
                id,
                path: file_path.to_path_buf(),
                text,
            });
        }

        if documents.is_empty() {
            return Err(RagError::NotFound(format!(
                "no readable documents found in {:?}",
                abs_path
            ))
            .into());
        }

        tracing::info!("Loaded {} documents from {:?}", documents.len(), abs_path);
        Ok(documents)
    }

    /// 파일이 필터 조건을 만족하는지 확인
    fn should_include(&self, path: &Path) -> bool {
        if !is_supported_path(path) {
            return false;
        }

        // 파일 크기 제한
        if self.config.max_file_size > 0 {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            if size > self.config.max_file_size {
                tracing::debug!("Skipping large file: {:?} ({} bytes)", path, size);
                return false;
            }
        }

        // 특정 확장자만 수집
        if !self.config.extensions.is_empty() {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if !self
                    .config
                    .extensions
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
                {
                    return false;
                }
            } else {
                return false;
            }
        }

        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension("md"));
        assert!(is_supported_extension("TXT"));
        assert!(!is_supported_extension("png"));
        assert!(!is_supported_extension("exe"));
    }

    #[test]
    fn test_load_directory_sorted_order() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "b.txt", "second");
        write_file(dir.path(), "a.txt", "first");
        write_file(dir.path(), "c.md", "third");

        let loader = DocumentLoader::with_defaults();
        let docs = loader.load_directory(dir.path()).unwrap();

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].id, "a.txt");
        assert_eq!(docs[1].id, "b.txt");
        assert_eq!(docs[2].id, "c.md");
        assert_eq!(docs[0].text, "first");
    }

    #[test]
    fn test_missing_folder_is_not_found() {
        let loader = DocumentLoader::with_defaults();
        let err = loader
            .load_directory(Path::new("/nonexistent/docquery-test"))
            .expect_err("expected error");

        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_folder_is_not_found() {
        let dir = TempDir::new().unwrap();

        let loader = DocumentLoader::with_defaults();
        let err = loader.load_directory(dir.path()).expect_err("expected error");

        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::NotFound(_))
        ));
    }

    #[test]
    fn test_unsupported_files_skipped() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "doc.txt", "hello");
        write_file(dir.path(), "binary.exe", "not text");
        write_file(dir.path(), "image.png", "fake image");

        let loader = DocumentLoader::with_defaults();
        let docs = loader.load_directory(dir.path()).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "doc.txt");
    }

    #[test]
    fn test_extension_filter() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "doc.txt", "text");
        write_file(dir.path(), "doc.md", "markdown");

        let config = LoaderConfig {
            extensions: vec!["md".to_string()],
            ..Default::default()
        };
        let loader = DocumentLoader::new(config);
        let docs = loader.load_directory(dir.path()).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "doc.md");
    }

    #[test]
    fn test_max_file_size_filter() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "small.txt", "ok");
        write_file(dir.path(), "large.txt", &"x".repeat(2048));

        let config = LoaderConfig {
            max_file_size: 1024,
            ..Default::default()
        };
        let loader = DocumentLoader::new(config);
        let docs = loader.load_directory(dir.path()).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "small.txt");
    }

    #[test]
    fn test_subdirectory_traversal() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        write_file(dir.path(), "top.txt", "top");
        write_file(&dir.path().join("sub"), "nested.txt", "nested");

        let loader = DocumentLoader::with_defaults();
        let docs = loader.load_directory(dir.path()).unwrap();

        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|d| d.id == "sub/nested.txt"));
    }
}
