use std::path::PathBuf;

use crate::models::query::Category;

/// 单个 (IE, 票据类型) 的下载结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    entity_id: String,
    category: Category,
    files: Vec<PathBuf>,
}

impl DownloadResult {
    pub fn new(entity_id: impl Into<String>, category: Category, files: Vec<PathBuf>) -> Self {
        Self {
            entity_id: entity_id.into(),
            category,
            files,
        }
    }

    /// 查询无结果
    pub fn empty(entity_id: impl Into<String>, category: Category) -> Self {
        Self::new(entity_id, category, Vec::new())
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// 处理失败的 IE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    pub entity_id: String,
    pub reason: String,
}

/// 批量处理汇总
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    results: Vec<DownloadResult>,
    failures: Vec<EntityFailure>,
}

impl BatchSummary {
    pub fn push(&mut self, result: DownloadResult) {
        self.results.push(result);
    }

    pub fn record_failure(&mut self, entity_id: impl Into<String>, reason: impl Into<String>) {
        self.failures.push(EntityFailure {
            entity_id: entity_id.into(),
            reason: reason.into(),
        });
    }

    pub fn results(&self) -> &[DownloadResult] {
        &self.results
    }

    pub fn failures(&self) -> &[EntityFailure] {
        &self.failures
    }

    /// 所有已保存文件，按处理顺序
    pub fn saved_files(&self) -> Vec<PathBuf> {
        self.results
            .iter()
            .flat_map(|r| r.files().iter().cloned())
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.results.iter().map(|r| r.files().len()).sum()
    }
}
