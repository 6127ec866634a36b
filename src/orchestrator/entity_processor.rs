//! 单个 IE 处理器 - 编排层
//!
//! 对一个 IE 按固定顺序（incoming、outgoing）执行查询循环：
//! 提交查询 → 等待结果 → 下载 → 重置表单。每个票据类型的结果在重置表单之前
//! 计入汇总，中途失败时已完成的类型保留，剩余类型放弃。

use std::path::Path;

use tracing::{info, warn};

use crate::error::AppResult;
use crate::infrastructure::BrowserDriver;
use crate::models::{BatchSummary, Category, DateRange, DownloadResult, EntityQuery};
use crate::services::{DownloadExtractor, ResourceFetcher};
use crate::utils::logging;
use crate::workflow::{NavigationMachine, ResultsOutcome};

/// 处理单个 IE，返回本 IE 保存的文件数
pub async fn process_entity<D, F>(
    machine: &mut NavigationMachine<D>,
    extractor: &DownloadExtractor<F>,
    entity_id: &str,
    range: &DateRange,
    summary: &mut BatchSummary,
    run_log: Option<&Path>,
) -> AppResult<usize>
where
    D: BrowserDriver,
    F: ResourceFetcher,
{
    let mut saved = 0;

    for (index, category) in Category::ALL.into_iter().enumerate() {
        if index > 0 {
            machine.context().pace().await;
        }
        let query = EntityQuery::new(entity_id, *range, category);
        let result = process_query(machine, extractor, &query).await?;
        saved += result.files().len();

        if let Some(path) = run_log {
            if let Err(e) = logging::record_result(path, &result) {
                warn!("{} 写入运行日志失败: {}", query, e);
            }
        }
        summary.push(result);

        // 已下载的文件已经入账，重置失败只放弃后续查询
        machine.reset_query().await?;
    }

    Ok(saved)
}

/// 单个 (IE, 票据类型) 的查询和下载，不含表单重置
async fn process_query<D, F>(
    machine: &mut NavigationMachine<D>,
    extractor: &DownloadExtractor<F>,
    query: &EntityQuery,
) -> AppResult<DownloadResult>
where
    D: BrowserDriver,
    F: ResourceFetcher,
{
    machine.submit_search(query).await?;

    let result = match machine.await_results(query).await? {
        ResultsOutcome::Empty => DownloadResult::empty(query.entity_id(), query.category()),
        ResultsOutcome::Ready => machine.extract_files(extractor, query).await?,
    };
    info!("{} 本次保存 {} 个文件", query, result.files().len());
    Ok(result)
}
