//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **会话准备**：打开门户、登录、进入下载服务（含人工检查点）
//! 2. **顺序遍历**：IE × 票据类型，严格串行地复用同一个浏览器会话
//! 3. **失败隔离**：单个 IE 失败只记录，尽力重置表单后继续下一个
//! 4. **资源管理**：无论成功或失败，会话只关闭一次
//!
//! [`App`] 在此之上负责日志、配置、浏览器的创建。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::{AppResult, ConfigError};
use crate::infrastructure::{BrowserDriver, WorkflowSession};
use crate::models::{resolve_locator_config, BatchSummary, DateRange, LocatorConfig};
use crate::orchestrator::entity_processor;
use crate::services::{
    ConfirmationGate, ConsolePrompt, DownloadExtractor, HttpFetcher, PauseController,
    ResourceFetcher, WorkflowContext,
};
use crate::utils::logging;
use crate::workflow::NavigationMachine;

/// 批量编排器，独占导航状态机
pub struct BatchOrchestrator<D: BrowserDriver, F: ResourceFetcher> {
    machine: NavigationMachine<D>,
    extractor: DownloadExtractor<F>,
    run_log: Option<PathBuf>,
}

impl<D: BrowserDriver, F: ResourceFetcher> BatchOrchestrator<D, F> {
    pub fn new(driver: D, ctx: Arc<WorkflowContext>, extractor: DownloadExtractor<F>) -> Self {
        Self {
            machine: NavigationMachine::new(WorkflowSession::new(driver), ctx),
            extractor,
            run_log: None,
        }
    }

    /// 每次查询的结果追加到运行日志
    pub fn with_run_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.run_log = Some(path.into());
        self
    }

    pub fn machine(&self) -> &NavigationMachine<D> {
        &self.machine
    }

    pub fn extractor(&self) -> &DownloadExtractor<F> {
        &self.extractor
    }

    /// 登录并进入下载服务
    pub async fn prepare(&mut self) -> AppResult<()> {
        self.machine.open_portal().await?;
        self.machine.enter_restricted_area().await
    }

    /// 依次处理所有 IE
    ///
    /// 单个 IE 的失败不会中断批处理，记录在 [`BatchSummary::failures`] 中。
    pub async fn run(&mut self, entities: &[String], range: &DateRange) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let total = entities.len();

        for (index, entity_id) in entities.iter().enumerate() {
            if index > 0 {
                self.machine.context().pace().await;
            }
            logging::log_entity_start(index + 1, total, entity_id);

            match entity_processor::process_entity(
                &mut self.machine,
                &self.extractor,
                entity_id,
                range,
                &mut summary,
                self.run_log.as_deref(),
            )
            .await
            {
                Ok(files) => logging::log_entity_complete(entity_id, files),
                Err(e) => {
                    error!("[IE {}] ❌ 处理失败，跳过剩余查询: {}", entity_id, e);
                    summary.record_failure(entity_id.as_str(), e.to_string());
                    if let Err(e) = self.machine.reset_query().await {
                        warn!("[IE {}] 重置查询表单失败: {}", entity_id, e);
                    }
                }
            }
        }

        if let Err(e) = self.machine.finish().await {
            warn!("收尾失败: {}", e);
        }
        summary
    }

    /// 关闭会话
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.machine.shutdown().await
    }

    /// 准备、运行、关闭，会话在任何路径上都只关闭一次
    pub async fn execute(mut self, entities: &[String], range: &DateRange) -> AppResult<BatchSummary> {
        let outcome = match self.prepare().await {
            Ok(()) => Ok(self.run(entities, range).await),
            Err(e) => {
                error!("❌ 会话准备失败: {}", e);
                Err(e)
            }
        };
        if let Err(e) = self.shutdown().await {
            warn!("关闭浏览器会话失败: {}", e);
        }
        outcome
    }
}

/// 一次批量下载的输入
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub entities: Vec<String>,
    pub range: DateRange,
}

impl BatchRequest {
    pub fn new(entities: Vec<String>, range: DateRange) -> Result<Self, ConfigError> {
        let entities: Vec<String> = entities
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        if entities.is_empty() {
            return Err(ConfigError::NoEntities);
        }
        Ok(Self { entities, range })
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    pause: Arc<PauseController>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let pause = PauseController::with_poll_interval(
            Duration::from_secs(config.idle_threshold_secs),
            Duration::from_millis(config.pause_poll_ms.max(1)),
        );
        Self {
            config,
            pause: Arc::new(pause),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 界面层在操作员活动时调用 [`PauseController::signal_activity`]
    pub fn pause_handle(&self) -> Arc<PauseController> {
        self.pause.clone()
    }

    /// 控制台确认 + 真实浏览器 + HTTP 下载
    pub async fn run(&self, request: &BatchRequest) -> Result<BatchSummary> {
        self.run_with_gate(request, Arc::new(ConsolePrompt::new())).await
    }

    /// 使用自定义确认闸门运行（例如图形界面的通道确认）
    pub async fn run_with_gate(
        &self,
        request: &BatchRequest,
        confirm: Arc<dyn ConfirmationGate>,
    ) -> Result<BatchSummary> {
        let config = &self.config;
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(config, request.entities.len(), &request.range);

        let locators = resolve_locator_config(Some(config.locator_file.as_path())).await;
        let ctx = Arc::new(self.build_context(locators, confirm));
        let fetcher = HttpFetcher::new().context("无法创建 HTTP 客户端")?;
        let extractor = DownloadExtractor::new(fetcher, &config.download_dir);

        let driver = browser::open_driver(config)
            .await
            .context("浏览器初始化失败")?;
        info!("✓ 浏览器已就绪");

        let summary = BatchOrchestrator::new(driver, ctx, extractor)
            .with_run_log(&config.output_log_file)
            .execute(&request.entities, &request.range)
            .await?;

        logging::print_final_stats(&summary, &config.output_log_file);
        Ok(summary)
    }

    /// 流程上下文共用 [`App::pause_handle`] 交出去的暂停控制器
    fn build_context(
        &self,
        locators: LocatorConfig,
        confirm: Arc<dyn ConfirmationGate>,
    ) -> WorkflowContext {
        let mut ctx = WorkflowContext::from_config(&self.config, locators, confirm);
        ctx.pause = self.pause.clone();
        ctx
    }
}
