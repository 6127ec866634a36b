use crate::models::locator_config::LocatorConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从覆盖文件解析定位器配置
///
/// 文件缺失、无法读取或格式错误时返回内置默认值，不会中断运行。
pub async fn resolve_locator_config(override_path: Option<&Path>) -> LocatorConfig {
    let Some(path) = override_path else {
        return LocatorConfig::defaults();
    };

    match read_overrides(path).await {
        Ok(overrides) => {
            let mut config = LocatorConfig::defaults();
            let applied = config.merge(&overrides);
            tracing::info!("已加载定位器覆盖 {} 项: {}", applied, path.display());
            config
        }
        Err(e) => {
            tracing::debug!("使用默认定位器 ({:#})", e);
            LocatorConfig::defaults()
        }
    }
}

async fn read_overrides(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取定位器文件: {}", path.display()))?;

    let table = toml::from_str::<toml::Table>(&content)
        .with_context(|| format!("无法解析定位器文件: {}", path.display()))?;

    Ok(table)
}
