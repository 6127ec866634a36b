pub mod connection;
pub mod launch;

pub use connection::connect_to_browser;
pub use launch::launch_browser;

use anyhow::Result;

use crate::config::Config;
use crate::infrastructure::CdpDriver;

/// 按配置连接或启动浏览器
pub async fn open_driver(config: &Config) -> Result<CdpDriver> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser(port, Some("sefaz.go.gov.br")).await,
        None => launch_browser(config.headless).await,
    }
}
