use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use sefaz_nfe_download::config::Config;
use sefaz_nfe_download::utils::logging;
use sefaz_nfe_download::{App, BatchRequest, DateRange};

#[derive(Parser, Debug)]
#[command(name = "sefaz-nfe")]
#[command(about = "从 SEFAZ-GO 门户批量下载 NF-e XML")]
struct Cli {
    /// IE 列表，逗号或空格分隔
    #[arg(long, env = "SEFAZ_IES", value_delimiter = ',', num_args = 1.., required = true)]
    ies: Vec<String>,

    /// 开始日期 (DD/MM/AAAA)
    #[arg(long)]
    start_date: String,

    /// 结束日期 (DD/MM/AAAA)
    #[arg(long)]
    end_date: String,

    /// 下载根目录
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// 定位器覆盖文件 (TOML)
    #[arg(long)]
    locators: Option<PathBuf>,

    /// 无头模式
    #[arg(long)]
    headless: bool,

    /// 连接已运行浏览器的调试端口
    #[arg(long)]
    debug_port: Option<u16>,

    /// 定位超时时的截图目录
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,

    /// 详细日志
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.download_dir {
            config.download_dir = dir.clone();
        }
        if let Some(file) = &self.locators {
            config.locator_file = file.clone();
        }
        if self.headless {
            config.headless = true;
        }
        if self.debug_port.is_some() {
            config.browser_debug_port = self.debug_port;
        }
        if self.screenshot_dir.is_some() {
            config.screenshot_dir = self.screenshot_dir.clone();
        }
        if self.verbose {
            config.verbose_logging = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::from_env();
    cli.apply(&mut config);

    // 初始化日志
    logging::init(config.verbose_logging);

    // 浏览器启动前先校验输入
    let range = DateRange::parse(&cli.start_date, &cli.end_date).context("日期参数无效")?;
    let request = BatchRequest::new(cli.ies.clone(), range).context("IE 参数无效")?;

    let summary = App::new(config).run(&request).await?;

    for path in summary.saved_files() {
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["sefaz-nfe", "--start-date", "01/07/2025", "--end-date", "31/07/2025"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn ies_accept_commas_and_separate_values() {
        assert_eq!(parse(&["--ies", "111,222"]).ies, vec!["111", "222"]);
        assert_eq!(parse(&["--ies", "111", "222"]).ies, vec!["111", "222"]);
        assert_eq!(parse(&["--ies", "111,222", "333"]).ies, vec!["111", "222", "333"]);
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = parse(&["--ies", "111", "--headless", "--debug-port", "9222"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert!(config.headless);
        assert_eq!(config.browser_debug_port, Some(9222));
    }
}
