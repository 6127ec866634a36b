use std::path::PathBuf;
use std::time::Duration;

/// 门户登录凭据
#[derive(Clone)]
pub struct Credentials {
    pub cpf: String,
    pub senha: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("cpf", &self.cpf)
            .field("senha", &"***")
            .finish()
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 门户登录页 URL
    pub portal_url: String,
    /// 浏览器调试端口（设置后连接已运行的浏览器，而不是启动新的）
    pub browser_debug_port: Option<u16>,
    /// 是否无头模式（需要人工登录时应关闭）
    pub headless: bool,
    /// 定位器覆盖文件（TOML）
    pub locator_file: PathBuf,
    /// 下载根目录
    pub download_dir: PathBuf,
    /// 每一步等待元素的上限（秒）
    pub step_timeout_secs: u64,
    /// 可选控件探测的上限（秒）
    pub probe_timeout_secs: u64,
    /// 用户无操作多少秒后恢复自动化
    pub idle_threshold_secs: u64,
    /// 暂停状态轮询间隔（毫秒）
    pub pause_poll_ms: u64,
    /// 随机延迟下限（秒）
    pub delay_min_secs: f64,
    /// 随机延迟上限（秒）
    pub delay_max_secs: f64,
    /// 失败时截图目录，为空则不截图
    pub screenshot_dir: Option<PathBuf>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 运行日志文件
    pub output_log_file: String,
    /// 自动填写登录表单的凭据
    pub credentials: Option<Credentials>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_url: "https://portal.sefaz.go.gov.br/portalsefaz-apps/auth/login-form"
                .to_string(),
            browser_debug_port: None,
            headless: false,
            locator_file: PathBuf::from("locators.toml"),
            download_dir: PathBuf::from("downloads"),
            step_timeout_secs: 20,
            probe_timeout_secs: 3,
            idle_threshold_secs: 3,
            pause_poll_ms: 500,
            delay_min_secs: 1.0,
            delay_max_secs: 3.0,
            screenshot_dir: None,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            credentials: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        let credentials = match (std::env::var("SEFAZ_CPF"), std::env::var("SEFAZ_SENHA")) {
            (Ok(cpf), Ok(senha)) if !cpf.is_empty() && !senha.is_empty() => {
                Some(Credentials { cpf, senha })
            }
            _ => default.credentials,
        };
        Self {
            portal_url: std::env::var("PORTAL_URL").unwrap_or(default.portal_url),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).or(default.browser_debug_port),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            locator_file: std::env::var("LOCATOR_FILE").map(PathBuf::from).unwrap_or(default.locator_file),
            download_dir: std::env::var("DOWNLOAD_DIR").map(PathBuf::from).unwrap_or(default.download_dir),
            step_timeout_secs: std::env::var("STEP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.step_timeout_secs),
            probe_timeout_secs: std::env::var("PROBE_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.probe_timeout_secs),
            idle_threshold_secs: std::env::var("IDLE_THRESHOLD_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.idle_threshold_secs),
            pause_poll_ms: std::env::var("PAUSE_POLL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.pause_poll_ms),
            delay_min_secs: std::env::var("DELAY_MIN_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.delay_min_secs),
            delay_max_secs: std::env::var("DELAY_MAX_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.delay_max_secs),
            screenshot_dir: std::env::var("SCREENSHOT_DIR").ok().map(PathBuf::from).or(default.screenshot_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            credentials,
        }
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// 延迟区间，上下限颠倒时自动纠正
    pub fn delay_range(&self) -> (f64, f64) {
        if !self.delay_min_secs.is_finite() || !self.delay_max_secs.is_finite() {
            let default = Self::default();
            return (default.delay_min_secs, default.delay_max_secs);
        }
        let min = self.delay_min_secs.max(0.0);
        let max = self.delay_max_secs.max(0.0);
        if min <= max {
            (min, max)
        } else {
            (max, min)
        }
    }
}
