//! 节奏 / 暂停控制 - 业务能力层
//!
//! 用户在界面上有操作时暂停自动化，空闲超过阈值后恢复。
//! 暂停是协作式的：只在状态转换前的检查点生效，不会打断进行中的动作。

use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// 默认轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 暂停状态
#[derive(Debug, Clone, Copy)]
struct PauseState {
    active: bool,
    last_activity_at: Instant,
    idle_threshold: Duration,
}

/// 暂停控制器
///
/// `signal_activity` 可以在任意任务或线程中调用，状态由互斥锁保护，
/// 锁不会跨越 await 持有。
#[derive(Debug)]
pub struct PauseController {
    state: Mutex<PauseState>,
    poll_interval: Duration,
}

impl PauseController {
    pub fn new(idle_threshold: Duration) -> Self {
        Self::with_poll_interval(idle_threshold, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(idle_threshold: Duration, poll_interval: Duration) -> Self {
        Self {
            state: Mutex::new(PauseState {
                active: false,
                last_activity_at: Instant::now(),
                idle_threshold,
            }),
            poll_interval,
        }
    }

    /// 记录一次用户操作
    pub fn signal_activity(&self) {
        let mut state = self.lock();
        if !state.active {
            debug!("检测到用户操作，自动化将在下一个检查点暂停");
        }
        state.active = true;
        state.last_activity_at = Instant::now();
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// 用户操作期间阻塞，空闲达到阈值后清除暂停并返回
    pub async fn check(&self) {
        let mut announced = false;
        loop {
            {
                let mut state = self.lock();
                if !state.active {
                    break;
                }
                if state.last_activity_at.elapsed() >= state.idle_threshold {
                    state.active = false;
                    break;
                }
            }
            if !announced {
                info!("⏸ 用户正在操作，自动化已暂停");
                announced = true;
            }
            sleep(self.poll_interval).await;
        }
        if announced {
            info!("▶ 用户空闲，自动化继续");
        }
    }

    /// 检查暂停后，随机等待 [min, max] 秒
    pub async fn human_delay(&self, min_secs: f64, max_secs: f64) {
        self.check().await;
        let delay = random_delay(min_secs, max_secs);
        if !delay.is_zero() {
            debug!("随机等待 {:.2}s", delay.as_secs_f64());
            sleep(delay).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PauseState> {
        // 锁内没有可能 panic 的代码，中毒时直接取回数据
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 在 [min, max] 秒之间均匀取值
pub fn random_delay(min_secs: f64, max_secs: f64) -> Duration {
    // 非有限值当作 0，避免 Duration 溢出
    let finite = |secs: f64| if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    let (lo, hi) = (finite(min_secs), finite(max_secs));
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let secs = if lo == hi {
        lo
    } else {
        rand::thread_rng().gen_range(lo..=hi)
    };
    Duration::from_secs_f64(secs)
}
