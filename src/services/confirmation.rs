//! 人工确认 - 业务能力层
//!
//! 自动化流程在检查点（登录、二次验证）调用 [`ConfirmationGate::confirm`]，
//! 阻塞直到操作员确认。界面层通过 [`prompt_channel`] 接收提示并回复，
//! 与任何具体的 UI 框架解耦。

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Stdin};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::debug;

use crate::error::{AppError, AppResult};

/// 人工确认闸门
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// 显示提示并等待确认
    async fn confirm(&self, message: &str) -> AppResult<()>;
}

/// 控制台确认：打印提示，等待回车
///
/// 整个运行期间共用一个缓冲读取器，一次粘贴的多行回车不会丢失。
#[derive(Debug)]
pub struct ConsolePrompt<R = Stdin> {
    input: Mutex<BufReader<R>>,
}

impl ConsolePrompt {
    pub fn new() -> Self {
        Self::with_input(tokio::io::stdin())
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: AsyncRead + Unpin + Send> ConsolePrompt<R> {
    /// 从任意输入读取确认
    pub fn with_input(input: R) -> Self {
        Self {
            input: Mutex::new(BufReader::new(input)),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ConfirmationGate for ConsolePrompt<R> {
    async fn confirm(&self, message: &str) -> AppResult<()> {
        println!("\n>>> {} [回车继续]", message);
        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(AppError::PromptClosed("标准输入已关闭".to_string()));
        }
        Ok(())
    }
}

/// 发往界面层的确认请求
#[derive(Debug)]
pub struct PromptRequest {
    message: String,
    ack: oneshot::Sender<()>,
}

impl PromptRequest {
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 操作员已确认，唤醒自动化流程
    pub fn acknowledge(self) {
        // 流程端已放弃等待时没有接收者，忽略即可
        let _ = self.ack.send(());
    }
}

/// 通道确认：自动化流程端
#[derive(Debug, Clone)]
pub struct ChannelPrompt {
    tx: mpsc::Sender<PromptRequest>,
}

/// 通道确认：界面层端
#[derive(Debug)]
pub struct PromptReceiver {
    rx: mpsc::Receiver<PromptRequest>,
}

impl PromptReceiver {
    /// 异步接收下一条确认请求
    pub async fn recv(&mut self) -> Option<PromptRequest> {
        self.rx.recv().await
    }

    /// 在非异步线程（如 GUI 事件线程）中接收
    pub fn blocking_recv(&mut self) -> Option<PromptRequest> {
        self.rx.blocking_recv()
    }

    /// 不阻塞地取一条请求，适合在 UI 事件循环里轮询
    pub fn try_recv(&mut self) -> Option<PromptRequest> {
        self.rx.try_recv().ok()
    }
}

/// 创建一对确认通道
pub fn prompt_channel() -> (ChannelPrompt, PromptReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (ChannelPrompt { tx }, PromptReceiver { rx })
}

#[async_trait]
impl ConfirmationGate for ChannelPrompt {
    async fn confirm(&self, message: &str) -> AppResult<()> {
        let (ack, done) = oneshot::channel();
        let request = PromptRequest {
            message: message.to_string(),
            ack,
        };
        self.tx
            .send(request)
            .await
            .map_err(|_| AppError::PromptClosed("界面层已退出".to_string()))?;
        debug!("已发送确认请求，等待操作员: {}", message);
        done.await
            .map_err(|_| AppError::PromptClosed("确认请求被丢弃".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn console_prompt_keeps_buffered_lines_between_confirms() {
        let prompt = ConsolePrompt::with_input(&b"\n\n"[..]);
        prompt.confirm("请登录").await.unwrap();
        prompt.confirm("二次验证").await.unwrap();
        let err = prompt.confirm("附加验证").await.unwrap_err();
        assert!(matches!(err, AppError::PromptClosed(_)));
    }

    #[tokio::test]
    async fn channel_prompt_blocks_until_acknowledged() {
        let (gate, mut receiver) = prompt_channel();
        let acknowledged = Arc::new(AtomicBool::new(false));

        let ui = {
            let acknowledged = acknowledged.clone();
            tokio::spawn(async move {
                let request = receiver.recv().await.unwrap();
                assert_eq!(request.message(), "请登录");
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                acknowledged.store(true, Ordering::SeqCst);
                request.acknowledge();
            })
        };

        gate.confirm("请登录").await.unwrap();
        assert!(acknowledged.load(Ordering::SeqCst));
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn ui_thread_can_answer_with_blocking_recv() {
        let (gate, mut receiver) = prompt_channel();
        let ui = std::thread::spawn(move || {
            let request = receiver.blocking_recv().unwrap();
            request.acknowledge();
        });
        gate.confirm("二次验证").await.unwrap();
        ui.join().unwrap();
    }

    #[tokio::test]
    async fn dropped_receiver_fails_instead_of_hanging() {
        let (gate, receiver) = prompt_channel();
        drop(receiver);
        let err = gate.confirm("x").await.unwrap_err();
        assert!(matches!(err, AppError::PromptClosed(_)));
    }

    #[tokio::test]
    async fn dropped_request_fails() {
        let (gate, mut receiver) = prompt_channel();
        let ui = tokio::spawn(async move {
            let request = receiver.recv().await.unwrap();
            drop(request);
        });
        let err = gate.confirm("x").await.unwrap_err();
        assert!(matches!(err, AppError::PromptClosed(_)));
        ui.await.unwrap();
    }
}
