//! 单请求运行守卫：取消令牌 + 绝对截止时间
//!
//! worker 的每个挂起点（LLM 调用、工具执行）都通过 `run` 与取消 / 超时竞争；
//! 阶段之间调用 `check`，避免在已取消的请求上继续浪费工作。

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::CopilotError;

/// 截止时间的上限；更长的超时按此处理，避免 Instant 溢出
const MAX_SPAN: Duration = Duration::from_secs(365 * 24 * 3600);

#[derive(Clone, Debug)]
pub struct RunGuard {
    token: CancellationToken,
    deadline: Instant,
}

impl RunGuard {
    pub fn new(token: CancellationToken, timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now.checked_add(timeout.min(MAX_SPAN)).unwrap_or(now);
        Self { token, deadline }
    }

    /// 无截止时间限制（测试与同步调用场景）
    pub fn unbounded() -> Self {
        Self::new(CancellationToken::new(), MAX_SPAN)
    }

    /// 阶段边界检查
    pub fn check(&self) -> Result<(), CopilotError> {
        if self.token.is_cancelled() {
            return Err(CopilotError::Cancelled);
        }
        if Instant::now() >= self.deadline {
            return Err(CopilotError::Timeout);
        }
        Ok(())
    }

    /// 在取消与截止时间约束下等待 future
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, CopilotError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(CopilotError::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => Err(CopilotError::Timeout),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let guard = RunGuard::unbounded();
        assert_eq!(guard.run(async { 7 }).await, Ok(7));
        assert!(guard.check().is_ok());
    }

    #[tokio::test]
    async fn test_huge_timeout_does_not_overflow() {
        let guard = RunGuard::new(CancellationToken::new(), Duration::MAX);
        assert!(guard.check().is_ok());
        assert_eq!(guard.run(async { "ok" }).await, Ok("ok"));
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let guard = RunGuard::new(CancellationToken::new(), Duration::from_millis(20));
        let out = guard.run(std::future::pending::<()>()).await;
        assert_eq!(out, Err(CopilotError::Timeout));
        assert_eq!(guard.check(), Err(CopilotError::Timeout));
    }

    #[tokio::test]
    async fn test_run_cancelled() {
        let token = CancellationToken::new();
        let guard = RunGuard::new(token.clone(), Duration::from_secs(60));
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let out = guard.run(std::future::pending::<()>()).await;
        canceller.await.unwrap();
        assert_eq!(out, Err(CopilotError::Cancelled));
    }
}
