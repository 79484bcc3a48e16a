//! 请求事件日志：可回放的多订阅者扇出
//!
//! 事件按序追加到日志（watch 通道承载），每个订阅者持有自己的游标：
//! 先收到已缓冲的事件，再收到实时事件，日志关闭且读尽后结束。
//! 日志保留到请求被回收，迟到的订阅者仍能看到完整序列（含终止事件）。

use futures_util::Stream;
use tokio::sync::watch;

use crate::copilot::RequestEvent;

#[derive(Debug, Default)]
struct LogState {
    events: Vec<RequestEvent>,
    closed: bool,
}

/// 单个请求的事件日志；只有泵任务写入
#[derive(Debug)]
pub struct EventLog {
    tx: watch::Sender<LogState>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LogState::default());
        Self { tx }
    }

    /// 追加事件；日志已关闭时丢弃并返回 false
    pub fn append(&self, event: RequestEvent) -> bool {
        let mut appended = false;
        self.tx.send_if_modified(|state| {
            if state.closed {
                return false;
            }
            state.events.push(event);
            appended = true;
            true
        });
        appended
    }

    /// 关闭日志（只生效一次），订阅者读完剩余事件后结束
    pub fn close(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if state.closed {
                return false;
            }
            state.closed = true;
            true
        })
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 从头订阅
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
            cursor: 0,
            sender_gone: false,
        }
    }
}

/// 订阅游标
#[derive(Debug)]
pub struct EventSubscription {
    rx: watch::Receiver<LogState>,
    cursor: usize,
    sender_gone: bool,
}

impl EventSubscription {
    /// 下一条事件；日志关闭且读尽（或日志被回收）时返回 None
    pub async fn next(&mut self) -> Option<RequestEvent> {
        loop {
            {
                let state = self.rx.borrow_and_update();
                if let Some(event) = state.events.get(self.cursor) {
                    self.cursor += 1;
                    return Some(event.clone());
                }
                if state.closed || self.sender_gone {
                    return None;
                }
            }
            if self.rx.changed().await.is_err() {
                self.sender_gone = true;
            }
        }
    }

    /// 已读取的事件数
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// 转成 futures Stream
    pub fn into_stream(self) -> impl Stream<Item = RequestEvent> + Send + 'static {
        futures_util::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|event| (event, sub))
        })
    }
}
