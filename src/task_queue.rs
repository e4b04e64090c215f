//! ### English
//! Home-thread task dispatch used to deliver release callbacks.
//!
//! The holder is handed a [`TaskRunner`] at construction time instead of looking
//! up an ambient "current thread" runner, so the home thread is always explicit.
//!
//! ### 中文
//! 用于投递 release 回调的 home 线程任务分发。
//!
//! holder 在构造时被注入 [`TaskRunner`]，而不是查找环境中的 “当前线程” runner，
//! 因此 home 线程始终是显式的。

use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;

/// ### English
/// Boxed task executed on the home thread.
///
/// ### 中文
/// 在 home 线程执行的 boxed 任务。
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// ### English
/// Cloneable posting handle into one home thread's task queue.
/// Posting never blocks the calling thread.
///
/// ### 中文
/// 指向某个 home 线程任务队列的可克隆投递句柄。
/// 投递永不阻塞调用线程。
#[derive(Clone)]
pub struct TaskRunner {
    /// ### English
    /// Sender into the home thread's task channel.
    ///
    /// ### 中文
    /// 指向 home 线程任务 channel 的发送端。
    tx: channel::Sender<Task>,
    /// ### English
    /// Identity of the home thread, captured when the queue was created.
    ///
    /// ### 中文
    /// home 线程的身份标识，在创建队列时捕获。
    home: thread::ThreadId,
}

impl TaskRunner {
    /// ### English
    /// Returns whether the calling thread is the home thread.
    ///
    /// ### 中文
    /// 返回调用线程是否为 home 线程。
    #[inline]
    pub fn is_home(&self) -> bool {
        thread::current().id() == self.home
    }

    /// ### English
    /// Enqueues a task for the home thread. Returns `false` if the queue has
    /// already been torn down; tearing the queue down with work still being
    /// posted is a caller contract violation, so the failure is also
    /// debug-asserted.
    ///
    /// #### Parameters
    /// - `task`: Task to run on the home thread.
    ///
    /// ### 中文
    /// 为 home 线程入队一个任务。若队列已被销毁则返回 `false`；
    /// 在仍有投递发生时销毁队列属于调用方契约违规，因此该失败同时会触发 debug 断言。
    ///
    /// #### 参数
    /// - `task`：要在 home 线程执行的任务。
    pub fn post(&self, task: Task) -> bool {
        if self.tx.send(task).is_err() {
            log::warn!("home task queue is gone; dropping posted task");
            debug_assert!(false, "posted a task after the home task queue was destroyed");
            return false;
        }
        true
    }
}

/// ### English
/// Receiving half of the home thread's task queue.
/// Owned and drained by the home thread itself.
///
/// ### 中文
/// home 线程任务队列的接收端。
/// 由 home 线程自身持有并 drain。
pub struct TaskQueue {
    /// ### English
    /// Receiver for posted tasks.
    ///
    /// ### 中文
    /// 已投递任务的接收端。
    rx: channel::Receiver<Task>,
}

impl TaskQueue {
    /// ### English
    /// Creates a task queue bound to the calling thread (the home thread) and
    /// returns the posting handle for other threads.
    ///
    /// ### 中文
    /// 创建绑定到调用线程（home 线程）的任务队列，并返回供其他线程使用的投递句柄。
    pub fn new() -> (TaskQueue, TaskRunner) {
        let (tx, rx) = channel::unbounded();
        (
            TaskQueue { rx },
            TaskRunner {
                tx,
                home: thread::current().id(),
            },
        )
    }

    /// ### English
    /// Runs every task queued so far; returns how many ran.
    ///
    /// ### 中文
    /// 执行目前已入队的所有任务；返回执行数量。
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// ### English
    /// Waits up to `timeout` for one task and runs it. Returns whether a task ran.
    ///
    /// ### 中文
    /// 最多等待 `timeout` 接收并执行一个任务。返回是否执行了任务。
    pub fn run_one(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }
}
