//! ### English
//! Consumer-side mirror holding the attached texture for one generation.
//!
//! Every attach is matched by a detach; detach resolves the held release
//! callback with the best-known status. A new generation across a commit is a
//! new `TextureConsumer`; dropping the outgoing one resolves its callback.
//!
//! ### 中文
//! 消费者侧镜像，为一代持有已 attach 的纹理。
//!
//! 每次 attach 都由一次 detach 对应；detach 以已知的最佳状态了结所持的
//! release 回调。跨 commit 的新一代即新的 `TextureConsumer`；
//! Drop 退役的一代会了结其回调。

use crate::handles::ConsumerReleaseCallback;
use crate::mailbox::{MailboxDescriptor, SyncPoint};

/// ### English
/// Consumer-side mirror for one generation of the compositor.
/// Holds at most one attached texture; lives on the consumer thread.
///
/// ### 中文
/// 合成器某一代的消费者侧镜像。
/// 最多持有一个已 attach 的纹理；存活于消费者线程。
pub struct TextureConsumer {
    /// ### English
    /// Descriptor of the attached texture, if any.
    ///
    /// ### 中文
    /// 已 attach 纹理的描述符（若有）。
    descriptor: Option<MailboxDescriptor>,
    /// ### English
    /// Release callback for the attached texture, if unresolved.
    ///
    /// ### 中文
    /// 已 attach 纹理的 release 回调（若尚未了结）。
    release: Option<ConsumerReleaseCallback>,
    /// ### English
    /// Last sync point the draw path produced for this texture.
    /// Starts as the producer's publish sync point.
    ///
    /// ### 中文
    /// 绘制路径为该纹理产生的最后一个 sync point。
    /// 初始为生产者发布时的 sync point。
    release_sync_point: SyncPoint,
    /// ### English
    /// Whether this consumer's GPU context failed; reported on detach.
    /// Unreported status defaults to not lost.
    ///
    /// ### 中文
    /// 该消费者的 GPU 上下文是否已失效；在 detach 时回报。
    /// 未回报的状态默认视为未丢失。
    context_lost: bool,
}

impl TextureConsumer {
    /// ### English
    /// Creates an empty consumer.
    ///
    /// ### 中文
    /// 创建空的消费者。
    pub fn new() -> Self {
        Self {
            descriptor: None,
            release: None,
            release_sync_point: 0,
            context_lost: false,
        }
    }

    /// ### English
    /// Attaches the texture delivered by a commit, resolving any previously
    /// attached one first (same non-overlap discipline as publish).
    ///
    /// #### Parameters
    /// - `descriptor`: Descriptor of the delivered texture.
    /// - `callback`: Consumer-side release callback for it.
    ///
    /// ### 中文
    /// attach 一次 commit 交付的纹理，并先了结之前 attach 的纹理
    /// （与发布相同的不重叠纪律）。
    ///
    /// #### 参数
    /// - `descriptor`：所交付纹理的描述符。
    /// - `callback`：其消费者侧 release 回调。
    pub fn attach(&mut self, descriptor: MailboxDescriptor, callback: ConsumerReleaseCallback) {
        debug_assert_eq!(
            descriptor.mailbox,
            *callback.mailbox(),
            "descriptor and callback must name the same mailbox"
        );
        log::debug!("consumer attaching {:?}", descriptor.mailbox);
        self.detach();
        self.descriptor = Some(descriptor);
        self.release = Some(callback);
        self.release_sync_point = descriptor.sync_point;
    }

    /// ### English
    /// Returns the attached descriptor, if any.
    ///
    /// ### 中文
    /// 返回已 attach 的描述符（若有）。
    pub fn descriptor(&self) -> Option<&MailboxDescriptor> {
        self.descriptor.as_ref()
    }

    /// ### English
    /// Records the sync point the draw path inserted after last sampling the
    /// texture; delivered to the producer on detach.
    ///
    /// #### Parameters
    /// - `sync_point`: Consumer-side sync point.
    ///
    /// ### 中文
    /// 记录绘制路径在最后一次采样该纹理后插入的 sync point；
    /// 在 detach 时交付给生产者。
    ///
    /// #### 参数
    /// - `sync_point`：消费者侧 sync point。
    pub fn set_release_sync_point(&mut self, sync_point: SyncPoint) {
        self.release_sync_point = sync_point;
    }

    /// ### English
    /// Marks the consumer's GPU context as failed (or recovered).
    ///
    /// #### Parameters
    /// - `lost`: Context-lost flag.
    ///
    /// ### 中文
    /// 标记消费者的 GPU 上下文已失效（或已恢复）。
    ///
    /// #### 参数
    /// - `lost`：上下文丢失标记。
    pub fn set_context_lost(&mut self, lost: bool) {
        self.context_lost = lost;
    }

    /// ### English
    /// Reports status to the producer now, keeping the reference. Also updates
    /// the status detach will later report, so an explicit report is never
    /// overwritten by the detach default.
    ///
    /// #### Parameters
    /// - `sync_point`: Consumer-side sync point.
    /// - `lost`: Whether the texture contents are invalid.
    ///
    /// ### 中文
    /// 立即向生产者回报状态，但保留引用。同时更新 detach 之后回报的状态，
    /// 因此显式回报不会被 detach 的默认值覆盖。
    ///
    /// #### 参数
    /// - `sync_point`：消费者侧 sync point。
    /// - `lost`：纹理内容是否已失效。
    pub fn return_status(&mut self, sync_point: SyncPoint, lost: bool) {
        self.release_sync_point = sync_point;
        self.context_lost = lost;
        if let Some(release) = &self.release {
            release.post_status(sync_point, lost);
        }
    }

    /// ### English
    /// Resolves the held release callback with the best-known status.
    /// No-op when nothing is attached.
    ///
    /// ### 中文
    /// 以已知的最佳状态了结所持的 release 回调。
    /// 未 attach 时为空操作。
    pub fn detach(&mut self) {
        if let Some(release) = self.release.take() {
            log::debug!(
                "consumer detaching {:?} (sync_point={}, lost={})",
                release.mailbox(),
                self.release_sync_point,
                self.context_lost
            );
            release.run(self.release_sync_point, self.context_lost);
        }
    }

    /// ### English
    /// Detaches and forgets the descriptor (the commit delivered "no texture").
    ///
    /// ### 中文
    /// detach 并忘记描述符（commit 交付了 “无纹理”）。
    pub fn clear(&mut self) {
        self.detach();
        self.descriptor = None;
        self.release_sync_point = 0;
    }
}

impl Default for TextureConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TextureConsumer {
    /// ### English
    /// Teardown of a generation resolves its callback like any other detach.
    ///
    /// ### 中文
    /// 一代的销毁与其他 detach 一样了结其回调。
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::TextureConsumer;
    use crate::holder::MailboxHolder;
    use crate::mailbox::{Mailbox, MailboxDescriptor, SyncPoint};
    use crate::task_queue::TaskQueue;

    type Delivered = Arc<Mutex<Vec<(SyncPoint, bool)>>>;

    fn attach_one(consumer: &mut TextureConsumer, byte: u8, sync_point: SyncPoint) -> Delivered {
        let (_queue, runner) = TaskQueue::new();
        let delivered: Delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        let descriptor = MailboxDescriptor::new(Mailbox::new([byte; 16]), sync_point);
        let reference = MailboxHolder::create(
            descriptor,
            Box::new(move |sync_point, lost| sink.lock().push((sync_point, lost))),
            runner,
        );
        consumer.attach(descriptor, reference.make_consumer_callback());
        drop(reference);
        delivered
    }

    #[test]
    fn detach_defaults_to_publish_sync_point_not_lost() {
        let mut consumer = TextureConsumer::new();
        let delivered = attach_one(&mut consumer, 1, 11);
        consumer.detach();
        assert_eq!(delivered.lock().as_slice(), &[(11, false)]);
    }

    #[test]
    fn draw_path_sync_point_is_reported() {
        let mut consumer = TextureConsumer::new();
        let delivered = attach_one(&mut consumer, 2, 11);
        consumer.set_release_sync_point(99);
        consumer.detach();
        assert_eq!(delivered.lock().as_slice(), &[(99, false)]);
    }

    #[test]
    fn explicit_report_survives_detach() {
        let mut consumer = TextureConsumer::new();
        let delivered = attach_one(&mut consumer, 3, 0);
        consumer.return_status(42, true);
        consumer.detach();
        assert_eq!(delivered.lock().as_slice(), &[(42, true)]);
    }

    #[test]
    fn reattach_resolves_previous_texture_first() {
        let mut consumer = TextureConsumer::new();
        let first = attach_one(&mut consumer, 4, 5);
        assert!(first.lock().is_empty());
        let second = attach_one(&mut consumer, 5, 6);
        assert_eq!(first.lock().as_slice(), &[(5, false)]);
        assert!(second.lock().is_empty());
        drop(consumer);
        assert_eq!(second.lock().as_slice(), &[(6, false)]);
    }

    #[test]
    fn context_loss_is_reported_on_drop() {
        let mut consumer = TextureConsumer::new();
        let delivered = attach_one(&mut consumer, 6, 1);
        consumer.set_context_lost(true);
        drop(consumer);
        assert_eq!(delivered.lock().as_slice(), &[(1, true)]);
    }
}
