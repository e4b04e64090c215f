//! ### English
//! RAII references into a [`MailboxHolder`].
//!
//! The producer reference is the single-owner handle held by the publishing
//! side; the consumer release callback is the second reference handed across
//! the commit boundary. Dropping either releases its reference; releasing the
//! last one delivers the release callback on the home thread.
//!
//! ### 中文
//! 指向 [`MailboxHolder`] 的 RAII 引用。
//!
//! 生产者引用是发布侧持有的单一所有权句柄；消费者 release 回调是跨 commit
//! 边界交付的第二个引用。两者 Drop 时各自释放引用；最后一个释放时在 home
//! 线程投递 release 回调。

use std::sync::Arc;

use crate::holder::MailboxHolder;
use crate::mailbox::{Mailbox, MailboxDescriptor, SyncPoint};

/// ### English
/// Exclusive producer-side reference into a holder. Non-cloneable; movable.
/// Dropping it releases the producer's reference.
///
/// ### 中文
/// 生产者侧对 holder 的独占引用。不可克隆、可移动。
/// Drop 时释放生产者的引用。
pub struct ProducerReference {
    /// ### English
    /// Shared holder kept alive by this reference.
    ///
    /// ### 中文
    /// 由该引用保活的共享 holder。
    holder: Arc<MailboxHolder>,
}

impl ProducerReference {
    pub(crate) fn new(holder: Arc<MailboxHolder>) -> Self {
        Self { holder }
    }

    pub(crate) fn holder(&self) -> &Arc<MailboxHolder> {
        &self.holder
    }

    /// ### English
    /// Returns the published mailbox name.
    ///
    /// ### 中文
    /// 返回已发布的 mailbox 名称。
    #[inline]
    pub fn mailbox(&self) -> &Mailbox {
        self.holder.mailbox()
    }

    /// ### English
    /// Snapshots the descriptor with its current reported status.
    ///
    /// ### 中文
    /// 以当前回报状态快照描述符。
    #[inline]
    pub fn descriptor(&self) -> MailboxDescriptor {
        self.holder.descriptor()
    }

    /// ### English
    /// Takes the consumer-side reference for one commit. Reachable only while
    /// this producer reference is live, so the holder cannot already be
    /// released here.
    ///
    /// ### 中文
    /// 为一次 commit 取出消费者侧引用。仅在本生产者引用存活期间可达，
    /// 因此此处的 holder 不可能已被释放。
    pub fn make_consumer_callback(&self) -> ConsumerReleaseCallback {
        ConsumerReleaseCallback {
            holder: MailboxHolder::add_reference(&self.holder),
        }
    }
}

impl Drop for ProducerReference {
    /// ### English
    /// Releases the producer's reference; the release callback fires once the
    /// consumer side has released too.
    ///
    /// ### 中文
    /// 释放生产者的引用；待消费者侧也释放后，release 回调才会触发。
    fn drop(&mut self) {
        MailboxHolder::release_reference(&self.holder);
    }
}

/// ### English
/// Consumer-side reference packaged as a single-shot callable.
///
/// [`run`](Self::run) reports final status and releases in one step and
/// consumes the handle, so a double release does not compile. Dropping the
/// handle without running it releases with the status unchanged.
///
/// ### 中文
/// 打包为一次性可调用对象的消费者侧引用。
///
/// [`run`](Self::run) 一步完成状态回报与引用释放，并按值消费句柄，
/// 因此重复释放无法通过编译。不调用直接 Drop 则以原状态释放。
pub struct ConsumerReleaseCallback {
    /// ### English
    /// Shared holder kept alive by this reference.
    ///
    /// ### 中文
    /// 由该引用保活的共享 holder。
    holder: Arc<MailboxHolder>,
}

impl ConsumerReleaseCallback {
    /// ### English
    /// Returns the mailbox this callback releases.
    ///
    /// ### 中文
    /// 返回该回调负责释放的 mailbox。
    #[inline]
    pub fn mailbox(&self) -> &Mailbox {
        self.holder.mailbox()
    }

    /// ### English
    /// Reports status without releasing the reference; the last report wins.
    /// Callable from any thread.
    ///
    /// #### Parameters
    /// - `sync_point`: Last point in the consumer's command stream that touched
    ///   the texture.
    /// - `lost`: Whether the consumer's GPU context failed.
    ///
    /// ### 中文
    /// 仅回报状态而不释放引用；以最后一次回报为准。可在任意线程调用。
    ///
    /// #### 参数
    /// - `sync_point`：消费者命令流中最后触及该纹理的位置。
    /// - `lost`：消费者的 GPU 上下文是否已失效。
    pub fn post_status(&self, sync_point: SyncPoint, lost: bool) {
        self.holder.return_status(sync_point, lost);
    }

    /// ### English
    /// Reports final status and releases the consumer reference in one step.
    ///
    /// #### Parameters
    /// - `sync_point`: Last point in the consumer's command stream that touched
    ///   the texture.
    /// - `lost`: Whether the consumer's GPU context failed.
    ///
    /// ### 中文
    /// 一步完成最终状态回报与消费者引用释放。
    ///
    /// #### 参数
    /// - `sync_point`：消费者命令流中最后触及该纹理的位置。
    /// - `lost`：消费者的 GPU 上下文是否已失效。
    pub fn run(self, sync_point: SyncPoint, lost: bool) {
        self.holder.return_status(sync_point, lost);
        /*
        ### English
        The reference itself is released by Drop when `self` goes out of scope;
        reporting first means the zero crossing observes this status.

        ### 中文
        引用本身在 `self` 离开作用域时由 Drop 释放；先回报可保证过零点
        观测到本次状态。
        */
    }
}

impl Drop for ConsumerReleaseCallback {
    /// ### English
    /// Releases the consumer's reference without touching the reported status.
    ///
    /// ### 中文
    /// 释放消费者的引用，不改动已回报状态。
    fn drop(&mut self) {
        MailboxHolder::release_reference(&self.holder);
    }
}
