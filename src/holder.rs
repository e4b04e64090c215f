//! ### English
//! Shared lifecycle manager for one published mailbox texture.
//!
//! The holder owns the protocol reference count and the single-shot release
//! callback. The last reference to drop fires the callback exactly once, on the
//! home thread, with the last-reported `(sync_point, lost)` status.
//!
//! ### 中文
//! 单个已发布 mailbox 纹理的共享生命周期管理器。
//!
//! holder 持有协议引用计数与一次性 release 回调。最后一个被释放的引用会在 home
//! 线程以最后一次回报的 `(sync_point, lost)` 状态恰好触发一次回调。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::handles::ProducerReference;
use crate::mailbox::{Mailbox, MailboxDescriptor, ReleaseCallback, SyncPoint};
use crate::task_queue::TaskRunner;

/// ### English
/// Release callback slot. The move to `Fired` happens only at the reference
/// count's unique 1→0 crossing, so "invoke" and "mark invoked" cannot race.
///
/// ### 中文
/// release 回调槽位。向 `Fired` 的迁移只发生在引用计数唯一的 1→0 过零点，
/// 因此 “调用” 与 “标记已调用” 不会竞争。
enum CallbackSlot {
    /// ### English
    /// Callback installed and not yet delivered.
    ///
    /// ### 中文
    /// 回调已安装且尚未投递。
    Pending(ReleaseCallback),
    /// ### English
    /// Callback already taken for delivery; the payload is cleared.
    ///
    /// ### 中文
    /// 回调已被取走投递；载荷已清空。
    Fired,
}

/// ### English
/// Mutable holder state guarded by one lock: the reported status plus the
/// callback slot.
///
/// ### 中文
/// 由同一把锁保护的 holder 可变状态：已回报状态与回调槽位。
struct HolderStatus {
    /// ### English
    /// Last reported sync point (`0` = absent).
    ///
    /// ### 中文
    /// 最后回报的 sync point（`0` = 缺省）。
    sync_point: SyncPoint,
    /// ### English
    /// Last reported lost flag.
    ///
    /// ### 中文
    /// 最后回报的 lost 标记。
    lost: bool,
    /// ### English
    /// Release callback slot.
    ///
    /// ### 中文
    /// release 回调槽位。
    callback: CallbackSlot,
}

/// ### English
/// Thread-safe lifecycle manager for one `(descriptor, release callback)` pair.
///
/// Shared by at most one producer reference and one consumer callback at a
/// time (replacement can transiently overlap a third). Alive while the
/// protocol reference count is above zero.
///
/// ### 中文
/// 单个 `(描述符, release 回调)` 对的线程安全生命周期管理器。
///
/// 同一时刻最多被一个生产者引用与一个消费者回调共享（替换过程可能短暂出现第三个）。
/// 在协议引用计数大于零期间存活。
pub struct MailboxHolder {
    /// ### English
    /// Published mailbox name (immutable after construction).
    ///
    /// ### 中文
    /// 已发布的 mailbox 名称（构造后不可变）。
    mailbox: Mailbox,
    /// ### English
    /// Reported status and callback slot, under one lock.
    ///
    /// ### 中文
    /// 已回报状态与回调槽位，由同一把锁保护。
    status: Mutex<HolderStatus>,
    /// ### English
    /// Protocol reference count. Incremented only through a live reference;
    /// the decrement that returns 1 owns the delivery.
    ///
    /// ### 中文
    /// 协议引用计数。只能经由存活引用递增；fetch_sub 返回 1 的那次递减拥有投递权。
    refs: AtomicUsize,
    /// ### English
    /// Posting handle for the thread the callback must run on.
    ///
    /// ### 中文
    /// 回调必须运行于的线程的投递句柄。
    home: TaskRunner,
}

impl MailboxHolder {
    /// ### English
    /// Creates a holder with one reference and returns that reference.
    ///
    /// #### Parameters
    /// - `descriptor`: Valid descriptor for the published texture.
    /// - `callback`: Single-shot release callback for the texture.
    /// - `home`: Posting handle for the thread `callback` must run on.
    ///
    /// ### 中文
    /// 创建带一个引用的 holder，并返回该引用。
    ///
    /// #### 参数
    /// - `descriptor`：所发布纹理的有效描述符。
    /// - `callback`：该纹理的一次性 release 回调。
    /// - `home`：`callback` 必须运行于的线程的投递句柄。
    pub fn create(
        descriptor: MailboxDescriptor,
        callback: ReleaseCallback,
        home: TaskRunner,
    ) -> ProducerReference {
        debug_assert!(descriptor.is_valid(), "cannot hold the empty mailbox");
        log::trace!("holder created for {:?}", descriptor.mailbox);
        let holder = Arc::new(Self {
            mailbox: descriptor.mailbox,
            status: Mutex::new(HolderStatus {
                sync_point: descriptor.sync_point,
                lost: descriptor.lost,
                callback: CallbackSlot::Pending(callback),
            }),
            refs: AtomicUsize::new(1),
            home,
        });
        ProducerReference::new(holder)
    }

    /// ### English
    /// Returns the published mailbox name.
    ///
    /// ### 中文
    /// 返回已发布的 mailbox 名称。
    #[inline]
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// ### English
    /// Snapshots the descriptor with its current reported status.
    ///
    /// ### 中文
    /// 以当前回报状态快照描述符。
    pub fn descriptor(&self) -> MailboxDescriptor {
        let status = self.status.lock();
        MailboxDescriptor {
            mailbox: self.mailbox,
            sync_point: status.sync_point,
            lost: status.lost,
        }
    }

    /// ### English
    /// Records the consumer-reported status; the last caller wins.
    /// Callable from any thread, any number of times; a benign no-op once the
    /// callback has been delivered.
    ///
    /// #### Parameters
    /// - `sync_point`: Last point in the consumer's command stream that touched
    ///   the texture.
    /// - `lost`: Whether the consumer's GPU context failed.
    ///
    /// ### 中文
    /// 记录消费者回报的状态；以最后一次调用为准。
    /// 可在任意线程调用任意次；回调投递之后为无害空操作。
    ///
    /// #### 参数
    /// - `sync_point`：消费者命令流中最后触及该纹理的位置。
    /// - `lost`：消费者的 GPU 上下文是否已失效。
    pub(crate) fn return_status(&self, sync_point: SyncPoint, lost: bool) {
        let mut status = self.status.lock();
        if matches!(status.callback, CallbackSlot::Fired) {
            return;
        }
        status.sync_point = sync_point;
        status.lost = lost;
    }

    /// ### English
    /// Takes one more reference. Only reachable through an already-live
    /// reference, so the count is at least 1 here.
    ///
    /// ### 中文
    /// 再取一个引用。只能经由仍存活的引用到达此处，因此计数此时至少为 1。
    pub(crate) fn add_reference(this: &Arc<Self>) -> Arc<Self> {
        let prev = this.refs.fetch_add(1, Ordering::Relaxed);
        debug_assert!(prev >= 1, "added a reference to a released holder");
        log::trace!("holder {:?} refs {} -> {}", this.mailbox, prev, prev + 1);
        Arc::clone(this)
    }

    /// ### English
    /// Releases one reference. The decrement observing the 1→0 crossing takes
    /// the callback and delivers it: inline when called on the home thread,
    /// otherwise by posting a task. Never blocks; never double-fires.
    ///
    /// ### 中文
    /// 释放一个引用。观测到 1→0 过零的那次递减取走回调并投递：在 home 线程调用
    /// 则就地执行，否则投递任务。永不阻塞；永不重复触发。
    pub(crate) fn release_reference(this: &Arc<Self>) {
        let prev = this.refs.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev >= 1, "mailbox holder reference count underflow");
        log::trace!(
            "holder {:?} refs {} -> {}",
            this.mailbox,
            prev,
            prev.saturating_sub(1)
        );
        if prev != 1 {
            return;
        }

        /*
        ### English
        This decrementer is the unique observer of the zero crossing: take the
        callback and the status in one locked step so a late return_status can
        no longer change what gets delivered.

        ### 中文
        本次递减是过零点的唯一观测者：在同一次持锁中取走回调与状态，
        迟到的 return_status 便无法再改变投递内容。
        */
        let Some((callback, sync_point, lost)) = this.take_payload() else {
            debug_assert!(false, "release callback delivered twice");
            return;
        };

        if this.home.is_home() {
            log::trace!("holder {:?} released inline on home thread", this.mailbox);
            callback(sync_point, lost);
        } else {
            log::trace!("holder {:?} release posted to home thread", this.mailbox);
            if !this
                .home
                .post(Box::new(move || callback(sync_point, lost)))
            {
                log::warn!(
                    "release for {:?} lost: home queue destroyed with the reference outstanding",
                    this.mailbox
                );
            }
        }
    }

    /// ### English
    /// Moves the callback slot to `Fired` and returns the payload with the
    /// status captured under the same lock.
    ///
    /// ### 中文
    /// 将回调槽位迁移为 `Fired`，并返回与状态同锁捕获的载荷。
    fn take_payload(&self) -> Option<(ReleaseCallback, SyncPoint, bool)> {
        let mut status = self.status.lock();
        match std::mem::replace(&mut status.callback, CallbackSlot::Fired) {
            CallbackSlot::Pending(callback) => Some((callback, status.sync_point, status.lost)),
            CallbackSlot::Fired => None,
        }
    }
}
