//! ### English
//! Producer-side proxy owning the published-texture slot.
//!
//! Publishing replaces the previous holder (install-new-before-drop-old) and
//! marks the slot as needing delivery to the consumer; the carrying commit is
//! only complete once [`TextureProducer::push_to`] has run.
//!
//! ### 中文
//! 持有已发布纹理槽位的生产者侧代理。
//!
//! 发布会替换之前的 holder（先装新、后弃旧），并将槽位标记为待交付给消费者；
//! 承载该变更的 commit 只有在 [`TextureProducer::push_to`] 执行后才算完成。

use crate::consumer::TextureConsumer;
use crate::handles::ProducerReference;
use crate::holder::MailboxHolder;
use crate::mailbox::{Mailbox, MailboxDescriptor, ReleaseCallback};
use crate::task_queue::TaskRunner;

/// ### English
/// Producer-side proxy for one published-texture slot.
/// Lives on the home thread; holds at most one producer reference at a time.
///
/// ### 中文
/// 单个已发布纹理槽位的生产者侧代理。
/// 存活于 home 线程；同一时刻最多持有一个生产者引用。
pub struct TextureProducer {
    /// ### English
    /// Posting handle for the home thread, injected into every holder.
    ///
    /// ### 中文
    /// home 线程的投递句柄，注入到每个 holder。
    home: TaskRunner,
    /// ### English
    /// Producer reference for the currently published texture, if any.
    ///
    /// ### 中文
    /// 当前已发布纹理的生产者引用（若有）。
    reference: Option<ProducerReference>,
    /// ### English
    /// Whether the slot changed since the last delivery to the consumer.
    ///
    /// ### 中文
    /// 自上次交付给消费者以来槽位是否发生变化。
    needs_push: bool,
}

impl TextureProducer {
    /// ### English
    /// Creates an empty producer bound to the given home thread.
    ///
    /// #### Parameters
    /// - `home`: Posting handle for the thread release callbacks must run on.
    ///
    /// ### 中文
    /// 创建绑定到指定 home 线程的空生产者。
    ///
    /// #### 参数
    /// - `home`：release 回调必须运行于的线程的投递句柄。
    pub fn new(home: TaskRunner) -> Self {
        Self {
            home,
            reference: None,
            needs_push: false,
        }
    }

    /// ### English
    /// Publishes a texture, replacing whatever was published before.
    ///
    /// The callback must be present exactly when the descriptor is valid.
    /// The new holder is installed first and the old reference is dropped
    /// after, so the two never overlap the replacement race. A texture
    /// replaced before ever being delivered fires its callback immediately,
    /// since its count never left 1.
    ///
    /// Publishing the mailbox that is already installed still replaces the
    /// holder: a single-shot callback cannot be supplied twice, so every call
    /// carrying a callback is a new publication, and the previously installed
    /// callback still fires exactly once through the normal release path.
    ///
    /// #### Parameters
    /// - `descriptor`: Descriptor for the new texture, or the empty descriptor.
    /// - `callback`: Release callback, iff `descriptor` is valid.
    ///
    /// ### 中文
    /// 发布一个纹理，替换之前发布的内容。
    ///
    /// 回调必须且仅在描述符有效时存在。先安装新 holder、后释放旧引用，
    /// 两者不会在替换竞争中重叠。从未交付即被替换的纹理会立即触发其回调，
    /// 因为其计数从未超过 1。
    ///
    /// 重新发布已安装的 mailbox 同样会替换 holder：一次性回调无法被提供两次，
    /// 因此每次携带回调的调用都是一次新的发布，之前安装的回调仍会经由正常
    /// 释放路径恰好触发一次。
    ///
    /// #### 参数
    /// - `descriptor`：新纹理的描述符，或空描述符。
    /// - `callback`：release 回调，当且仅当 `descriptor` 有效时提供。
    pub fn publish(&mut self, descriptor: MailboxDescriptor, callback: Option<ReleaseCallback>) {
        debug_assert_eq!(
            descriptor.is_valid(),
            callback.is_some(),
            "release callback must be present exactly for a valid mailbox"
        );

        if self.reference.is_none() && !descriptor.is_valid() {
            return;
        }

        log::debug!(
            "publishing {:?} (replacing {:?})",
            descriptor.mailbox,
            self.reference.as_ref().map(|reference| *reference.mailbox())
        );

        /*
        ### English
        Install the new reference before the old one is dropped: there is never
        an instant with zero live references to a texture the consumer might
        still be transitioning away from.

        ### 中文
        先安装新引用、再释放旧引用：对消费者可能仍在撤离的纹理而言，
        不存在任何瞬间出现零个存活引用。
        */
        let new_reference =
            callback.map(|callback| MailboxHolder::create(descriptor, callback, self.home.clone()));
        let old_reference = std::mem::replace(&mut self.reference, new_reference);
        drop(old_reference);
        self.needs_push = true;
    }

    /// ### English
    /// Clears the slot; equivalent to publishing the empty descriptor.
    ///
    /// ### 中文
    /// 清空槽位；等价于发布空描述符。
    pub fn clear(&mut self) {
        self.publish(MailboxDescriptor::empty(), None);
    }

    /// ### English
    /// Returns the currently published mailbox, if any.
    ///
    /// ### 中文
    /// 返回当前已发布的 mailbox（若有）。
    pub fn mailbox(&self) -> Option<&Mailbox> {
        self.reference.as_ref().map(ProducerReference::mailbox)
    }

    /// ### English
    /// Returns whether a changed slot has not yet been delivered.
    /// A commit carrying this producer must not be treated as complete while
    /// this is `true`.
    ///
    /// ### 中文
    /// 返回已变化的槽位是否尚未交付。
    /// 承载该生产者的 commit 在其为 `true` 期间不得视为完成。
    #[inline]
    pub fn needs_push(&self) -> bool {
        self.needs_push
    }

    /// ### English
    /// Delivers the pending slot change to a consumer during the commit
    /// window: attaches the new texture (taking the consumer-side reference)
    /// or clears the consumer, then resets the pending flag. Returns whether
    /// anything was delivered.
    ///
    /// #### Parameters
    /// - `consumer`: The consumer generation receiving this commit.
    ///
    /// ### 中文
    /// 在 commit 窗口内将待交付的槽位变化交给消费者：attach 新纹理
    /// （取出消费者侧引用）或清空消费者，然后重置待交付标记。返回是否发生交付。
    ///
    /// #### 参数
    /// - `consumer`：接收本次 commit 的消费者代。
    pub fn push_to(&mut self, consumer: &mut TextureConsumer) -> bool {
        if !self.needs_push {
            return false;
        }

        match &self.reference {
            Some(reference) => {
                consumer.attach(reference.descriptor(), reference.make_consumer_callback());
            }
            None => consumer.clear(),
        }
        self.needs_push = false;
        true
    }
}

impl Drop for TextureProducer {
    /// ### English
    /// Drops only the producer's own reference; an outstanding consumer
    /// callback keeps the texture alive until it is released too.
    ///
    /// ### 中文
    /// 仅释放生产者自身的引用；尚未释放的消费者回调会继续保活该纹理。
    fn drop(&mut self) {
        self.reference = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::TextureProducer;
    use crate::mailbox::{Mailbox, MailboxDescriptor, ReleaseCallback};
    use crate::task_queue::TaskQueue;

    fn counting_callback() -> (ReleaseCallback, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let sink = fired.clone();
        (
            Box::new(move |_, _| {
                sink.fetch_add(1, Ordering::Relaxed);
            }),
            fired,
        )
    }

    #[test]
    fn replace_before_delivery_fires_immediately() {
        let (_queue, runner) = TaskQueue::new();
        let mut producer = TextureProducer::new(runner);
        let (cb1, fired1) = counting_callback();
        let (cb2, fired2) = counting_callback();
        producer.publish(MailboxDescriptor::new(Mailbox::new([1; 16]), 0), Some(cb1));
        producer.publish(MailboxDescriptor::new(Mailbox::new([2; 16]), 0), Some(cb2));
        assert_eq!(fired1.load(Ordering::Relaxed), 1);
        assert_eq!(fired2.load(Ordering::Relaxed), 0);
        drop(producer);
        assert_eq!(fired1.load(Ordering::Relaxed), 1);
        assert_eq!(fired2.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn republish_same_mailbox_fires_both_callbacks_once() {
        let (_queue, runner) = TaskQueue::new();
        let mut producer = TextureProducer::new(runner);
        let (cb1, fired1) = counting_callback();
        let (cb2, fired2) = counting_callback();
        let descriptor = MailboxDescriptor::new(Mailbox::new([3; 16]), 0);
        producer.publish(descriptor, Some(cb1));
        assert!(producer.needs_push());
        producer.publish(descriptor, Some(cb2));
        /*
        ### English
        The mailbox name is unchanged but the second publish is a full
        replacement: the first callback, never delivered anywhere, is released
        immediately; the second stays pending until the producer lets go.

        ### 中文
        mailbox 名称未变，但第二次发布是一次完整替换：从未被交付的第一个回调
        立即释放；第二个保持待定，直到生产者放手。
        */
        assert_eq!(fired1.load(Ordering::Relaxed), 1);
        assert_eq!(fired2.load(Ordering::Relaxed), 0);
        drop(producer);
        assert_eq!(fired1.load(Ordering::Relaxed), 1);
        assert_eq!(fired2.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn clear_on_empty_slot_does_not_mark_push() {
        let (_queue, runner) = TaskQueue::new();
        let mut producer = TextureProducer::new(runner);
        producer.clear();
        assert!(!producer.needs_push());
        assert!(producer.mailbox().is_none());
    }

    #[test]
    fn publish_while_detached_still_fires_once() {
        let (_queue, runner) = TaskQueue::new();
        let mut producer = TextureProducer::new(runner);
        let (cb, fired) = counting_callback();
        producer.publish(MailboxDescriptor::new(Mailbox::new([4; 16]), 0), Some(cb));
        producer.clear();
        assert_eq!(fired.load(Ordering::Relaxed), 1);
        assert!(producer.needs_push());
    }
}
