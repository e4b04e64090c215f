//! ### English
//! `texture_mailbox` crate root.
//!
//! Cross-thread handoff of mailbox-addressed GPU textures between a producer
//! thread and a consumer thread: publish a texture, hand it off across a
//! commit, and get the release callback back exactly once, with final
//! `(sync_point, lost)` status, on the home thread — without blocking the
//! publisher and without data races.
//!
//! ### 中文
//! `texture_mailbox` 的 crate 根。
//!
//! 在生产者线程与消费者线程之间跨线程交接以 mailbox 寻址的 GPU 纹理：
//! 发布纹理、跨 commit 交接，并保证 release 回调以最终 `(sync_point, lost)`
//! 状态在 home 线程恰好回到生产者一次 —— 不阻塞发布方、无数据竞争。

pub mod consumer;
pub mod handles;
pub mod holder;
pub mod mailbox;
pub mod producer;
pub mod task_queue;

pub use consumer::TextureConsumer;
pub use handles::{ConsumerReleaseCallback, ProducerReference};
pub use holder::MailboxHolder;
pub use mailbox::{MAILBOX_NAME_SIZE, Mailbox, MailboxDescriptor, ReleaseCallback, SyncPoint};
pub use producer::TextureProducer;
pub use task_queue::{Task, TaskQueue, TaskRunner};
