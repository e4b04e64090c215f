//! ### English
//! Mailbox descriptor value types shared between the producer and consumer threads.
//!
//! A mailbox names a GPU-resident texture across contexts; the sync point orders
//! dependent operations in the GPU command stream.
//!
//! ### 中文
//! 生产者线程与消费者线程之间共享的 mailbox 描述符值类型。
//!
//! mailbox 用于跨上下文命名一个 GPU 纹理；sync point 用于在 GPU 命令流中
//! 排序相互依赖的操作。

use std::fmt;

/// ### English
/// Byte length of a mailbox name.
///
/// ### 中文
/// mailbox 名称的字节长度。
pub const MAILBOX_NAME_SIZE: usize = 16;

/// ### English
/// Opaque cross-context identifier for a GPU-resident texture.
/// The all-zero name is reserved for "no resource".
///
/// ### 中文
/// GPU 纹理的跨上下文不透明标识符。
/// 全零名称保留给 “无资源”。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mailbox {
    /// ### English
    /// Raw mailbox name bytes.
    ///
    /// ### 中文
    /// mailbox 名称的原始字节。
    name: [u8; MAILBOX_NAME_SIZE],
}

impl Mailbox {
    /// ### English
    /// The reserved "no resource" mailbox.
    ///
    /// ### 中文
    /// 保留的 “无资源” mailbox。
    pub const ZERO: Mailbox = Mailbox {
        name: [0; MAILBOX_NAME_SIZE],
    };

    /// ### English
    /// Wraps a raw mailbox name.
    ///
    /// ### 中文
    /// 包装一个原始 mailbox 名称。
    #[inline]
    pub const fn new(name: [u8; MAILBOX_NAME_SIZE]) -> Self {
        Self { name }
    }

    /// ### English
    /// Returns the raw mailbox name bytes.
    ///
    /// ### 中文
    /// 返回 mailbox 名称的原始字节。
    #[inline]
    pub const fn name(&self) -> &[u8; MAILBOX_NAME_SIZE] {
        &self.name
    }

    /// ### English
    /// Returns whether this mailbox names a resource (non-zero name).
    ///
    /// ### 中文
    /// 返回该 mailbox 是否指向一个资源（名称非全零）。
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.name.iter().any(|byte| *byte != 0)
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mailbox(")?;
        for byte in &self.name {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// ### English
/// Monotonic marker in a GPU command stream (`0` = absent).
///
/// ### 中文
/// GPU 命令流中的单调序标记（`0` = 缺省）。
pub type SyncPoint = u64;

/// ### English
/// Descriptor for one published texture: mailbox name plus mutable status.
///
/// `sync_point` and `lost` are the only mutable fields after publication, and
/// they are only updated through the holder's return-status path.
///
/// ### 中文
/// 一次发布的纹理描述符：mailbox 名称加可变状态。
///
/// 发布后仅 `sync_point` 与 `lost` 可变，且只能通过 holder 的回报状态路径更新。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MailboxDescriptor {
    /// ### English
    /// Cross-context texture name.
    ///
    /// ### 中文
    /// 跨上下文的纹理名称。
    pub mailbox: Mailbox,
    /// ### English
    /// Sync point the producer inserted after writing the texture (`0` = none).
    ///
    /// ### 中文
    /// 生产者写入纹理后插入的 sync point（`0` = 无）。
    pub sync_point: SyncPoint,
    /// ### English
    /// Whether the backing GPU context was lost (contents invalid).
    ///
    /// ### 中文
    /// 其 GPU 上下文是否已丢失（内容失效）。
    pub lost: bool,
}

impl MailboxDescriptor {
    /// ### English
    /// Creates a descriptor for a valid mailbox.
    ///
    /// #### Parameters
    /// - `mailbox`: Non-zero mailbox name.
    /// - `sync_point`: Producer-side sync point, or 0 if none.
    ///
    /// ### 中文
    /// 为有效 mailbox 创建描述符。
    ///
    /// #### 参数
    /// - `mailbox`：非全零的 mailbox 名称。
    /// - `sync_point`：生产者侧 sync point，无则为 0。
    #[inline]
    pub fn new(mailbox: Mailbox, sync_point: SyncPoint) -> Self {
        Self {
            mailbox,
            sync_point,
            lost: false,
        }
    }

    /// ### English
    /// The "no resource" descriptor.
    ///
    /// ### 中文
    /// “无资源” 描述符。
    #[inline]
    pub const fn empty() -> Self {
        Self {
            mailbox: Mailbox::ZERO,
            sync_point: 0,
            lost: false,
        }
    }

    /// ### English
    /// Returns whether this descriptor denotes a resource.
    ///
    /// ### 中文
    /// 返回该描述符是否指向一个资源。
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.mailbox.is_valid()
    }
}

/// ### English
/// Single-shot release callback, owned by whoever minted the descriptor.
/// Invoked exactly once with the final `(sync_point, lost)` on the home thread.
///
/// ### 中文
/// 一次性 release 回调，由铸造描述符的一方持有。
/// 在 home 线程以最终 `(sync_point, lost)` 恰好调用一次。
pub type ReleaseCallback = Box<dyn FnOnce(SyncPoint, bool) + Send + 'static>;
