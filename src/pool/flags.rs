use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use super::range::AddressRange;
use crate::address::AddressFamily;

/// `AddressPool::acquire`に指定する制約の集合.
///
/// 複数のフラグは`|`で結合でき、その場合には全ての制約を満たすものが選択される(論理積).
///
/// # Examples
///
/// ```
/// use addrpool::pool::AcquireFlags;
///
/// let flags = AcquireFlags::IPV6 | AcquireFlags::EVEN_PORT;
/// assert!(flags.contains(AcquireFlags::IPV6));
/// assert!(flags.contains(AcquireFlags::EVEN_PORT));
/// assert!(!flags.contains(AcquireFlags::MULTICAST));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AcquireFlags(u8);
impl AcquireFlags {
    /// 制約無し.
    ///
    /// 全てのアドレス範囲が登録順に探索対象となる.
    pub const NONE: AcquireFlags = AcquireFlags(0);

    /// IPv4のアドレス範囲のみを対象とする.
    pub const IPV4: AcquireFlags = AcquireFlags(1 << 0);

    /// IPv6のアドレス範囲のみを対象とする.
    pub const IPV6: AcquireFlags = AcquireFlags(1 << 1);

    /// 先頭ポートの番号を偶数にする.
    ///
    /// RTPとRTCPのポートの組を割り当てる際に使われる.
    pub const EVEN_PORT: AcquireFlags = AcquireFlags(1 << 2);

    /// マルチキャストアドレスのみからなる範囲を対象とする.
    pub const MULTICAST: AcquireFlags = AcquireFlags(1 << 3);

    /// ユニキャストアドレスのみからなる範囲を対象とする.
    pub const UNICAST: AcquireFlags = AcquireFlags(1 << 4);

    /// `other`の全てのフラグが含まれているかどうか.
    pub fn contains(self, other: AcquireFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// フラグが一つも指定されていないかどうか.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `range`がアドレスに関する制約を満たしているかどうか.
    pub(crate) fn matches(self, range: &AddressRange) -> bool {
        if self.contains(Self::IPV4) && range.family() != AddressFamily::Ipv4 {
            return false;
        }
        if self.contains(Self::IPV6) && range.family() != AddressFamily::Ipv6 {
            return false;
        }
        if self.contains(Self::MULTICAST) && !range.is_multicast() {
            return false;
        }
        if self.contains(Self::UNICAST) && !range.is_unicast() {
            return false;
        }
        true
    }
}
impl BitOr for AcquireFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        AcquireFlags(self.0 | rhs.0)
    }
}
impl BitOrAssign for AcquireFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
impl fmt::Debug for AcquireFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const NAMES: [(AcquireFlags, &str); 5] = [
            (AcquireFlags::IPV4, "IPV4"),
            (AcquireFlags::IPV6, "IPV6"),
            (AcquireFlags::EVEN_PORT, "EVEN_PORT"),
            (AcquireFlags::MULTICAST, "MULTICAST"),
            (AcquireFlags::UNICAST, "UNICAST"),
        ];
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let mut first = true;
        for &(flag, name) in NAMES.iter() {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}
