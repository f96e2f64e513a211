//! アドレスファミリー(IPv4/IPv6)を考慮したアドレスの表現と演算.
//!
//! 範囲の探索や比較を単純な整数演算で行えるように、
//! 全てのアドレスは「ファミリー」と「128bit幅の整数値」の組として保持される.
//! IPv4アドレスの場合には、整数値の下位32bitのみが使われる.
use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use trackable::error::ErrorKindExt;

use crate::{Error, ErrorKind, Result};

/// アドレスファミリー.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4 (32bit).
    Ipv4,

    /// IPv6 (128bit).
    Ipv6,
}
impl AddressFamily {
    /// このファミリーのアドレスが取り得る整数値の最大値を返す.
    pub fn max_value(self) -> u128 {
        match self {
            AddressFamily::Ipv4 => u128::from(u32::max_value()),
            AddressFamily::Ipv6 => u128::max_value(),
        }
    }
}
impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AddressFamily::Ipv4 => write!(f, "IPv4"),
            AddressFamily::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// 順序付けが可能な整数形式のIPアドレス.
///
/// 大小比較は同一ファミリー内でのみ定義されるため、`PartialOrd`は実装せずに、
/// 代わりに[`Address::compare`]を提供している.
///
/// [`Address::compare`]: ./struct.Address.html#method.compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    family: AddressFamily,
    value: u128,
}
impl Address {
    /// テキスト表現からアドレスを生成する.
    ///
    /// `s.parse::<Address>()`と等価.
    ///
    /// # Errors
    ///
    /// `s`がIPv4のドット区切り表記でもIPv6のコロン区切り表記でもない場合には、
    /// 種類が`ErrorKind::InvalidAddress`のエラーが返される.
    ///
    /// # Examples
    ///
    /// ```
    /// use addrpool::ErrorKind;
    /// use addrpool::address::{Address, AddressFamily};
    ///
    /// let a = Address::parse("233.252.0.1").unwrap();
    /// assert_eq!(a.family(), AddressFamily::Ipv4);
    /// assert_eq!(a.as_u128(), 0xE9FC_0001);
    ///
    /// assert_eq!(Address::parse("233.252.0.1.1").err().map(|e| *e.kind()),
    ///            Some(ErrorKind::InvalidAddress));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        track!(s.parse())
    }

    /// アドレスファミリーを返す.
    pub fn family(self) -> AddressFamily {
        self.family
    }

    /// アドレスの整数値を返す.
    pub fn as_u128(self) -> u128 {
        self.value
    }

    /// 同一ファミリーのアドレス同士の大小を比較する.
    ///
    /// # Errors
    ///
    /// ファミリーが異なる場合には、種類が`ErrorKind::FamilyMismatch`のエラーが返される.
    pub fn compare(self, other: Address) -> Result<Ordering> {
        track_assert_eq!(self.family, other.family, ErrorKind::FamilyMismatch);
        Ok(self.value.cmp(&other.value))
    }

    /// 次のアドレスを返す.
    ///
    /// # Panics
    ///
    /// ファミリーのビット幅を超える場合には、現在のスレッドがパニックする.
    pub fn successor(self) -> Self {
        self.nth(1).expect("address overflow")
    }

    /// `offset`個後ろのアドレスを返す.
    ///
    /// ファミリーのビット幅を超える場合には`None`が返される.
    pub fn nth(self, offset: u128) -> Option<Self> {
        self.value
            .checked_add(offset)
            .filter(|&v| v <= self.family.max_value())
            .map(|value| Address {
                family: self.family,
                value,
            })
    }

    /// `base`からの距離を返す.
    ///
    /// # Panics
    ///
    /// ファミリーが異なる場合、あるいは`self`が`base`よりも前に位置する場合には、
    /// 現在のスレッドがパニックする.
    pub fn offset_from(self, base: Address) -> u128 {
        assert_eq!(self.family, base.family);
        self.value
            .checked_sub(base.value)
            .expect("address underflow")
    }

    /// マルチキャストアドレスかどうかを判定する.
    pub fn is_multicast(self) -> bool {
        self.to_ip_addr().is_multicast()
    }

    /// `std::net::IpAddr`に変換する.
    pub fn to_ip_addr(self) -> IpAddr {
        match self.family {
            AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::from(self.value as u32)),
            AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::from(self.value)),
        }
    }
}
impl From<IpAddr> for Address {
    fn from(f: IpAddr) -> Self {
        match f {
            IpAddr::V4(a) => Address {
                family: AddressFamily::Ipv4,
                value: u128::from(u32::from(a)),
            },
            IpAddr::V6(a) => Address {
                family: AddressFamily::Ipv6,
                value: u128::from(a),
            },
        }
    }
}
impl From<Address> for IpAddr {
    fn from(f: Address) -> Self {
        f.to_ip_addr()
    }
}
impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let ip = track!(s
            .parse::<IpAddr>()
            .map_err(|e| ErrorKind::InvalidAddress.cause(e)))?;
        Ok(Address::from(ip))
    }
}
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_ip_addr())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use trackable::result::TestResult;

    use super::*;

    #[test]
    fn parse_works() -> TestResult {
        let a = track!(Address::parse("233.252.0.0"))?;
        assert_eq!(a.family(), AddressFamily::Ipv4);
        assert_eq!(a.as_u128(), 0xE9FC_0000);
        assert_eq!(a.to_string(), "233.252.0.0");

        let a = track!(Address::parse("2001:DB8::1"))?;
        assert_eq!(a.family(), AddressFamily::Ipv6);
        assert_eq!(a.as_u128(), 0x2001_0DB8_0000_0000_0000_0000_0000_0001);
        assert_eq!(a.to_string(), "2001:db8::1");
        Ok(())
    }

    #[test]
    fn parse_rejects_malformed_text() {
        for s in &["", "foo", "233.252.0.1.1", "233.252.0", "256.0.0.1", "2001:db8:::1"] {
            let e = Address::parse(s).err().map(|e| *e.kind());
            assert_eq!(e, Some(ErrorKind::InvalidAddress), "{:?}", s);
        }
    }

    #[test]
    fn compare_works() -> TestResult {
        let a = track!(Address::parse("233.252.0.0"))?;
        let b = track!(Address::parse("233.252.0.1"))?;
        assert_eq!(track!(a.compare(b))?, Ordering::Less);
        assert_eq!(track!(b.compare(a))?, Ordering::Greater);
        assert_eq!(track!(a.compare(a))?, Ordering::Equal);

        let c = track!(Address::parse("::1"))?;
        assert_eq!(
            a.compare(c).err().map(|e| *e.kind()),
            Some(ErrorKind::FamilyMismatch)
        );
        Ok(())
    }

    #[test]
    fn successor_and_offset_works() -> TestResult {
        let a = track!(Address::parse("233.252.0.255"))?;
        let b = a.successor();
        assert_eq!(b.to_string(), "233.252.1.0");
        assert_eq!(b.offset_from(a), 1);
        assert_eq!(a.nth(256).map(|x| x.to_string()), Some("233.252.1.255".to_owned()));

        let max = track!(Address::parse("255.255.255.255"))?;
        assert_eq!(max.nth(1), None);
        Ok(())
    }

    #[test]
    #[should_panic]
    fn successor_overflow() {
        let max = Address::from(IpAddr::V6(Ipv6Addr::from(u128::max_value())));
        let _ = max.successor();
    }

    #[test]
    #[should_panic]
    fn offset_underflow() {
        let a = Address::from(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        let b = Address::from(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
        let _ = a.offset_from(b);
    }

    #[test]
    fn multicast_works() -> TestResult {
        assert!(track!(Address::parse("233.252.0.0"))?.is_multicast());
        assert!(track!(Address::parse("ff0e::1"))?.is_multicast());
        assert!(!track!(Address::parse("192.168.0.1"))?.is_multicast());
        assert!(!track!(Address::parse("2001:db8::1"))?.is_multicast());
        Ok(())
    }

    proptest! {
        #[test]
        fn compare_agrees_with_ip_addr_ordering(a: u32, b: u32) {
            let x = Address::from(IpAddr::V4(Ipv4Addr::from(a)));
            let y = Address::from(IpAddr::V4(Ipv4Addr::from(b)));
            prop_assert_eq!(x.compare(y).ok(), Some(a.cmp(&b)));
            prop_assert_eq!(x.to_ip_addr().cmp(&y.to_ip_addr()), a.cmp(&b));
        }

        #[test]
        fn text_representation_round_trips(v: u128) {
            let a = Address::from(IpAddr::V6(Ipv6Addr::from(v)));
            let b = Address::parse(&a.to_string()).ok();
            prop_assert_eq!(b, Some(a));
        }

        #[test]
        fn families_never_compare(a: u32, b: u128) {
            let x = Address::from(IpAddr::V4(Ipv4Addr::from(a)));
            let y = Address::from(IpAddr::V6(Ipv6Addr::from(b)));
            prop_assert_eq!(x.compare(y).err().map(|e| *e.kind()), Some(ErrorKind::FamilyMismatch));
        }
    }
}
