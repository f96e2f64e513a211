//! Address Range

use std::collections::BTreeMap;
use std::net::IpAddr;

use super::bitmap::PortBitmap;
use crate::address::{Address, AddressFamily};

/// プールに登録されたアドレス範囲.
///
/// `[min, max]`の各アドレスについて、`[min_port, max_port]`のポート群の使用状況を保持する.
///
/// 概念的には「アドレス数 × ポート数」のビット表だが、
/// 実際には使用中のポートを一つ以上含むアドレスのビットマップのみを保持している.
/// ビットマップが存在しないアドレスは、全ポートが空いているものとして扱われる.
/// (IPv6では、巨大なアドレス範囲が登録されることがあるため)
#[derive(Debug)]
pub(crate) struct AddressRange {
    min: Address,
    max: Address,
    min_port: u16,
    max_port: u16,
    ttl: u8,

    // キーは`min`からのオフセット
    used: BTreeMap<u128, PortBitmap>,
}
impl AddressRange {
    /// 新しい`AddressRange`インスタンスを生成する.
    ///
    /// 引数の検証は呼び出し側の責務.
    pub fn new(min: Address, max: Address, min_port: u16, max_port: u16, ttl: u8) -> Self {
        debug_assert_eq!(min.family(), max.family());
        debug_assert!(min.as_u128() <= max.as_u128());
        debug_assert!(min_port <= max_port);
        AddressRange {
            min,
            max,
            min_port,
            max_port,
            ttl,
            used: BTreeMap::new(),
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.min.family()
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    /// 範囲内の全アドレスがマルチキャストアドレスかどうか.
    pub fn is_multicast(&self) -> bool {
        self.min.is_multicast() && self.max.is_multicast()
    }

    /// 範囲内の全アドレスがユニキャストアドレスかどうか.
    pub fn is_unicast(&self) -> bool {
        !self.min.is_multicast() && !self.max.is_multicast()
    }

    /// 範囲内のアドレスの数から1を引いた値(i.e., 最後のアドレスのオフセット).
    fn last_offset(&self) -> u128 {
        self.max.offset_from(self.min)
    }

    fn port_span(&self) -> usize {
        usize::from(self.max_port - self.min_port) + 1
    }

    /// `offset`番目のアドレスを返す.
    pub fn address(&self, offset: u128) -> Address {
        debug_assert!(offset <= self.last_offset());
        self.min.nth(offset).expect("address overflow")
    }

    /// `index`番目のポート番号を返す.
    pub fn port(&self, index: usize) -> u16 {
        self.min_port + index as u16
    }

    /// 連続した`n_ports`個の空きポートを持つ最初のアドレスを探索する.
    ///
    /// アドレスは昇順に、各アドレス内ではポート番号の昇順に探索される.
    /// `even_port`が`true`の場合には、先頭ポートの番号が偶数のものに限定される.
    ///
    /// 見つかった場合には「アドレスのオフセット」と「先頭ポートのインデックス」の組が返される.
    pub fn find(&self, n_ports: u16, even_port: bool) -> Option<(u128, usize)> {
        let n = usize::from(n_ports);
        let parity = if even_port {
            Some(usize::from(self.min_port % 2))
        } else {
            None
        };

        // 全ポートが空いているアドレスでも条件を満たせないなら、どのアドレスでも満たせない
        let on_empty = PortBitmap::first_fit_on_empty(self.port_span(), n, parity)?;

        let last = self.last_offset();
        let mut expected = 0;
        for (&offset, bitmap) in &self.used {
            if offset != expected {
                // `expected`のアドレスにはビットマップが無い、すなわち全ポートが空いている
                return Some((expected, on_empty));
            }
            if let Some(index) = bitmap.first_fit(n, parity) {
                return Some((offset, index));
            }
            if offset == last {
                return None;
            }
            expected = offset + 1;
        }
        Some((expected, on_empty))
    }

    /// `address`の`[port, port + n_ports)`がこの範囲に含まれる場合には、
    /// 対応する「アドレスのオフセット」と「先頭ポートのインデックス」の組を返す.
    ///
    /// TTLが一致しない場合も含まれないものとして扱う.
    pub fn locate(
        &self,
        address: Address,
        port: u16,
        n_ports: u16,
        ttl: u8,
    ) -> Option<(u128, usize)> {
        if address.family() != self.family() || ttl != self.ttl {
            return None;
        }
        if address.as_u128() < self.min.as_u128() || address.as_u128() > self.max.as_u128() {
            return None;
        }
        let end = u32::from(port) + u32::from(n_ports) - 1;
        if port < self.min_port || end > u32::from(self.max_port) {
            return None;
        }
        Some((
            address.offset_from(self.min),
            usize::from(port - self.min_port),
        ))
    }

    /// 指定のポート群が全て空いているかどうか.
    pub fn is_free(&self, offset: u128, index: usize, n_ports: u16) -> bool {
        let n = usize::from(n_ports);
        match self.used.get(&offset) {
            None => index + n <= self.port_span(),
            Some(bitmap) => bitmap.is_free_run(index, n),
        }
    }

    /// 指定のポート群を使用中にする.
    pub fn mark_used(&mut self, offset: u128, index: usize, n_ports: u16) {
        debug_assert!(offset <= self.last_offset());
        let span = self.port_span();
        self.used
            .entry(offset)
            .or_insert_with(|| PortBitmap::new(span))
            .set_run(index, usize::from(n_ports));
    }

    /// 指定のポート群を空きに戻す.
    ///
    /// # Panics
    ///
    /// ポート群の中に、使用中ではないものが含まれる場合には、現在のスレッドがパニックする.
    pub fn mark_free(&mut self, offset: u128, index: usize, n_ports: u16) {
        let bitmap = self
            .used
            .get_mut(&offset)
            .unwrap_or_else(|| panic!("no ports are in use at address offset {}", offset));
        bitmap.clear_run(index, usize::from(n_ports));
        if bitmap.is_all_free() {
            self.used.remove(&offset);
        }
    }

    /// 範囲の情報のスナップショットを返す.
    pub fn info(&self) -> RangeInfo {
        RangeInfo {
            min_address: self.min.to_ip_addr(),
            max_address: self.max.to_ip_addr(),
            min_port: self.min_port,
            max_port: self.max_port,
            ttl: self.ttl,
            used_ports: self.used.values().map(|b| b.used_count() as u64).sum(),
        }
    }
}

/// プールに登録されているアドレス範囲の情報.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeInfo {
    /// 範囲の先頭アドレス.
    pub min_address: IpAddr,

    /// 範囲の末尾アドレス(この値も範囲に含まれる).
    pub max_address: IpAddr,

    /// ポート範囲の下限.
    pub min_port: u16,

    /// ポート範囲の上限(この値も範囲に含まれる).
    pub max_port: u16,

    /// マルチキャスト用のTTL.
    pub ttl: u8,

    /// 範囲全体で使用中のポートの数.
    pub used_ports: u64,
}
