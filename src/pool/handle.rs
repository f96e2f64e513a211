use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::{LeaseId, LeaseSnapshot, PoolShared};
use crate::address::Address;

/// 割り当てられた「アドレス + 連続したポート群」を表すハンドル.
///
/// ハンドルは複製可能で、全ての複製が解放(またはドロップ)された時点で、
/// 対応するポート群がプールに返却される.
///
/// ハンドルはプールへの参照を保持しているため、
/// 生存中のハンドルが存在する限りプールが破棄されることはない.
pub struct AddressHandle {
    pool: Arc<PoolShared>,
    lease: LeaseId,
    address: Address,
    port: u16,
    n_ports: u16,
    ttl: u8,
}
impl AddressHandle {
    pub(super) fn new(pool: Arc<PoolShared>, lease: LeaseSnapshot) -> Self {
        AddressHandle {
            pool,
            lease: lease.id,
            address: lease.address,
            port: lease.port,
            n_ports: lease.n_ports,
            ttl: lease.ttl,
        }
    }

    /// 割り当てられたアドレスを返す.
    pub fn address(&self) -> IpAddr {
        self.address.to_ip_addr()
    }

    /// 割り当てられたポート群の先頭のポート番号を返す.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 割り当てられたポートの数を返す.
    pub fn n_ports(&self) -> u16 {
        self.n_ports
    }

    /// 割当元のアドレス範囲に設定されているTTLを返す.
    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    /// 先頭ポートのソケットアドレスを返す.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address(), self.port)
    }

    /// ハンドルを複製する.
    ///
    /// 複製されたハンドルは同じリースを共有し、全ての複製が解放されるまでリースは維持される.
    pub fn duplicate(&self) -> Self {
        self.pool.retain(self.lease);
        AddressHandle {
            pool: Arc::clone(&self.pool),
            lease: self.lease,
            address: self.address,
            port: self.port,
            n_ports: self.n_ports,
            ttl: self.ttl,
        }
    }

    /// ハンドルを解放する.
    ///
    /// これが最後の複製だった場合には、ポート群がプールに返却される.
    ///
    /// 単にハンドルをドロップした場合と等価.
    pub fn release(self) {}
}
impl Clone for AddressHandle {
    fn clone(&self) -> Self {
        self.duplicate()
    }
}
impl Drop for AddressHandle {
    fn drop(&mut self) {
        self.pool.release(self.lease);
    }
}
impl fmt::Debug for AddressHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AddressHandle")
            .field("lease", &self.lease)
            .field("address", &self.address.to_ip_addr())
            .field("port", &self.port)
            .field("n_ports", &self.n_ports)
            .field("ttl", &self.ttl)
            .finish()
    }
}
