//! アドレスプール.
//!
//! 管理者が登録した「アドレス範囲 × ポート範囲」の中から、
//! 各セッションに対して「アドレス + 連続したUDPポート群」の組を排他的に割り当てる.
//!
//! 割当結果は[`AddressHandle`]として返され、全ての複製が解放された時点で、
//! 該当のポート群はプールに戻される.
//!
//! [`AddressHandle`]: ./struct.AddressHandle.html
use slog::Logger;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

pub use self::builder::AddressPoolBuilder;
pub use self::flags::AcquireFlags;
pub use self::handle::AddressHandle;
pub use self::range::RangeInfo;

use self::range::AddressRange;
use crate::address::Address;
use crate::metrics::PoolMetrics;
use crate::{ErrorKind, Result};

mod bitmap;
mod builder;
mod flags;
mod handle;
mod range;

type LeaseId = u64;

/// アドレスプール.
///
/// インスタンスの複製は、同一のプールを共有する(`Arc`相当).
/// 全ての操作は単一の排他ロックの下で実行されるため、複数スレッドから同時に利用可能.
///
/// # Examples
///
/// ```
/// use addrpool::pool::{AcquireFlags, AddressPool};
///
/// let pool = AddressPool::new();
/// pool.add_range("233.252.0.0", "233.252.0.255", 5000, 5010, 1).unwrap();
///
/// let handle = pool.acquire(AcquireFlags::EVEN_PORT, 2).unwrap();
/// assert_eq!(handle.address().to_string(), "233.252.0.0");
/// assert_eq!(handle.port(), 5000);
/// assert_eq!(handle.ttl(), 1);
///
/// handle.release();
/// pool.clear();
/// assert!(pool.ranges().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct AddressPool {
    shared: Arc<PoolShared>,
}
impl AddressPool {
    /// デフォルト設定で空の`AddressPool`インスタンスを生成する.
    ///
    /// 設定を変更したい場合には[`AddressPoolBuilder`]を使用すること.
    ///
    /// [`AddressPoolBuilder`]: ./struct.AddressPoolBuilder.html
    pub fn new() -> Self {
        AddressPoolBuilder::new().finish()
    }

    /// アドレス範囲をプールに登録する.
    ///
    /// `[min_address, max_address]`の各アドレスについて、
    /// `[min_port, max_port]`のポート群が割当対象となる.
    ///
    /// 既存の範囲との重複検査は行われない.
    /// 重複する範囲は独立に扱われ、割当時には先に登録された方が優先される.
    ///
    /// # Errors
    ///
    /// 以下の場合にはエラーが返され、プールの状態は変更されない:
    ///
    /// - アドレスの表記が不正: `ErrorKind::InvalidAddress`
    /// - 二つのアドレスのファミリーが異なる: `ErrorKind::FamilyMismatch`
    /// - `min_address`が`max_address`より大きい: `ErrorKind::InvalidRange`
    ///
    /// # Panics
    ///
    /// `min_port`が`max_port`より大きい場合には、現在のスレッドがパニックする.
    pub fn add_range(
        &self,
        min_address: &str,
        max_address: &str,
        min_port: u16,
        max_port: u16,
        ttl: u8,
    ) -> Result<()> {
        let min = track!(Address::parse(min_address))?;
        let max = track!(Address::parse(max_address))?;
        let order = track!(min.compare(max))?;
        track_assert!(
            order != Ordering::Greater,
            ErrorKind::InvalidRange,
            "min_address={}, max_address={}",
            min,
            max
        );
        assert!(
            min_port <= max_port,
            "min_port({}) must not be greater than max_port({})",
            min_port,
            max_port
        );

        let mut state = self.shared.lock();
        state
            .ranges
            .push(AddressRange::new(min, max, min_port, max_port, ttl));
        self.shared.metrics.added_ranges.increment();
        self.shared.update_metrics(&state);
        info!(self.shared.logger, "Address range added";
              "min_address" => %min, "max_address" => %max,
              "min_port" => min_port, "max_port" => max_port, "ttl" => ttl);
        Ok(())
    }

    /// 条件を満たす「アドレス + 連続した`n_ports`個のポート」を割り当てる.
    ///
    /// アドレス範囲は登録順に、範囲内ではアドレスの昇順、アドレス内ではポート番号の昇順に探索され、
    /// 最初に見つかったものが割り当てられる.
    ///
    /// 条件を満たすものが存在しない場合には`None`が返される.
    /// これはエラーではなく、単なるリソース不足であり、リトライ等は呼び出し側の責務.
    ///
    /// # Panics
    ///
    /// `n_ports`が`0`の場合には、現在のスレッドがパニックする.
    pub fn acquire(&self, flags: AcquireFlags, n_ports: u16) -> Option<AddressHandle> {
        assert!(n_ports > 0, "n_ports must be greater than zero");
        let even_port = flags.contains(AcquireFlags::EVEN_PORT);

        let mut state = self.shared.lock();
        let found = state
            .ranges
            .iter()
            .enumerate()
            .filter(|&(_, range)| flags.matches(range))
            .find_map(|(i, range)| {
                range
                    .find(n_ports, even_port)
                    .map(|(offset, index)| (i, offset, index))
            });
        let (range, offset, index) = if let Some(found) = found {
            found
        } else {
            self.shared.metrics.nospace_failures.increment();
            debug!(self.shared.logger, "No available ports";
                   "flags" => ?flags, "n_ports" => n_ports);
            return None;
        };

        let lease = state.lease(range, offset, index, n_ports);
        self.shared.metrics.acquired_leases.increment();
        self.shared.update_metrics(&state);
        debug!(self.shared.logger, "Lease acquired";
               "id" => lease.id, "address" => %lease.address,
               "port" => lease.port, "n_ports" => n_ports, "flags" => ?flags);
        Some(AddressHandle::new(Arc::clone(&self.shared), lease))
    }

    /// 指定されたアドレスおよびポート群を割り当てる.
    ///
    /// 登録順に、アドレスとポート群の全体を含み、かつTTLが一致する範囲が探索され、
    /// ポート群が空いている最初の範囲から割り当てが行われる.
    ///
    /// # Errors
    ///
    /// - アドレスの表記が不正: `ErrorKind::InvalidAddress`
    /// - 該当する範囲が存在しない: `ErrorKind::NotInPool`
    /// - 該当する範囲の全てで、ポート群の一部または全部が使用中: `ErrorKind::AlreadyReserved`
    ///
    /// # Panics
    ///
    /// `n_ports`が`0`の場合には、現在のスレッドがパニックする.
    pub fn reserve(
        &self,
        address: &str,
        port: u16,
        n_ports: u16,
        ttl: u8,
    ) -> Result<AddressHandle> {
        assert!(n_ports > 0, "n_ports must be greater than zero");
        let address = track!(Address::parse(address))?;

        let mut state = self.shared.lock();
        let mut covered = false;
        let mut found = None;
        for (i, range) in state.ranges.iter().enumerate() {
            if let Some((offset, index)) = range.locate(address, port, n_ports, ttl) {
                covered = true;
                if range.is_free(offset, index, n_ports) {
                    found = Some((i, offset, index));
                    break;
                }
            }
        }
        let (range, offset, index) = if let Some(found) = found {
            found
        } else {
            track_assert!(
                covered,
                ErrorKind::NotInPool,
                "address={}, port={}, n_ports={}, ttl={}",
                address,
                port,
                n_ports,
                ttl
            );
            track_panic!(
                ErrorKind::AlreadyReserved,
                "address={}, port={}, n_ports={}",
                address,
                port,
                n_ports
            );
        };

        let lease = state.lease(range, offset, index, n_ports);
        self.shared.metrics.reserved_leases.increment();
        self.shared.update_metrics(&state);
        debug!(self.shared.logger, "Lease reserved";
               "id" => lease.id, "address" => %lease.address,
               "port" => lease.port, "n_ports" => n_ports);
        Ok(AddressHandle::new(Arc::clone(&self.shared), lease))
    }

    /// 登録済みの全てのアドレス範囲を破棄して、プールを初期状態に戻す.
    ///
    /// # Panics
    ///
    /// 未解放のリースが存在する場合には、現在のスレッドがパニックする.
    /// この場合、プールの状態は変更されない.
    pub fn clear(&self) {
        let mut state = self.shared.lock();
        let outstanding = state.leases.len();
        if outstanding == 0 {
            let ranges = state.ranges.len();
            state.ranges.clear();
            self.shared.metrics.clears.increment();
            self.shared.update_metrics(&state);
            info!(self.shared.logger, "Address pool cleared"; "ranges" => ranges);
            return;
        }

        // ロックを汚染しないように、パニックの前に解放しておく
        drop(state);
        panic!(
            "cannot clear an address pool which has {} outstanding lease(s)",
            outstanding
        );
    }

    /// ユニキャストアドレスのみからなる範囲が登録されているかどうか.
    pub fn has_unicast_addresses(&self) -> bool {
        self.shared.lock().ranges.iter().any(|r| r.is_unicast())
    }

    /// 登録されているアドレス範囲の一覧を、登録順に返す.
    pub fn ranges(&self) -> Vec<RangeInfo> {
        self.shared
            .lock()
            .ranges
            .iter()
            .map(|r| r.info())
            .collect()
    }

    /// 未解放のリースの数を返す.
    pub fn outstanding(&self) -> usize {
        self.shared.lock().leases.len()
    }

    /// プールの内容(範囲とリースの一覧)をデバッグレベルでログに出力する.
    pub fn dump(&self) {
        let state = self.shared.lock();
        let logger = &self.shared.logger;
        debug!(logger, "Address pool";
               "ranges" => state.ranges.len(), "leases" => state.leases.len());
        for (i, range) in state.ranges.iter().enumerate() {
            let info = range.info();
            debug!(logger, "Range";
                   "index" => i,
                   "min_address" => %info.min_address, "max_address" => %info.max_address,
                   "min_port" => info.min_port, "max_port" => info.max_port,
                   "ttl" => info.ttl, "used_ports" => info.used_ports);
        }
        for (id, lease) in &state.leases {
            let range = &state.ranges[lease.range];
            debug!(logger, "Lease";
                   "id" => *id, "range" => lease.range,
                   "address" => %range.address(lease.offset),
                   "port" => range.port(lease.index),
                   "n_ports" => lease.n_ports, "refs" => lease.refs);
        }
    }

    /// プールのメトリクスを返す.
    pub fn metrics(&self) -> &PoolMetrics {
        &self.shared.metrics
    }
}
impl Default for AddressPool {
    fn default() -> Self {
        Self::new()
    }
}

/// プールとハンドル群が共有する状態.
#[derive(Debug)]
struct PoolShared {
    state: Mutex<PoolState>,
    logger: Logger,
    metrics: PoolMetrics,
}
impl PoolShared {
    fn new(logger: Logger, metrics: PoolMetrics) -> Self {
        PoolShared {
            state: Mutex::new(PoolState::default()),
            logger,
            metrics,
        }
    }

    // パニックはロックの解放後に発生させているので、汚染されていても状態は整合している
    fn lock(&self) -> MutexGuard<PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_metrics(&self, state: &PoolState) {
        self.metrics
            .update_state(state.ranges.len(), state.leases.len());
    }

    /// リースの参照カウントを一つ増やす.
    fn retain(&self, id: LeaseId) {
        let refs = self.lock().retain(id);
        let refs = refs.unwrap_or_else(|| panic!("lease {} is not outstanding", id));
        debug!(self.logger, "Lease duplicated"; "id" => id, "refs" => refs);
    }

    /// リースの参照カウントを一つ減らし、ゼロになった場合にはポート群を解放する.
    fn release(&self, id: LeaseId) {
        let mut state = self.lock();
        let refs = state.release(id);
        if refs == Some(0) {
            self.metrics.released_leases.increment();
            self.update_metrics(&state);
        }
        drop(state);

        match refs {
            Some(0) => debug!(self.logger, "Lease released"; "id" => id),
            Some(refs) => debug!(self.logger, "Lease reference dropped"; "id" => id, "refs" => refs),
            None if thread::panicking() => {
                warn!(self.logger, "Unknown lease dropped during unwinding"; "id" => id)
            }
            None => panic!("lease {} is not outstanding", id),
        }
    }
}

#[derive(Debug, Default)]
struct PoolState {
    // 登録順 = 探索順
    ranges: Vec<AddressRange>,
    leases: BTreeMap<LeaseId, Lease>,
    next_lease_id: LeaseId,
}
impl PoolState {
    fn lease(&mut self, range: usize, offset: u128, index: usize, n_ports: u16) -> LeaseSnapshot {
        let r = &mut self.ranges[range];
        r.mark_used(offset, index, n_ports);

        let id = self.next_lease_id;
        self.next_lease_id += 1;
        self.leases.insert(
            id,
            Lease {
                range,
                offset,
                index,
                n_ports,
                refs: 1,
            },
        );
        LeaseSnapshot {
            id,
            address: r.address(offset),
            port: r.port(index),
            n_ports,
            ttl: r.ttl(),
        }
    }

    fn retain(&mut self, id: LeaseId) -> Option<usize> {
        let lease = self.leases.get_mut(&id)?;
        lease.refs += 1;
        Some(lease.refs)
    }

    fn release(&mut self, id: LeaseId) -> Option<usize> {
        let lease = self.leases.get_mut(&id)?;
        assert!(lease.refs > 0);
        lease.refs -= 1;
        if lease.refs > 0 {
            return Some(lease.refs);
        }

        let lease = self.leases.remove(&id).expect("Never fails");
        self.ranges[lease.range].mark_free(lease.offset, lease.index, lease.n_ports);
        Some(0)
    }
}

/// 割当済みのポート群の位置.
#[derive(Debug)]
struct Lease {
    range: usize,
    offset: u128,
    index: usize,
    n_ports: u16,
    refs: usize,
}

/// ハンドルが保持するリースの情報.
#[derive(Debug, Clone, Copy)]
struct LeaseSnapshot {
    id: LeaseId,
    address: Address,
    port: u16,
    n_ports: u16,
    ttl: u8,
}
