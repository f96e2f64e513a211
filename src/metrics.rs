//! [Prometheus][prometheus]用のメトリクス.
//!
//! [prometheus]: https://prometheus.io/
use prometrics::metrics::{Counter, Gauge, MetricBuilder};

/// アドレスプールのメトリクス.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub(crate) ranges: Gauge,
    pub(crate) outstanding_leases: Gauge,
    pub(crate) added_ranges: Counter,
    pub(crate) acquired_leases: Counter,
    pub(crate) reserved_leases: Counter,
    pub(crate) released_leases: Counter,
    pub(crate) nospace_failures: Counter,
    pub(crate) clears: Counter,
}
impl PoolMetrics {
    /// 現在登録されているアドレス範囲の数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// addrpool_pool_ranges <GAUGE>
    /// ```
    pub fn ranges(&self) -> usize {
        self.ranges.value() as usize
    }

    /// 現在割当中(i.e., 未解放)のリースの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// addrpool_pool_outstanding_leases <GAUGE>
    /// ```
    pub fn outstanding_leases(&self) -> usize {
        self.outstanding_leases.value() as usize
    }

    /// これまでに登録されたアドレス範囲の数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// addrpool_pool_added_ranges_total <COUNTER>
    /// ```
    pub fn added_ranges(&self) -> u64 {
        self.added_ranges.value() as u64
    }

    /// `acquire`によって割り当てられたリースの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// addrpool_pool_acquired_leases_total <COUNTER>
    /// ```
    pub fn acquired_leases(&self) -> u64 {
        self.acquired_leases.value() as u64
    }

    /// `reserve`によって割り当てられたリースの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// addrpool_pool_reserved_leases_total <COUNTER>
    /// ```
    pub fn reserved_leases(&self) -> u64 {
        self.reserved_leases.value() as u64
    }

    /// 解放されたリースの数.
    ///
    /// ハンドルの複製が残っている間は、リースは解放されない.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// addrpool_pool_released_leases_total <COUNTER>
    /// ```
    pub fn released_leases(&self) -> u64 {
        self.released_leases.value() as u64
    }

    /// 空きポート不足による`acquire`の失敗回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// addrpool_pool_nospace_failures_total <COUNTER>
    /// ```
    pub fn nospace_failures(&self) -> u64 {
        self.nospace_failures.value() as u64
    }

    /// プールがクリアされた回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// addrpool_pool_clears_total <COUNTER>
    /// ```
    pub fn clears(&self) -> u64 {
        self.clears.value() as u64
    }

    pub(crate) fn new(builder: &MetricBuilder) -> Self {
        let mut builder = builder.clone();
        builder.namespace("addrpool").subsystem("pool");
        PoolMetrics {
            ranges: builder
                .gauge("ranges")
                .help("Number of registered address ranges")
                .finish()
                .expect("Never fails"),
            outstanding_leases: builder
                .gauge("outstanding_leases")
                .help("Number of leases which have not been released yet")
                .finish()
                .expect("Never fails"),
            added_ranges: builder
                .counter("added_ranges_total")
                .help("Number of added address ranges")
                .finish()
                .expect("Never fails"),
            acquired_leases: builder
                .counter("acquired_leases_total")
                .help("Number of leases allocated by searching the pool")
                .finish()
                .expect("Never fails"),
            reserved_leases: builder
                .counter("reserved_leases_total")
                .help("Number of leases allocated for a specific address and port")
                .finish()
                .expect("Never fails"),
            released_leases: builder
                .counter("released_leases_total")
                .help("Number of released leases")
                .finish()
                .expect("Never fails"),
            nospace_failures: builder
                .counter("nospace_failures_total")
                .help("Number of acquisition failures caused by no available ports")
                .finish()
                .expect("Never fails"),
            clears: builder
                .counter("clears_total")
                .help("Number of times the pool was cleared")
                .finish()
                .expect("Never fails"),
        }
    }

    pub(crate) fn update_state(&self, ranges: usize, outstanding_leases: usize) {
        self.ranges.set(ranges as f64);
        self.outstanding_leases.set(outstanding_leases as f64);
    }
}
