use prometrics::metrics::MetricBuilder;
use slog::{Discard, Logger};
use std::sync::Arc;

use super::{AddressPool, PoolShared};
use crate::metrics::PoolMetrics;

/// `AddressPool`のビルダ.
///
/// # Examples
///
/// ```
/// use addrpool::pool::AddressPoolBuilder;
/// use prometrics::metrics::MetricBuilder;
///
/// let mut metrics = MetricBuilder::new();
/// metrics.label("instance", "0");
///
/// let pool = AddressPoolBuilder::new().metrics(metrics).finish();
/// assert_eq!(pool.metrics().ranges(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct AddressPoolBuilder {
    pub(crate) metrics: MetricBuilder,
    pub(crate) logger: Logger,
}
impl AddressPoolBuilder {
    /// デフォルト設定で`AddressPoolBuilder`インスタンスを生成する.
    pub fn new() -> Self {
        AddressPoolBuilder {
            metrics: MetricBuilder::new(),
            logger: Logger::root(Discard, o!()),
        }
    }

    /// メトリクス用の共通設定を登録する.
    ///
    /// デフォルト値は`MetricBuilder::new()`.
    pub fn metrics(&mut self, metrics: MetricBuilder) -> &mut Self {
        self.metrics = metrics;
        self
    }

    /// プールが使用するロガーを登録する.
    ///
    /// デフォルト値は`Logger::root(Discard, o!())`.
    pub fn logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = logger;
        self
    }

    /// 指定された設定で、空の`AddressPool`インスタンスを生成する.
    pub fn finish(&self) -> AddressPool {
        let metrics = PoolMetrics::new(&self.metrics);
        let shared = PoolShared::new(self.logger.clone(), metrics);
        AddressPool {
            shared: Arc::new(shared),
        }
    }
}
impl Default for AddressPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
