//! Transport Address Pool.
//!
//! `addrpool`は、ストリーミングセッション群に対して、
//! 「マルチキャスト/ユニキャストアドレス + 連続したUDPポート群」を排他的に割り当てるためのプール.
//!
//! # 特徴
//!
//! - 管理者は「アドレス範囲 × ポート範囲 × TTL」を任意個、プールに登録する
//!   - IPv4およびIPv6の両方をサポート
//!   - 範囲同士の重複は検査されない(登録順が優先順位となる)
//! - 割当要求では、以下の制約を[AcquireFlags]で指定可能:
//!   - アドレスファミリー(IPv4/IPv6)
//!   - 先頭ポートが偶数であること(RTP/RTCPの組用)
//!   - マルチキャスト/ユニキャスト
//! - 割当は決定的な先頭一致(first-fit)で行われる:
//!   - 範囲の登録順 → アドレスの昇順 → ポート番号の昇順
//! - 特定のアドレスおよびポート群を指定した予約も可能
//! - 割当結果は参照カウント付きの[AddressHandle]として返され、全ての複製の解放時にプールに返却される
//! - 全操作は単一のロックで直列化されるため、複数スレッドから安全に利用可能
//!
//! # モジュールの依存関係
//!
//! ```text
//! pool => address
//!      => metrics
//! ```
//!
//! - [pool]モジュール:
//!   - 主に[AddressPool]構造体を提供
//!   - 利用者が直接触るのはこの構造体と、割当結果である[AddressHandle]
//! - [address]モジュール:
//!   - ファミリーを考慮したアドレスの比較や演算を提供
//! - [metrics]モジュール:
//!   - プールの状態を[Prometheus]形式で公開するためのメトリクス
//!
//! [AcquireFlags]: ./pool/struct.AcquireFlags.html
//! [AddressHandle]: ./pool/struct.AddressHandle.html
//! [AddressPool]: ./pool/struct.AddressPool.html
//! [pool]: ./pool/index.html
//! [address]: ./address/index.html
//! [metrics]: ./metrics/index.html
//! [Prometheus]: https://prometheus.io/
#![warn(missing_docs)]
extern crate prometrics;
#[cfg(test)]
extern crate proptest;
#[macro_use]
extern crate trackable;
#[macro_use]
extern crate slog;

pub use crate::error::{Error, ErrorKind};
pub use crate::pool::AddressPool;

pub mod address;
pub mod metrics;
pub mod pool;

mod error;

/// crate固有の`Result`型.
pub type Result<T> = std::result::Result<T, Error>;
