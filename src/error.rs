/// crate固有のエラー型.
#[derive(Debug, Clone, TrackableError)]
pub struct Error(trackable::error::TrackableError<ErrorKind>);

/// 発生し得るエラーの種別.
///
/// ここに列挙されるのは、利用者の入力や設定に起因する「回復可能」なエラーのみである.
/// ポート範囲の上下逆転や、リース中のプールのクリア等のプログラムのバグを示す事象は、
/// エラーとしては返されずに、現在のスレッドがパニックする.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// アドレスの文字列表現が不正.
    ///
    /// IPv4のドット区切り表記、あるいはIPv6のコロン区切り表記以外が渡された場合に返される.
    ///
    /// # 典型的な対応策
    ///
    /// - 設定ファイル等の記述を修正する
    InvalidAddress,

    /// 比較対象のアドレスのファミリー(IPv4/IPv6)が一致しない.
    FamilyMismatch,

    /// 範囲の下限が上限を上回っている.
    ///
    /// 上下の値が入れ替えられることはない.
    InvalidRange,

    /// 指定されたアドレスおよびポートを含む範囲がプールに登録されていない.
    NotInPool,

    /// 指定されたアドレスおよびポートは既に割当済み.
    ///
    /// # 典型的な対応策
    ///
    /// - 別のポートを指定する
    /// - 既存のリースが解放されるのを待つ
    AlreadyReserved,
}
impl trackable::error::ErrorKind for ErrorKind {}
