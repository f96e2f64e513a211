//! Port Bitmap

const WORD_BITS: usize = 64;

/// 一つのアドレスに対するポートの使用状況を表現するビットマップ.
///
/// `i`番目のビットが立っている場合には、範囲の先頭から`i`番目のポートが使用中であることを示す.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PortBitmap {
    words: Vec<u64>,
    len: usize,
}
impl PortBitmap {
    /// 全ビットが空きの状態の、長さ`len`のビットマップを生成する.
    pub fn new(len: usize) -> Self {
        PortBitmap {
            words: vec![0; (len + WORD_BITS - 1) / WORD_BITS],
            len,
        }
    }

    /// ビットマップの長さ(i.e., 管理しているポート数)を返す.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `index`番目のポートが使用中かどうか.
    pub fn is_used(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    /// 使用中のポートが一つも存在しないかどうか.
    pub fn is_all_free(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// 使用中のポートの数を返す.
    pub fn used_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// `[start, start + n)`の全てのポートが空いているかどうか.
    ///
    /// 範囲がビットマップの外にはみ出す場合には`false`が返される.
    pub fn is_free_run(&self, start: usize, n: usize) -> bool {
        start
            .checked_add(n)
            .map_or(false, |end| end <= self.len && (start..end).all(|i| !self.is_used(i)))
    }

    /// 長さ`n`の連続した空き領域のうち、最も先頭に近いものの開始位置を返す.
    ///
    /// `parity`が指定された場合には、開始位置を2で割った余りがその値と一致するものに限定される.
    pub fn first_fit(&self, n: usize, parity: Option<usize>) -> Option<usize> {
        let mut start = 0;
        while start + n <= self.len {
            if parity.map_or(false, |p| start % 2 != p) {
                start += 1;
                continue;
            }
            // 窓内で最後に見つかった使用中ポートの直後まで一気に進める
            match (start..start + n).rev().find(|&i| self.is_used(i)) {
                None => return Some(start),
                Some(used) => start = used + 1,
            }
        }
        None
    }

    /// 全ビットが空きの長さ`len`のビットマップに対して`first_fit()`を行った場合の結果を返す.
    ///
    /// 実際にビットマップを確保することはない.
    pub fn first_fit_on_empty(len: usize, n: usize, parity: Option<usize>) -> Option<usize> {
        let start = parity.unwrap_or(0);
        if start + n <= len {
            Some(start)
        } else {
            None
        }
    }

    /// `[start, start + n)`を使用中にする.
    ///
    /// # Panics
    ///
    /// 範囲内に既に使用中のポートが含まれている場合には、現在のスレッドがパニックする.
    pub fn set_run(&mut self, start: usize, n: usize) {
        assert!(self.is_free_run(start, n), "start={}, n={}", start, n);
        for i in start..start + n {
            self.words[i / WORD_BITS] |= 1 << (i % WORD_BITS);
        }
    }

    /// `[start, start + n)`を空きに戻す.
    ///
    /// # Panics
    ///
    /// 範囲内に空きのポートが含まれている場合には、現在のスレッドがパニックする.
    pub fn clear_run(&mut self, start: usize, n: usize) {
        assert!(start + n <= self.len(), "start={}, n={}", start, n);
        for i in start..start + n {
            assert!(self.is_used(i), "port index {} is not in use", i);
            self.words[i / WORD_BITS] &= !(1 << (i % WORD_BITS));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        let mut bitmap = PortBitmap::new(11);
        assert_eq!(bitmap.len(), 11);
        assert!(bitmap.is_all_free());
        assert_eq!(bitmap.first_fit(2, None), Some(0));

        bitmap.set_run(0, 2);
        assert_eq!(bitmap.used_count(), 2);
        assert_eq!(bitmap.first_fit(4, None), Some(2));
        assert_eq!(bitmap.first_fit(12, None), None);

        bitmap.set_run(2, 4);
        assert_eq!(bitmap.first_fit(5, None), Some(6));
        assert_eq!(bitmap.first_fit(6, None), None);

        bitmap.clear_run(0, 2);
        assert_eq!(bitmap.first_fit(2, None), Some(0));
        assert_eq!(bitmap.first_fit(3, None), Some(6));

        bitmap.clear_run(2, 4);
        assert!(bitmap.is_all_free());
    }

    #[test]
    fn parity_works() {
        // 先頭が奇数ポート(e.g., 5001)の場合に、偶数ポートを得るには奇数番目のビットから探す
        let mut bitmap = PortBitmap::new(3);
        assert_eq!(bitmap.first_fit(2, Some(1)), Some(1));
        bitmap.set_run(1, 2);
        assert_eq!(bitmap.first_fit(2, None), None);
        assert_eq!(bitmap.first_fit(1, Some(1)), None);
        assert_eq!(bitmap.first_fit(1, Some(0)), Some(0));
    }

    #[test]
    fn first_fit_on_empty_works() {
        assert_eq!(PortBitmap::first_fit_on_empty(3, 2, Some(1)), Some(1));
        assert_eq!(PortBitmap::first_fit_on_empty(3, 3, Some(1)), None);
        assert_eq!(PortBitmap::first_fit_on_empty(3, 3, None), Some(0));
        assert_eq!(PortBitmap::first_fit_on_empty(11, 256, None), None);

        let bitmap = PortBitmap::new(200);
        for n in 1..200 {
            for parity in [None, Some(0), Some(1)].iter() {
                assert_eq!(
                    bitmap.first_fit(n, *parity),
                    PortBitmap::first_fit_on_empty(200, n, *parity)
                );
            }
        }
    }

    #[test]
    fn crosses_word_boundary() {
        let mut bitmap = PortBitmap::new(130);
        bitmap.set_run(60, 10);
        assert!(bitmap.is_used(63));
        assert!(bitmap.is_used(64));
        assert!(!bitmap.is_used(70));
        assert_eq!(bitmap.first_fit(61, None), None);
        assert_eq!(bitmap.first_fit(60, None), Some(0));

        bitmap.set_run(0, 1);
        assert_eq!(bitmap.first_fit(60, None), Some(70));

        bitmap.clear_run(0, 1);
        bitmap.clear_run(60, 10);
        assert!(bitmap.is_all_free());
    }

    #[test]
    #[should_panic]
    fn double_set_panics() {
        let mut bitmap = PortBitmap::new(8);
        bitmap.set_run(0, 4);
        bitmap.set_run(3, 2);
    }

    #[test]
    #[should_panic]
    fn clearing_free_ports_panics() {
        let mut bitmap = PortBitmap::new(8);
        bitmap.clear_run(0, 1);
    }
}
