//! 文字列類似度
//!
//! Ratcliff/Obershelp方式の類似度。最長一致ブロックを貪欲に取り、
//! その前後を再帰的に処理して一致文字数Mを求め、2M/Tを返す
//! （Tは両文字列の合計長）。大文字小文字は無視する。

use std::collections::HashMap;

/// 2つの文字列の類似度を計算する（0.0〜1.0）
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.to_lowercase().chars().collect();
    let b_chars: Vec<char> = b.to_lowercase().chars().collect();

    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 1.0;
    }

    let matches = matching_total(&a_chars, &b_chars, 0, a_chars.len(), 0, b_chars.len());
    2.0 * matches as f64 / total as f64
}

/// 指定範囲内の一致文字数を集計
fn matching_total(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> usize {
    let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
    if size == 0 {
        return 0;
    }
    matching_total(a, b, alo, i, blo, j)
        + size
        + matching_total(a, b, i + size, ahi, j + size, bhi)
}

/// 範囲内の最長一致ブロックを求める
///
/// 同じ長さの候補が複数あるときはaの先頭寄り、次いでbの先頭寄りを返す。
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut b_positions: HashMap<char, Vec<usize>> = HashMap::new();
    for j in blo..bhi {
        b_positions.entry(b[j]).or_default().push(j);
    }

    let mut best_i = alo;
    let mut best_j = blo;
    let mut best_size = 0;

    // j2len[j] = a[..i] と b[..j] がそこで終わる一致の長さ
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for i in alo..ahi {
        let mut new_j2len: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b_positions.get(&a[i]) {
            for &j in positions {
                let length = if j > blo {
                    j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                new_j2len.insert(j, length);
                if length > best_size {
                    best_i = i + 1 - length;
                    best_j = j + 1 - length;
                    best_size = length;
                }
            }
        }
        j2len = new_j2len;
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        assert!((similarity_ratio("RS", "RS") - 1.0).abs() < 1e-9);
        assert!((similarity_ratio("カーボンエクステリア", "カーボンエクステリア") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_case_insensitive() {
        assert!((similarity_ratio("hybrid rs", "HYBRID RS") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_known_ratio() {
        // 一致ブロック "bcd" → 2*3/8 = 0.75
        assert!((similarity_ratio("abcd", "bcde") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_empty_strings() {
        assert!((similarity_ratio("", "") - 1.0).abs() < 1e-9);
        assert!(similarity_ratio("", "RS").abs() < 1e-9);
        assert!(similarity_ratio("RS", "").abs() < 1e-9);
    }

    #[test]
    fn test_disjoint() {
        assert!(similarity_ratio("abc", "xyz").abs() < 1e-9);
    }

    #[test]
    fn test_japanese_partial() {
        let score = similarity_ratio("カーボンエクステリアパッケージ", "カーボンエクステリア");
        // 一致ブロック10文字 → 2*10/25 = 0.8
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_greedy_blocks() {
        // 最長ブロック "aba" を取り、その両側で再帰する
        // "abxaba" vs "aba": M=3+1... ブロック分解に依存するため範囲のみ確認
        let score = similarity_ratio("abxaba", "aba");
        assert!(score > 0.5 && score <= 1.0);
    }

    #[test]
    fn test_bounds() {
        let cases = [
            ("2.0 RS", "RS"),
            ("HYBRID G", "G"),
            ("スポーツ", "Sport"),
            ("", "ベース"),
        ];
        for (a, b) in cases {
            let score = similarity_ratio(a, b);
            assert!((0.0..=1.0).contains(&score), "{} vs {} = {}", a, b, score);
        }
    }
}
