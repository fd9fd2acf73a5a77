//! Monetary amounts are stored as integer satang (1/100 THB), never floats.

pub const SATANG_PER_BAHT: i64 = 100;

/// Convert a whole-baht amount to satang.
pub fn baht(amount: i64) -> i64 {
    amount * SATANG_PER_BAHT
}

/// Render a satang amount as a baht string, e.g. 15000 -> "฿150.00".
pub fn format_baht(satang: i64) -> String {
    let sign = if satang < 0 { "-" } else { "" };
    let abs = satang.abs();
    format!("{}฿{}.{:02}", sign, abs / SATANG_PER_BAHT, abs % SATANG_PER_BAHT)
}
