//! Avantis pair index registry

use rust_decimal::Decimal;

use crate::utils::types::Position;

const PAIRS: [(&str, u32); 16] = [
    ("BTC", 0),
    ("ETH", 1),
    ("SOL", 2),
    ("AVAX", 3),
    ("MATIC", 4),
    ("ARB", 5),
    ("OP", 6),
    ("LINK", 7),
    ("UNI", 8),
    ("AAVE", 9),
    ("ATOM", 10),
    ("DOT", 11),
    ("ADA", 12),
    ("XRP", 13),
    ("DOGE", 14),
    ("BNB", 15),
];

pub fn pair_index(symbol: &str) -> Option<u32> {
    let symbol = symbol.trim();
    PAIRS.iter().find(|(s, _)| s.eq_ignore_ascii_case(symbol)).map(|(_, i)| *i)
}

pub fn symbol_for(pair_index: u32) -> Option<&'static str> {
    PAIRS.iter().find(|(_, i)| *i == pair_index).map(|(s, _)| *s)
}

pub fn supported_symbols() -> impl Iterator<Item = &'static str> {
    PAIRS.iter().map(|(s, _)| *s)
}

/// Rough liquidation price ignoring maintenance margin:
/// long `entry × (1 − 1/leverage)`, short `entry × (1 + 1/leverage)`.
pub fn estimate_liquidation_price(entry: Decimal, leverage: Decimal, is_long: bool) -> Option<Decimal> {
    if entry <= Decimal::ZERO || leverage <= Decimal::ZERO {
        return None;
    }
    let step = Decimal::ONE / leverage;
    let factor = if is_long { Decimal::ONE - step } else { Decimal::ONE + step };
    Some(entry * factor)
}

/// Fill in the symbol and liquidation price when the engine left them out
pub fn enrich(position: &mut Position) {
    if position.symbol.is_none() {
        position.symbol = symbol_for(position.pair_index).map(str::to_string);
    }
    if position.liquidation_price.is_none() {
        position.liquidation_price =
            estimate_liquidation_price(position.entry_price, position.leverage, position.is_long());
    }
}
