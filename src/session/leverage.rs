use rust_decimal::Decimal;

/// Highest leverage the trading engine accepts
pub const MAX_LEVERAGE: u32 = 50;
pub const MIN_LEVERAGE: u32 = 1;

/// Leverage for a budget when the user does not pick one. Smaller budgets
/// need more leverage to clear the engine's minimum position size.
pub fn compute_leverage(budget: Decimal) -> u32 {
    if budget < Decimal::from(50) {
        10
    } else if budget < Decimal::from(200) {
        5
    } else if budget < Decimal::from(1000) {
        3
    } else {
        2
    }
}
