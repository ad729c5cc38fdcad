use analysis_core::{IndicatorConfig, Quote, TechnicalSnapshot};
use chrono::NaiveDate;

use crate::indicators::*;

/// Build the indicator snapshot for `symbol` from daily quotes.
///
/// Quotes may arrive in any order; they are sorted by timestamp, and rows dated
/// after `as_of` or with a non-finite close are dropped. Indicators whose window is not covered by the
/// remaining history come back as `None` and their flags stay `false`.
pub fn compute_snapshot(
    symbol: &str,
    as_of: NaiveDate,
    quotes: &[Quote],
    config: &IndicatorConfig,
) -> TechnicalSnapshot {
    let mut usable: Vec<&Quote> = quotes
        .iter()
        .filter(|q| q.close.is_finite() && q.timestamp.date_naive() <= as_of)
        .collect();
    usable.sort_by_key(|q| q.timestamp);

    if usable.is_empty() {
        return TechnicalSnapshot::empty(symbol, as_of);
    }

    let closes: Vec<f64> = usable.iter().map(|q| q.close).collect();
    let volumes: Vec<f64> = usable
        .iter()
        .map(|q| if q.volume.is_finite() { q.volume } else { 0.0 })
        .collect();

    let volume_ratio = volume_ratio(&volumes, config.volume_window);
    let volatility = realized_volatility(&closes, config.volatility_window);

    let snapshot = TechnicalSnapshot {
        symbol: symbol.to_string(),
        as_of,
        data_points: closes.len(),
        latest_close: closes.last().copied(),
        daily_change_pct: daily_change_pct(&closes),
        short_ma: latest_sma(&closes, config.short_window),
        long_ma: latest_sma(&closes, config.long_window),
        volume_ratio,
        unusual_volume: volume_ratio.is_some_and(|r| r > config.volume_ratio_threshold),
        volatility,
        high_volatility: volatility.is_some_and(|v| v > config.volatility_threshold),
        momentum_pct: momentum_pct(&closes, config.momentum_window),
        volume_trend: volume_trend(&volumes, config.volume_trend_window),
    };

    tracing::debug!(
        "Snapshot for {}: {} points, short_ma={:?}, long_ma={:?}",
        symbol,
        snapshot.data_points,
        snapshot.short_ma,
        snapshot.long_ma
    );

    snapshot
}
