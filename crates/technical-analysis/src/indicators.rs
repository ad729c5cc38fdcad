use analysis_core::stats::{mean, pct_returns, std_dev};

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    data.windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Most recent SMA value, `None` when the series is shorter than the window
pub fn latest_sma(data: &[f64], period: usize) -> Option<f64> {
    sma(data, period).last().copied()
}

/// Latest volume relative to the mean of the trailing `window` volumes
/// (latest included).
pub fn volume_ratio(volumes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || volumes.len() < window {
        return None;
    }

    let trailing = &volumes[volumes.len() - window..];
    let avg = mean(trailing);
    if avg <= 0.0 {
        return None;
    }
    trailing.last().map(|latest| latest / avg)
}

/// Realized volatility: sample std dev of daily % returns across the last
/// `window` closes.
pub fn realized_volatility(closes: &[f64], window: usize) -> Option<f64> {
    if window < 3 || closes.len() < window {
        return None;
    }

    let returns = pct_returns(&closes[closes.len() - window..]);
    if returns.len() < 2 {
        return None;
    }
    Some(std_dev(&returns))
}

/// Percent change across the trailing `window` closes, or across the whole
/// series when it is shorter.
pub fn momentum_pct(closes: &[f64], window: usize) -> Option<f64> {
    if window < 2 || closes.len() < 2 {
        return None;
    }

    let trailing = &closes[closes.len() - window.min(closes.len())..];
    match trailing {
        [first, .., last] if *first > 0.0 => Some((last - first) / first * 100.0),
        _ => None,
    }
}

/// Fractional change from the first to the last of the trailing `window`
/// volumes. A zero starting volume reads as no trend.
pub fn volume_trend(volumes: &[f64], window: usize) -> Option<f64> {
    if window < 2 || volumes.len() < window {
        return None;
    }

    let trailing = &volumes[volumes.len() - window..];
    match trailing {
        [first, .., last] if *first > 0.0 => Some((last - first) / first),
        _ => Some(0.0),
    }
}

/// Percent change of the last close versus the one before it
pub fn daily_change_pct(closes: &[f64]) -> Option<f64> {
    match closes {
        [.., prev, last] if *prev > 0.0 => Some((last - prev) / prev * 100.0),
        _ => None,
    }
}
