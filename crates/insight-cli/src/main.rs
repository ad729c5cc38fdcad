//! insight-cli: print a directional insight for one symbol.
//!
//! Combines recent news sentiment with moving-average trend, volume and
//! volatility from daily price history.
//!
//! Usage:
//!   cargo run -p insight-cli -- AAPL
//!   cargo run -p insight-cli -- AAPL 2024-03-08
//!   cargo run -p insight-cli -- AAPL --json

use analysis_core::{Insight, InsightConfig};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use insight_orchestrator::InsightService;

struct Args {
    symbol: String,
    as_of: NaiveDate,
    json: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  insight-cli SYMBOL [YYYY-MM-DD] [--json]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --json    Print the insight as JSON");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  NEWSAPI_KEY              Enables the NewsAPI primary source");
    eprintln!("  INSIGHT_CACHE_TTL_SECS   Result cache lifetime (default 300)");
    eprintln!("  INSIGHT_LEXICON_PATH     JSON file overriding the sentiment lexicon");
}

fn parse_args(raw: &[String]) -> anyhow::Result<Option<Args>> {
    let json = raw.iter().any(|a| a == "--json");
    let positional: Vec<&String> = raw.iter().filter(|a| !a.starts_with("--")).collect();

    let Some(symbol) = positional.first() else {
        return Ok(None);
    };
    let as_of = match positional.get(1) {
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid date {:?}, expected YYYY-MM-DD", date))?,
        None => Utc::now().date_naive(),
    };

    Ok(Some(Args {
        symbol: symbol.to_uppercase(),
        as_of,
        json,
    }))
}

fn print_report(insight: &Insight) {
    println!("{} as of {}", insight.symbol, insight.as_of);
    println!(
        "Call: {} ({} confidence)",
        insight.direction.to_label(),
        insight.confidence.to_label()
    );
    println!(
        "News: {} articles via {} | {} positive, {} negative, {} neutral",
        insight.article_count,
        insight.source_label,
        insight.sentiment.positive,
        insight.sentiment.negative,
        insight.sentiment.neutral
    );
    if !insight.dominant_reasons.is_empty() {
        println!("Reasons: {}", insight.dominant_reasons.join(", "));
    }

    let t = &insight.technical;
    let fmt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v));
    println!(
        "Technicals: close {} ({}%), short MA {}, long MA {}, volume x{}, volatility {}%",
        fmt(t.latest_close),
        fmt(t.daily_change_pct),
        fmt(t.short_ma),
        fmt(t.long_ma),
        fmt(t.volume_ratio),
        fmt(t.volatility)
    );

    if let Some(forecast) = &insight.forecast {
        println!(
            "Weekly forecast: {:.2} -> {:.2} ({:+.2}%, {} confidence{})",
            forecast.current_price,
            forecast.forecast_price,
            forecast.percent_change,
            forecast.confidence.to_label(),
            if forecast.factors.is_empty() {
                String::new()
            } else {
                format!(": {}", forecast.factors.join(", "))
            }
        );
    }

    println!();
    for line in &insight.highlights {
        println!("  - {}", line);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "insight_cli=info,insight_orchestrator=info,news_aggregator=info".into()
        })
    };
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(env_filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    }

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let Some(args) = parse_args(&raw)? else {
        print_usage();
        std::process::exit(1);
    };

    let config = InsightConfig::from_env().context("invalid configuration")?;
    let service = InsightService::from_config(config)?;
    tracing::info!(
        "Analyzing {} as of {} (news sources: {})",
        args.symbol,
        args.as_of,
        service.news_sources().join(" -> ")
    );

    match service.latest_quote(&args.symbol).await {
        Ok(quote) => tracing::info!("Latest {} close: {:.2}", args.symbol, quote.close),
        Err(e) => tracing::warn!("No current quote for {}: {}", args.symbol, e),
    }

    let insight = service
        .get_insight(&args.symbol, args.as_of)
        .await
        .with_context(|| format!("no insight for {}", args.symbol))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(insight.as_ref())?);
    } else {
        print_report(&insight);
    }

    Ok(())
}
