use signal_core::AssetSignal;

/// Composite quality rating: 60% technicals, 40% news sentiment.
///
/// Trend score is already on a 0-100 scale; sentiment impact (-10..+10) is
/// remapped to 0..100 before blending. Result is rounded and clamped to
/// [0, 100].
pub fn composite_score(signal: &AssetSignal) -> f64 {
    let technical = signal.trend_score;
    let sentiment = (signal.news_sentiment_impact + 10.0) * 5.0;

    let composite = technical * 0.6 + sentiment * 0.4;

    composite.clamp(0.0, 100.0).round()
}
