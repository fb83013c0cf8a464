/// Stable per-ticker seed (FNV-1a over the ticker bytes) so seeded signal
/// attributes and synthetic history are reproducible across runs.
pub fn ticker_seed(ticker: &str) -> u64 {
    ticker
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
            (hash ^ byte as u64).wrapping_mul(0x100_0000_01b3)
        })
}
