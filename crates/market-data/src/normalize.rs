/// Crypto symbols that need the provider's `-USD` suffix form
const CRYPTO_SYMBOLS: &[&str] = &[
    "BTC", "ETH", "XRP", "DOGE", "ADA", "SOL", "DOT", "USDT", "USDC", "LINK", "LTC",
];

/// Spelled-out names that map to a base crypto symbol
const CRYPTO_ALIASES: &[(&str, &str)] = &[
    ("BITCOIN", "BTC"),
    ("ETHEREUM", "ETH"),
    ("DOGECOIN", "DOGE"),
    ("CARDANO", "ADA"),
    ("SOLANA", "SOL"),
];

/// Normalize a ticker to the provider's symbol form.
///
/// Crypto assets get the `-USD` suffix (`BTC` -> `BTC-USD`, `BTCUSD` ->
/// `BTC-USD`); equities and ETFs pass through uppercased.
pub fn normalize_ticker(ticker: &str) -> String {
    let upper = ticker.trim().to_uppercase();

    // Already in suffix form
    if upper.ends_with("-USD") {
        return upper;
    }

    if CRYPTO_SYMBOLS.contains(&upper.as_str()) {
        return format!("{}-USD", upper);
    }

    for (alias, symbol) in CRYPTO_ALIASES {
        if upper == *alias {
            return format!("{}-USD", symbol);
        }
    }

    // Collapse BTCUSD-style concatenations
    if upper.ends_with("USD") {
        let base = &upper[..upper.len() - 3];
        if CRYPTO_SYMBOLS.contains(&base) {
            return format!("{}-USD", base);
        }
    }

    upper
}
