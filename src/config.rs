use serde::Deserialize;

/// Payment years used when the environment does not override them.
pub const DEFAULT_PAYMENT_YEARS: [i32; 6] = [2020, 2021, 2022, 2023, 2024, 2025];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub registry_base_url: String,
    pub registry_timeout_secs: u64,
    /// Years every new record gets one installment for, ascending.
    pub payment_years: Vec<i32>,
    pub default_neighborhood: String,
    pub default_district: String,
    pub map_fit_padding: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            registry_base_url: std::env::var("REGISTRY_BASE_URL")
                .map_err(|_| anyhow::anyhow!("REGISTRY_BASE_URL environment variable required"))
                .and_then(|raw| {
                    if raw.trim().is_empty() {
                        anyhow::bail!("REGISTRY_BASE_URL cannot be empty");
                    }
                    let parsed = url::Url::parse(raw.trim())
                        .map_err(|e| anyhow::anyhow!("REGISTRY_BASE_URL is not a valid URL: {}", e))?;
                    if parsed.scheme() != "http" && parsed.scheme() != "https" {
                        anyhow::bail!("REGISTRY_BASE_URL must start with http:// or https://");
                    }
                    Ok(raw.trim().to_string())
                })?,
            registry_timeout_secs: std::env::var("REGISTRY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REGISTRY_TIMEOUT_SECS must be a whole number of seconds"))?,
            payment_years: match std::env::var("PAYMENT_YEARS") {
                Ok(raw) if !raw.trim().is_empty() => parse_payment_years(&raw)?,
                _ => DEFAULT_PAYMENT_YEARS.to_vec(),
            },
            default_neighborhood: std::env::var("DEFAULT_NEIGHBORHOOD")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "Centro".to_string()),
            default_district: std::env::var("DEFAULT_DISTRICT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "Puno".to_string()),
            map_fit_padding: std::env::var("MAP_FIT_PADDING")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAP_FIT_PADDING must be a number of pixels"))?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Registry base URL: {}", config.registry_base_url);
        tracing::debug!("Payment years: {:?}", config.payment_years);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Parses `PAYMENT_YEARS`, either an inclusive range (`2020-2025`) or a comma list.
/// The result is sorted ascending with duplicates removed.
pub fn parse_payment_years(raw: &str) -> anyhow::Result<Vec<i32>> {
    let raw = raw.trim();
    let mut years: Vec<i32> = if let Some((start, end)) = raw.split_once('-') {
        let start: i32 = start
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("PAYMENT_YEARS range start is not a year: {}", start))?;
        let end: i32 = end
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("PAYMENT_YEARS range end is not a year: {}", end))?;
        if end < start {
            anyhow::bail!("PAYMENT_YEARS range is reversed: {}", raw);
        }
        (start..=end).collect()
    } else {
        raw.split(',')
            .map(|part| {
                part.trim()
                    .parse::<i32>()
                    .map_err(|_| anyhow::anyhow!("PAYMENT_YEARS entry is not a year: {}", part))
            })
            .collect::<anyhow::Result<_>>()?
    };

    years.sort_unstable();
    years.dedup();
    if years.is_empty() {
        anyhow::bail!("PAYMENT_YEARS cannot be empty");
    }
    Ok(years)
}
