use crate::flight_control::PreflightPolicy;
use crate::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Startup settings of the console, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    connection: String,
    handshake_timeout: Duration,
    disarm_timeout: Duration,
    takeoff_alt_m: f32,
    preflight_policy: PreflightPolicy,
}

impl ConsoleConfig {
    const DEF_CONNECTION: &'static str = "udpin:127.0.0.1:14552";
    const DEF_HANDSHAKE_TIMEOUT_S: u64 = 10;
    const DEF_DISARM_TIMEOUT_S: u64 = 180;
    const DEF_TAKEOFF_ALT_M: f32 = 20.0;

    pub fn from_env() -> Self { Self::from_lookup(|key| env::var(key).ok()) }

    /// Builds the config from an arbitrary variable source.
    ///
    /// Unparsable values are reported and replaced by their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let connection = lookup("CHAOS_CONNECTION")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| Self::DEF_CONNECTION.to_string());
        let handshake_s =
            parse_or(&lookup, "CHAOS_HANDSHAKE_TIMEOUT_S", Self::DEF_HANDSHAKE_TIMEOUT_S);
        let disarm_s = parse_or(&lookup, "CHAOS_DISARM_TIMEOUT_S", Self::DEF_DISARM_TIMEOUT_S);
        let mut takeoff_alt_m = parse_or(&lookup, "CHAOS_TAKEOFF_ALT_M", Self::DEF_TAKEOFF_ALT_M);
        if !takeoff_alt_m.is_finite() || takeoff_alt_m <= 0.0 {
            warn!("CHAOS_TAKEOFF_ALT_M must be positive, using {}.", Self::DEF_TAKEOFF_ALT_M);
            takeoff_alt_m = Self::DEF_TAKEOFF_ALT_M;
        }
        let preflight_policy = match lookup("CHAOS_PREFLIGHT_STRICT").as_deref() {
            None | Some("" | "0" | "false") => PreflightPolicy::Optimistic,
            Some(_) => PreflightPolicy::Strict,
        };
        Self {
            connection,
            handshake_timeout: Duration::from_secs(handshake_s),
            disarm_timeout: Duration::from_secs(disarm_s),
            takeoff_alt_m,
            preflight_policy,
        }
    }

    pub fn connection(&self) -> &str { &self.connection }
    pub fn handshake_timeout(&self) -> Duration { self.handshake_timeout }
    pub fn disarm_timeout(&self) -> Duration { self.disarm_timeout }
    pub fn takeoff_alt_m(&self) -> f32 { self.takeoff_alt_m }
    pub fn preflight_policy(&self) -> PreflightPolicy { self.preflight_policy }
}

fn parse_or<T: FromStr + std::fmt::Display + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value '{raw}' for {key}, using {default}.");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::ConsoleConfig;
    use crate::flight_control::PreflightPolicy;
    use std::collections::HashMap;
    use std::time::Duration;

    fn config_from(vars: &[(&str, &str)]) -> ConsoleConfig {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        ConsoleConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.connection(), "udpin:127.0.0.1:14552");
        assert_eq!(config.handshake_timeout(), Duration::from_secs(10));
        assert_eq!(config.disarm_timeout(), Duration::from_secs(180));
        assert_eq!(config.takeoff_alt_m(), 20.0);
        assert_eq!(config.preflight_policy(), PreflightPolicy::Optimistic);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CHAOS_CONNECTION", "udpout:10.0.0.2:14550"),
            ("CHAOS_HANDSHAKE_TIMEOUT_S", "3"),
            ("CHAOS_DISARM_TIMEOUT_S", " 60 "),
            ("CHAOS_TAKEOFF_ALT_M", "35.5"),
            ("CHAOS_PREFLIGHT_STRICT", "1"),
        ]);
        assert_eq!(config.connection(), "udpout:10.0.0.2:14550");
        assert_eq!(config.handshake_timeout(), Duration::from_secs(3));
        assert_eq!(config.disarm_timeout(), Duration::from_secs(60));
        assert_eq!(config.takeoff_alt_m(), 35.5);
        assert_eq!(config.preflight_policy(), PreflightPolicy::Strict);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("CHAOS_CONNECTION", "  "),
            ("CHAOS_HANDSHAKE_TIMEOUT_S", "soon"),
            ("CHAOS_DISARM_TIMEOUT_S", "-5"),
            ("CHAOS_TAKEOFF_ALT_M", "-10"),
            ("CHAOS_PREFLIGHT_STRICT", "false"),
        ]);
        assert_eq!(config, config_from(&[]));
    }
}
