/// Strongly-typed device and channel configuration.
///
/// Scenario files describe links with the textual forms `"5Mbps"` and
/// `"2ms"`; these parse into `DataRate` and `Delay` at load time, so a
/// bad value fails the build instead of surfacing mid-run through a
/// string-keyed attribute lookup.

use crate::error::{SimError, SimResult};

// ── Delay ─────────────────────────────────────────────────────────────

/// A propagation or scheduling delay, stored in nanosecond ticks.
///
/// Parses `"2ms"`, `"10us"`, `"1.5s"`, `"500ns"`. Negative values are
/// rejected at parse time; the tick representation is unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Deserialize)]
#[serde(try_from = "String")]
pub struct Delay(u64);

impl Delay {
    /// Zero delay.
    pub const ZERO: Delay = Delay(0);

    /// From raw nanosecond ticks.
    #[inline]
    pub const fn from_ticks(ticks: u64) -> Self {
        Delay(ticks)
    }

    /// From whole milliseconds.
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Delay(millis * 1_000_000)
    }

    /// Nanosecond tick value.
    #[inline]
    pub const fn ticks(self) -> u64 {
        self.0
    }
}

impl std::str::FromStr for Delay {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        let s = s.trim();
        let (value, scale) = if let Some(v) = s.strip_suffix("ns") {
            (v, 1.0)
        } else if let Some(v) = s.strip_suffix("us") {
            (v, 1e3)
        } else if let Some(v) = s.strip_suffix("ms") {
            (v, 1e6)
        } else if let Some(v) = s.strip_suffix('s') {
            (v, 1e9)
        } else {
            return Err(SimError::InvalidConfig(format!(
                "delay '{}' needs a unit (ns, us, ms, s)",
                s
            )));
        };

        let value: f64 = value.trim().parse().map_err(|_| {
            SimError::InvalidConfig(format!("delay '{}' is not a number", s))
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "delay '{}' must be finite and non-negative",
                s
            )));
        }
        Ok(Delay((value * scale).round() as u64))
    }
}

impl TryFrom<String> for Delay {
    type Error = SimError;

    fn try_from(s: String) -> SimResult<Self> {
        s.parse()
    }
}

impl std::fmt::Display for Delay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 % 1_000_000 == 0 {
            write!(f, "{}ms", self.0 / 1_000_000)
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}

// ── DataRate ──────────────────────────────────────────────────────────

/// A link data rate in bits per second.
///
/// Parses `"5Mbps"`, `"1Gbps"`, `"56Kbps"`, `"9600bps"` (unit prefixes
/// accepted in either case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Deserialize)]
#[serde(try_from = "String")]
pub struct DataRate(u64);

impl DataRate {
    /// From raw bits per second. Zero is rejected.
    pub fn from_bps(bps: u64) -> SimResult<Self> {
        if bps == 0 {
            return Err(SimError::InvalidConfig("data rate must be non-zero".into()));
        }
        Ok(DataRate(bps))
    }

    /// Bits per second.
    #[inline]
    pub const fn bps(self) -> u64 {
        self.0
    }

    /// Ticks needed to serialize `bytes` onto the wire at this rate.
    ///
    /// `bytes * 8 / rate` seconds, in nanoseconds, rounded up so that a
    /// transmission never completes early.
    pub fn serialization_ticks(self, bytes: usize) -> u64 {
        let bits = bytes as u128 * 8;
        let ns = (bits * 1_000_000_000 + self.0 as u128 - 1) / self.0 as u128;
        ns as u64
    }
}

impl std::str::FromStr for DataRate {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        let raw = s.trim();
        let lower = raw.to_ascii_lowercase();
        let (value, scale) = if let Some(v) = lower.strip_suffix("gbps") {
            (v, 1e9)
        } else if let Some(v) = lower.strip_suffix("mbps") {
            (v, 1e6)
        } else if let Some(v) = lower.strip_suffix("kbps") {
            (v, 1e3)
        } else if let Some(v) = lower.strip_suffix("bps") {
            (v, 1.0)
        } else {
            return Err(SimError::InvalidConfig(format!(
                "data rate '{}' needs a unit (bps, Kbps, Mbps, Gbps)",
                raw
            )));
        };

        let value: f64 = value.trim().parse().map_err(|_| {
            SimError::InvalidConfig(format!("data rate '{}' is not a number", raw))
        })?;
        if !value.is_finite() || value <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "data rate '{}' must be positive",
                raw
            )));
        }
        Ok(DataRate((value * scale).round() as u64))
    }
}

impl TryFrom<String> for DataRate {
    type Error = SimError;

    fn try_from(s: String) -> SimResult<Self> {
        s.parse()
    }
}

impl std::fmt::Display for DataRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 % 1_000_000 == 0 {
            write!(f, "{}Mbps", self.0 / 1_000_000)
        } else {
            write!(f, "{}bps", self.0)
        }
    }
}

// ── Device / Channel config ───────────────────────────────────────────

/// Per-device configuration, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Serialization rate of the device's transmitter.
    pub data_rate: DataRate,
    /// Largest packet the device will put on the wire, in bytes.
    pub mtu: u16,
}

impl DeviceConfig {
    /// Standard Ethernet-style MTU.
    pub const DEFAULT_MTU: u16 = 1500;

    /// A device with the given rate and the default MTU.
    pub fn new(data_rate: DataRate) -> Self {
        DeviceConfig {
            data_rate,
            mtu: Self::DEFAULT_MTU,
        }
    }

    /// Override the MTU.
    pub fn with_mtu(mut self, mtu: u16) -> Self {
        self.mtu = mtu;
        self
    }
}

/// Per-channel configuration, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    /// Propagation delay applied to every transmission on the channel.
    pub delay: Delay,
    /// Probability that any single delivery is dropped, in `[0, 1]`.
    pub drop_probability: f64,
}

impl ChannelConfig {
    /// A lossless channel with the given propagation delay.
    pub fn new(delay: Delay) -> Self {
        ChannelConfig {
            delay,
            drop_probability: 0.0,
        }
    }

    /// A lossy channel. Fails if the probability is outside `[0, 1]`.
    pub fn lossy(delay: Delay, drop_probability: f64) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&drop_probability) {
            return Err(SimError::InvalidConfig(format!(
                "drop probability {} outside [0, 1]",
                drop_probability
            )));
        }
        Ok(ChannelConfig {
            delay,
            drop_probability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_parse_units() {
        assert_eq!("2ms".parse::<Delay>().unwrap().ticks(), 2_000_000);
        assert_eq!("10us".parse::<Delay>().unwrap().ticks(), 10_000);
        assert_eq!("1s".parse::<Delay>().unwrap().ticks(), 1_000_000_000);
        assert_eq!("500ns".parse::<Delay>().unwrap().ticks(), 500);
        assert_eq!("1.5ms".parse::<Delay>().unwrap().ticks(), 1_500_000);
    }

    #[test]
    fn test_delay_parse_rejects_garbage() {
        assert!("2".parse::<Delay>().is_err());
        assert!("fast".parse::<Delay>().is_err());
        assert!("-2ms".parse::<Delay>().is_err());
    }

    #[test]
    fn test_delay_display() {
        assert_eq!(Delay::from_millis(2).to_string(), "2ms");
        assert_eq!(Delay::from_ticks(500).to_string(), "500ns");
    }

    #[test]
    fn test_data_rate_parse_units() {
        assert_eq!("5Mbps".parse::<DataRate>().unwrap().bps(), 5_000_000);
        assert_eq!("1Gbps".parse::<DataRate>().unwrap().bps(), 1_000_000_000);
        assert_eq!("56Kbps".parse::<DataRate>().unwrap().bps(), 56_000);
        assert_eq!("9600bps".parse::<DataRate>().unwrap().bps(), 9_600);
        assert_eq!("5mbps".parse::<DataRate>().unwrap().bps(), 5_000_000);
    }

    #[test]
    fn test_data_rate_parse_rejects_garbage() {
        assert!("5".parse::<DataRate>().is_err());
        assert!("0bps".parse::<DataRate>().is_err());
        assert!("-5Mbps".parse::<DataRate>().is_err());
    }

    #[test]
    fn test_serialization_ticks() {
        // 1024 bytes at 5 Mbps: 8192 bits / 5e6 bps = 1.6384 ms.
        let rate: DataRate = "5Mbps".parse().unwrap();
        assert_eq!(rate.serialization_ticks(1024), 1_638_400);
        // Rounds up: 1 byte at 1 Gbps = 8 ns exactly.
        let gig: DataRate = "1Gbps".parse().unwrap();
        assert_eq!(gig.serialization_ticks(1), 8);
    }

    #[test]
    fn test_device_config_defaults() {
        let cfg = DeviceConfig::new("5Mbps".parse().unwrap());
        assert_eq!(cfg.mtu, 1500);
        assert_eq!(cfg.with_mtu(9000).mtu, 9000);
    }

    #[test]
    fn test_channel_config_validation() {
        assert!(ChannelConfig::lossy(Delay::from_millis(2), 0.5).is_ok());
        assert!(ChannelConfig::lossy(Delay::from_millis(2), 1.5).is_err());
        assert!(ChannelConfig::lossy(Delay::from_millis(2), -0.1).is_err());
    }
}
