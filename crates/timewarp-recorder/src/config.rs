use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Knobs controlling what the recorder captures and how aggressively it
/// truncates or samples. Defaults match the ones the source recorder
/// shipped with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub capture_session_state: bool,
    pub capture_task_state: bool,
    pub capture_workspace: bool,
    pub capture_input_output: bool,
    /// When false, LLM call captures omit prompt/completion text and keep
    /// only token counts, cost and timing.
    pub capture_full_llm_context: bool,
    /// Fraction of checkpoints to persist, in `[0, 1]`. `1.0` records all.
    pub sample_rate: f64,
    pub max_input_size: usize,
    pub max_output_size: usize,
    #[serde(with = "duration_secs")]
    pub retention: Duration,
    pub batch_size: usize,
    #[serde(with = "duration_secs")]
    pub flush_interval: Duration,
    #[serde(with = "duration_secs")]
    pub auto_purge_age: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            capture_session_state: true,
            capture_task_state: true,
            capture_workspace: true,
            capture_input_output: true,
            capture_full_llm_context: false,
            sample_rate: 1.0,
            max_input_size: 64 * 1024,
            max_output_size: 64 * 1024,
            retention: Duration::from_secs(7 * 24 * 3600),
            batch_size: 50,
            flush_interval: Duration::from_secs(1),
            auto_purge_age: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.sample_rate) {
            return Err(format!(
                "sample_rate must be within [0, 1], got {}",
                self.sample_rate
            ));
        }
        if self.batch_size == 0 {
            return Err("batch_size must be nonzero".to_string());
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source_recorder() {
        let cfg = RecorderConfig::default();
        assert!(cfg.capture_session_state);
        assert!(!cfg.capture_full_llm_context);
        assert_eq!(cfg.sample_rate, 1.0);
        assert_eq!(cfg.max_input_size, 64 * 1024);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.retention, Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn rejects_out_of_range_sample_rate() {
        let mut cfg = RecorderConfig::default();
        cfg.sample_rate = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = RecorderConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let parsed: RecorderConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.sample_rate, cfg.sample_rate);
    }
}
