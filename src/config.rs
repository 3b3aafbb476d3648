use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
  #[serde(default = "default_true")]
  pub compiler_enabled: bool,
  /// Milliseconds a warping thread may run before it has to yield.
  #[serde(default = "default_warp_time")]
  pub warp_time: u64,
}

fn default_true() -> bool {
  true
}

fn default_warp_time() -> u64 {
  500
}

impl Default for Config {
  fn default() -> Self {
    Config {
      compiler_enabled: default_true(),
      warp_time: default_warp_time(),
    }
  }
}

impl Config {
  pub fn from_json(json: &str) -> serde_json::Result<Self> {
    serde_json::from_str(json)
  }

  pub fn warp_budget(&self) -> Duration {
    Duration::from_millis(self.warp_time)
  }
}
