use serde::Serialize;

use crate::stats::StatsSnapshot;

/// JSON shape for the engine's debug surface (§6): a cache name, its stats
/// snapshot, and its current key set. A caller wires this into whatever web
/// framework it uses; this crate ships no HTTP server.
#[derive(Debug, Clone, Serialize)]
pub struct DebugSnapshot {
    pub name: String,
    pub stats: StatsSnapshot,
    pub keys: Vec<String>,
}

impl DebugSnapshot {
    pub fn new(name: impl Into<String>, stats: StatsSnapshot, keys: Vec<String>) -> Self {
        Self {
            name: name.into(),
            stats,
            keys,
        }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::error::Error::ConfigInvalid(format!("debug snapshot: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_has_name_stats_and_keys() {
        let stats = StatsSnapshot {
            hits: 1,
            misses: 2,
            evictions: 0,
            invalidations: 0,
            in_flight: 0,
            key_count: 1,
            hit_rate: 0.333,
        };
        let snapshot = DebugSnapshot::new("c", stats, vec!["a".to_string()]);
        let json = snapshot.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["name"], "c");
        assert_eq!(parsed["stats"]["hits"], 1);
        assert_eq!(parsed["keys"][0], "a");
    }
}
