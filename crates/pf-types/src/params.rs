use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single named value passed to an external program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Named parameters for one program invocation.
///
/// Keys live in a BTreeMap so the argument list always comes out in the
/// same order for the same mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Command-line rendering, one `key=value` argument per entry.
    pub fn to_args(&self) -> Vec<String> {
        self.0.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_are_sorted_key_value_pairs() {
        let mut params = ParamSet::new();
        params.set("seed", 1729u64);
        params.set("m", 100u32);
        params.set("k", 10u32);
        assert_eq!(params.to_args(), vec!["k=10", "m=100", "seed=1729"]);
    }

    #[test]
    fn bools_render_lowercase() {
        let mut params = ParamSet::new();
        params.set("exploit", false);
        assert_eq!(params.to_args(), vec!["exploit=false"]);
        params.set("exploit", true);
        assert_eq!(params.to_args(), vec!["exploit=true"]);
    }

    #[test]
    fn floats_render_plainly() {
        let mut params = ParamSet::new();
        params.set("stdev", 0.001);
        params.set("tau", 1000000.0);
        assert_eq!(params.to_args(), vec!["stdev=0.001", "tau=1000000"]);
    }

    #[test]
    fn later_set_wins() {
        let mut params = ParamSet::new();
        params.set("grid", 100u32);
        params.set("grid", 200u32);
        assert_eq!(params.get("grid"), Some(&ParamValue::Int(200)));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn serde_round_trip() {
        let mut params = ParamSet::new();
        params.set("stdev", 0.01);
        params.set("seed", 99u64);
        params.set("exploit", true);
        params.set("solver", "vrls");
        let json = serde_json::to_string(&params).unwrap();
        let back: ParamSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
