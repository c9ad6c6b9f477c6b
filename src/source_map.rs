//! Source map chaining between a carrier's prior map and the engine's map.

use crate::error::StageError;
use parcel_sourcemap::SourceMap;
use serde_json::Value;

/// Chain `produced` through `prior`, so its mappings point at the prior map's originals
pub fn chain(prior: Option<SourceMap>, mut produced: SourceMap) -> Result<SourceMap, StageError> {
    match prior {
        Some(mut prior) => {
            produced
                .extends(&mut prior)
                .map_err(|e| StageError::SourceMap(format!("{:?}", e)))?;
            Ok(produced)
        }
        None => Ok(produced),
    }
}

/// Serialize a map as a JSON value for the details report
pub fn to_value(map: &mut SourceMap) -> Result<Value, StageError> {
    let json = map
        .to_json(None)
        .map_err(|e| StageError::SourceMap(format!("{:?}", e)))?;
    serde_json::from_str(&json).map_err(|e| StageError::SourceMap(e.to_string()))
}

/// Parse a v3 source map, e.g. one written next to a stylesheet by an earlier tool
pub fn from_json(json: &str) -> Result<SourceMap, StageError> {
    SourceMap::from_json("/", json).map_err(|e| StageError::SourceMap(format!("{:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIOR: &str = r#"{"version":3,"sources":["a.css"],"names":[],"mappings":"AAAA"}"#;

    #[test]
    fn test_round_trip_through_json() {
        let mut map = from_json(PRIOR).unwrap();
        let value = to_value(&mut map).unwrap();
        assert_eq!(value["version"], 3);
        assert!(value["sources"].to_string().contains("a.css"));
    }

    #[test]
    fn test_chain_without_prior_keeps_map() {
        let produced = from_json(PRIOR).unwrap();
        let mut chained = chain(None, produced).unwrap();
        let value = to_value(&mut chained).unwrap();
        assert!(value["sources"].to_string().contains("a.css"));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = from_json("not a map").unwrap_err();
        assert!(matches!(err, StageError::SourceMap(_)));
    }
}
