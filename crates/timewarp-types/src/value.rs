/// An open, string-keyed collection of opaque values.
///
/// The spec models inputs/outputs/workspace entries/metadata as a tagged sum
/// type over null, boolean, integer, float, string, ordered list and
/// string-keyed mapping — which is exactly what `serde_json::Value` already
/// is. Rather than re-invent that enum, `Value` is a thin alias: canonical
/// serialization, shallow equality (`PartialEq`) and JSON wire format all
/// come for free, and every store backend already speaks JSON.
pub type Value = serde_json::Value;

/// Canonical byte length used for truncation-size accounting.
pub fn canonical_byte_len(value: &Value) -> usize {
    serde_json::to_vec(value).map(|buf| buf.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn byte_len_matches_serialized_length() {
        let v = json!({"a": 1, "b": [1,2,3]});
        let expected = serde_json::to_vec(&v).unwrap().len();
        assert_eq!(canonical_byte_len(&v), expected);
    }
}
