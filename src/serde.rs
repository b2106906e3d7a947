use crate::schema::{TypeExpr, UserValidator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The JSON document form of a parsed schema repository.
///
/// This is the serde-friendly shape a schema compiler emits and
/// [`Repository::from_serde`](../repository/struct.Repository.html#method.from_serde)
/// consumes. It performs no validity checks of its own; it is just the wire
/// format.
#[derive(Debug, PartialEq, Deserialize, Serialize, Default, Clone)]
pub struct SerdeRepository {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, TypeExpr>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<UserValidator>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roundtrip_json() {
        let data = json!({
            "version": "0.14.2",
            "types": {
                "Root": {
                    "record": {
                        "fields": [
                            {
                                "name": "id",
                                "type": {
                                    "named": {
                                        "name": "Int",
                                        "constraints": [
                                            {
                                                "name": "min",
                                                "args": { "call": [ { "value": { "literal": { "int": 1 } } } ] },
                                            },
                                        ],
                                    },
                                },
                            },
                            {
                                "name": "note",
                                "type": { "nullableNamed": "String" },
                                "optional": true,
                            },
                            {
                                "name": "legacy",
                                "type": "absent",
                            },
                        ],
                    },
                },
                "Tags": {
                    "array": {
                        "item": { "named": { "name": "String" } },
                        "constraints": [
                            { "name": "min", "args": { "call": [ { "value": { "literal": { "int": 1 } } } ] } },
                        ],
                    },
                },
            },
            "validators": [
                {
                    "target": "Int",
                    "name": "minBound",
                    "params": [
                        { "name": "i", "typeHint": "Int", "default": { "literal": { "int": 2 } } },
                    ],
                    "body": {
                        "predicate": {
                            "compare": {
                                "op": "ge",
                                "left": { "path": { "root": "this" } },
                                "right": { "path": { "root": "variable", "name": "$i" } },
                            },
                        },
                    },
                },
            ],
        });

        let parsed: SerdeRepository =
            serde_json::from_value(data.clone()).expect("failed to parse document");
        assert_eq!(parsed.types.len(), 2);
        assert_eq!(parsed.validators.len(), 1);

        let round_trip = serde_json::to_value(&parsed).expect("failed to serialize document");
        assert_eq!(round_trip, data);
    }
}
