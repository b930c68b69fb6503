// Function schema advertised by the action group
//
// The same definition is registered with the agent at deploy time and used by
// the Lambda to decide which function it was asked to run.

use serde::Serialize;
use std::collections::BTreeMap;

/// Function that reports table statistics and refreshes them when stale
pub const CHECK_TABLE_METADATA: &str = "check_table_metadata";

/// Parameter carrying the table to inspect
pub const TABLE_NAME_PARAM: &str = "table_name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDefinition {
    pub description: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: ParameterType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, ParameterDefinition>,
}

impl FunctionDefinition {
    /// `check_table_metadata(table_name: string)`
    pub fn check_table_metadata() -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(
            TABLE_NAME_PARAM.to_string(),
            ParameterDefinition {
                description: "the name of the table to get optimisation statistics".to_string(),
                required: true,
                kind: ParameterType::String,
            },
        );

        Self {
            name: CHECK_TABLE_METADATA.to_string(),
            description: "get optimisation statistics for table".to_string(),
            parameters,
        }
    }
}

/// All functions served by the action group
pub fn action_group_functions() -> Vec<FunctionDefinition> {
    vec![FunctionDefinition::check_table_metadata()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_table_metadata_schema() {
        let value = serde_json::to_value(action_group_functions()).unwrap();
        assert_eq!(
            value,
            json!([{
                "name": "check_table_metadata",
                "description": "get optimisation statistics for table",
                "parameters": {
                    "table_name": {
                        "description": "the name of the table to get optimisation statistics",
                        "required": true,
                        "type": "string"
                    }
                }
            }])
        );
    }
}
