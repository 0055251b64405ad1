//! Conversion between model nodes and an external data format.

use crate::errors::ModelResult;
use crate::node::Node;

/// Converts external data to model nodes and back.
pub trait DataProcessor {
    fn to_model(&self, data: &str) -> ModelResult<Vec<Node>>;

    fn to_data(&self, nodes: &[Node]) -> ModelResult<String>;
}

/// Nodes as a JSON array, in the model's own wire format.
#[derive(Debug, Clone, Default)]
pub struct JsonDataProcessor {
    pub pretty: bool,
}

impl JsonDataProcessor {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl DataProcessor for JsonDataProcessor {
    fn to_model(&self, data: &str) -> ModelResult<Vec<Node>> {
        Ok(serde_json::from_str(data)?)
    }

    fn to_data(&self, nodes: &[Node]) -> ModelResult<String> {
        let data = if self.pretty {
            serde_json::to_string_pretty(nodes)?
        } else {
            serde_json::to_string(nodes)?
        };
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ModelError;
    use crate::node::Element;

    #[test]
    fn test_json_round_trip() {
        let processor = JsonDataProcessor::default();
        let nodes = vec![
            Node::Element(Element::new("paragraph").with_children(vec![Node::text("hi")])),
            Node::text("tail"),
        ];
        let data = processor.to_data(&nodes).unwrap();
        assert_eq!(processor.to_model(&data).unwrap(), nodes);
    }

    #[test]
    fn test_invalid_data() {
        let err = JsonDataProcessor::default().to_model("{not json").unwrap_err();
        assert!(matches!(err, ModelError::Serialization(_)));
    }
}
