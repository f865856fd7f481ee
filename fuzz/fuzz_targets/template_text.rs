//! Fuzz target for whole template resolution.
//!
//! Builds templates from arbitrary fragments and node shapes and resolves
//! them. Resolution may fail but must never panic.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_template_text
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sqlweave_core::scripting::{DynamicTemplate, ForEachNode, IfNode, SqlNode, TrimNode};
use sqlweave_core::{TemplateConfig, Value};

#[derive(Debug, Arbitrary)]
enum FuzzNode {
    Text(String),
    Inline(String),
    If(String, Box<FuzzNode>),
    ForEach(String, String, Box<FuzzNode>),
    Where(Vec<FuzzNode>),
    Mixed(Vec<FuzzNode>),
}

impl FuzzNode {
    fn build(self, config: &TemplateConfig) -> Option<SqlNode> {
        Some(match self {
            Self::Text(text) => SqlNode::text(text),
            Self::Inline(text) => SqlNode::parse_text(&text, config).ok()?,
            Self::If(test, body) => IfNode::new(&test, body.build(config)?).ok()?.into(),
            Self::ForEach(collection, item, body) => ForEachNode::new(&collection, body.build(config)?)
                .ok()?
                .item(item)
                .separator(",")
                .nullable(true)
                .into(),
            Self::Where(children) => TrimNode::where_clause(SqlNode::mixed(
                children.into_iter().filter_map(|c| c.build(config)).collect(),
            ))
            .into(),
            Self::Mixed(children) => {
                SqlNode::mixed(children.into_iter().filter_map(|c| c.build(config)).collect())
            }
        })
    }
}

fuzz_target!(|node: FuzzNode| {
    let config = TemplateConfig::default();
    let Some(root) = node.build(&config) else {
        return;
    };

    let param: Value = serde_json::json!({
        "ids": [1, 2, 3],
        "name": "ada",
        "nested": {"rows": [[1], [2, 3]]},
        "n": 2
    })
    .into();

    let template = DynamicTemplate::with_config(root, config).expect("default config is valid");
    if let Ok(first) = template.resolve(&param) {
        let second = template.resolve(&param).expect("resolution is deterministic");
        assert_eq!(first, second);
    }
});
