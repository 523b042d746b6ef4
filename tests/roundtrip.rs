//! Property-based tests for the codec laws: round-trip, format equivalence
//! and determinism.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use rust_yangcodec::{
    CodecEngine, Decimal64, EncodingFormat, ErrorKind, ObjectNode, Scalar, SchemaNode, SchemaTree,
    YangType,
};

fn engine() -> CodecEngine {
    let root = SchemaNode::container("Isis")
        .with_namespace("urn:example:isis")
        .with_child(SchemaNode::leaf("enabled", YangType::Boolean))
        .with_child(SchemaNode::leaf("description", YangType::String))
        .with_child(SchemaNode::leaf("level", YangType::enumeration(["level-1", "level-2"])))
        .with_child(SchemaNode::leaf(
            "cost",
            YangType::Union(vec![YangType::Int32, YangType::String]),
        ))
        .with_child(SchemaNode::leaf_list("tags", YangType::Uint16))
        .with_child(
            SchemaNode::container("Timers")
                .with_child(SchemaNode::leaf("hello", YangType::Decimal64 { fraction_digits: 3 }))
                .with_child(SchemaNode::leaf("passive", YangType::Empty)),
        )
        .with_child(
            SchemaNode::list("Interfaces", ["name"])
                .with_child(SchemaNode::leaf("name", YangType::String))
                .with_child(SchemaNode::leaf("metric", YangType::Int64))
                .with_child(SchemaNode::leaf("key", YangType::Binary)),
        )
        .with_child(
            SchemaNode::list("Adjacencies", ["id"])
                .with_child(SchemaNode::leaf(
                    "id",
                    YangType::Union(vec![YangType::Uint8, YangType::String]),
                ))
                .with_child(SchemaNode::leaf("up", YangType::Boolean)),
        )
        .with_child(
            SchemaNode::container("Nsr")
                .presence()
                .with_namespace("urn:example:nsr")
                .with_child(SchemaNode::leaf("interval", YangType::Uint32)),
        );
    CodecEngine::new(Arc::new(SchemaTree::new("isis", vec![root]).unwrap()))
}

/// Plain description of a tree, built into an `ObjectNode` per case
#[derive(Debug, Clone)]
struct Sample {
    enabled: Option<bool>,
    description: Option<String>,
    level: Option<&'static str>,
    cost: Option<String>,
    tags: Vec<u16>,
    hello: Option<i64>,
    passive: bool,
    interfaces: Vec<(String, Option<i64>, Option<Vec<u8>>)>,
    adjacencies: Vec<(String, bool)>,
    nsr: Option<Option<u32>>,
}

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 <>&'\"/_.:-]{0,16}"
}

fn arb_sample() -> impl Strategy<Value = Sample> {
    let interface = (
        "[A-Za-z]{2}[0-9]/[0-9]{1,2}",
        prop::option::of(any::<i64>()),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..12)),
    );
    (
        prop::option::of(any::<bool>()),
        prop::option::of(text()),
        prop::option::of(prop_oneof![Just("level-1"), Just("level-2")]),
        // Numeric-looking text must read back as the number from both formats
        prop::option::of(prop_oneof!["-?[0-9]{1,11}", text()]),
        prop::collection::vec(any::<u16>(), 0..5),
        prop::option::of(-999_999_999_999i64..999_999_999_999),
        any::<bool>(),
        prop::collection::vec(interface, 0..6),
        prop::collection::vec(("[0-9]{1,3}|[a-z]{1,3}", any::<bool>()), 0..6),
        prop::option::of(prop::option::of(any::<u32>())),
    )
        .prop_map(
            |(enabled, description, level, cost, tags, hello, passive, interfaces, adjacencies, nsr)| {
                Sample {
                    enabled,
                    description,
                    level,
                    cost,
                    tags,
                    hello,
                    passive,
                    interfaces,
                    adjacencies,
                    nsr,
                }
            },
        )
}

fn build(engine: &CodecEngine, sample: &Sample) -> ObjectNode {
    let mut tree = engine.schema().create("Isis").unwrap();
    if let Some(enabled) = sample.enabled {
        tree.set_leaf("enabled", enabled).unwrap();
    }
    if let Some(description) = &sample.description {
        tree.set_leaf("description", description.as_str()).unwrap();
    }
    if let Some(level) = sample.level {
        tree.set_leaf("level", Scalar::Enum(level.to_string())).unwrap();
    }
    if let Some(cost) = &sample.cost {
        tree.set_leaf("cost", cost.as_str()).unwrap();
    }
    for tag in &sample.tags {
        tree.push_leaf("tags", *tag).unwrap();
    }

    let timers = tree.container_mut("Timers").unwrap();
    if let Some(hello) = sample.hello {
        timers.set_leaf("hello", Decimal64::new(hello, 3)).unwrap();
    }
    if sample.passive {
        timers.set_leaf("passive", Scalar::Empty).unwrap();
    }

    let mut names = HashSet::new();
    for (name, metric, key) in &sample.interfaces {
        if !names.insert(name.clone()) {
            continue;
        }
        let mut entry = tree.new_list_entry("Interfaces").unwrap();
        entry.set_leaf("name", name.as_str()).unwrap();
        if let Some(metric) = metric {
            entry.set_leaf("metric", *metric).unwrap();
        }
        if let Some(key) = key {
            entry.set_leaf("key", key.clone()).unwrap();
        }
        tree.add_list_entry("Interfaces", entry).unwrap();
    }

    // "7" and "007" name the same adjacency
    for (id, up) in &sample.adjacencies {
        let mut entry = tree.new_list_entry("Adjacencies").unwrap();
        entry.set_leaf("id", id.as_str()).unwrap();
        entry.set_leaf("up", *up).unwrap();
        if let Err(e) = tree.add_list_entry("Adjacencies", entry) {
            assert_eq!(e.kind(), ErrorKind::DuplicateKey, "{}", e);
        }
    }

    if let Some(interval) = sample.nsr {
        let nsr = tree.container_mut("Nsr").unwrap();
        if let Some(interval) = interval {
            nsr.set_leaf("interval", interval).unwrap();
        }
    }
    tree
}

proptest! {
    #[test]
    fn roundtrip_preserves_tree(sample in arb_sample()) {
        let engine = engine();
        let tree = build(&engine, &sample);

        for format in [EncodingFormat::Json, EncodingFormat::Xml] {
            let encoded = engine.encode(&tree, format).unwrap();
            let decoded = engine.decode(&encoded, format).unwrap();
            prop_assert_eq!(&decoded, &tree);
        }
    }

    #[test]
    fn formats_are_equivalent(sample in arb_sample()) {
        let engine = engine();
        let tree = build(&engine, &sample);

        let via_json = engine
            .decode(&engine.encode(&tree, EncodingFormat::Json).unwrap(), EncodingFormat::Json)
            .unwrap();
        let via_xml = engine
            .decode(&engine.encode(&tree, EncodingFormat::Xml).unwrap(), EncodingFormat::Xml)
            .unwrap();
        prop_assert_eq!(via_json, via_xml);
    }

    #[test]
    fn reencoding_is_byte_identical(sample in arb_sample()) {
        let engine = engine();
        let tree = build(&engine, &sample);

        for format in [EncodingFormat::Json, EncodingFormat::Xml] {
            let first = engine.encode(&tree, format).unwrap();
            let again = engine.encode(&tree, format).unwrap();
            prop_assert_eq!(&first, &again);

            let decoded = engine.decode(&first, format).unwrap();
            prop_assert_eq!(engine.encode(&decoded, format).unwrap(), first);
        }
    }
}
