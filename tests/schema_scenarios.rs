use indoc::indoc;
use pretty_assertions::assert_eq;
use yaml11::{CollectionStyle, Dumper, Loader, Node};

#[test]
fn mapping_with_typed_values() {
    let doc = Loader::from_str("Answer: 42\nHello World:\n  - Hello\n  - World")
        .load()
        .unwrap();
    assert_eq!(doc.root["Answer"].as_int(), Some(42));
    let items = doc.root["Hello World"].as_items().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_str(), Some("Hello"));
    assert_eq!(items[1].as_str(), Some("World"));
}

#[test]
fn flow_set_of_players() {
    let doc = Loader::from_str("!!set { Mark McGwire, Sammy Sosa, Ken Griffey }")
        .load()
        .unwrap();
    assert_eq!(doc.root.tag, yaml11::SET_TAG);
    let keys: Vec<&str> = doc
        .root
        .as_pairs()
        .unwrap()
        .iter()
        .map(|(k, _)| k.as_str().unwrap())
        .collect();
    assert_eq!(keys, ["Mark McGwire", "Sammy Sosa", "Ken Griffey"]);
}

#[test]
fn integers_in_every_base() {
    let doc = Loader::from_str(indoc! {"
        canonical: 685230
        octal: 02472256
        hex: 0x_0A_74_AE
        bin: 0b1010_0111_0100_1010_1110
        sex: 190:20:30
    "})
    .load()
    .unwrap();
    for key in ["canonical", "octal", "hex", "bin", "sex"] {
        assert_eq!(doc.root[key].as_int(), Some(685_230), "{key}");
    }
}

#[test]
fn timestamp_with_fraction_and_zone() {
    let doc = Loader::from_str("time: 2001-12-15T02:59:43.1Z").load().unwrap();
    let ts = doc.root["time"].as_timestamp().unwrap();
    assert_eq!(ts.to_rfc3339(), "2001-12-15T02:59:43.100+00:00");
}

#[test]
fn aliased_node_appears_in_both_positions() {
    let doc = Loader::from_str(indoc! {"
        anchored: &A { x: 1 }
        first: *A
        second: *A
    "})
    .load()
    .unwrap();
    assert_eq!(doc.root["first"], doc.root["anchored"]);
    assert_eq!(doc.root["second"], doc.root["anchored"]);
    assert_eq!(doc.root["first"]["x"].as_int(), Some(1));
}

#[test]
fn set_tagged_list_dumps_as_mapping() {
    let node = Node::from_items((1..=5).map(Node::int).collect())
        .with_tag(yaml11::SET_TAG)
        .with_collection_style(CollectionStyle::Block);
    let mut output = Vec::new();
    Dumper::new(&mut output).dump(node).unwrap();
    let text = String::from_utf8(output).unwrap();
    assert!(!text.contains('-'), "emitted as a sequence: {text}");
    let reloaded = Loader::from_str(&text).load().unwrap();
    assert_eq!(reloaded.root.tag, yaml11::SET_TAG);
    assert!(reloaded.root.as_pairs().unwrap().iter().all(|(_, v)| v.is_null()));
}

#[test]
fn merge_key_supplies_defaults_only() {
    let doc = Loader::from_str(indoc! {"
        x: &x { a: 1, b: 2 }
        merged:
          a: 0
          <<: *x
    "})
    .load()
    .unwrap();
    assert_eq!(doc.root["merged"]["a"].as_int(), Some(0));
    assert_eq!(doc.root["merged"]["b"].as_int(), Some(2));
}

#[test]
fn special_floats() {
    let doc = Loader::from_str("pos: .inf\nneg: -.inf\nnan: .nan").load().unwrap();
    assert_eq!(doc.root["pos"].as_float(), Some(f64::INFINITY));
    assert_eq!(doc.root["neg"].as_float(), Some(f64::NEG_INFINITY));
    assert!(doc.root["nan"].as_float().unwrap().is_nan());
}

#[test]
fn binary_with_embedded_newlines() {
    let doc = Loader::from_str(indoc! {"
        data: !!binary |
          R0lGODlhDAAMAIQAAP//9/X
          17unp5WZmZgAAAOfn515eXv
          Pz7Y6OjuDg4J+fn5OTk6enp
          56enmleECcgggoBADs=
    "})
    .load()
    .unwrap();
    let bytes = doc.root["data"].as_bytes().unwrap();
    assert!(bytes.starts_with(b"GIF89a"));
}

#[test]
fn single_plain_scalar_document() {
    let docs = Loader::from_str("just one scalar\n").load_all().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].root.as_str(), Some("just one scalar"));
}

#[test]
fn omap_and_pairs() {
    let doc = Loader::from_str(indoc! {"
        ordered: !!omap
          - one: 1
          - two: 2
        repeated: !!pairs
          - key: a
          - key: b
    "})
    .load()
    .unwrap();
    assert_eq!(doc.root["ordered"].tag, yaml11::OMAP_TAG);
    assert_eq!(doc.root["ordered"].as_items().unwrap().len(), 2);
    assert_eq!(doc.root["repeated"].as_items().unwrap().len(), 2);
}

#[test]
fn value_key_resolves() {
    let doc = Loader::from_str("=: default\nother: 1\n").load().unwrap();
    assert_eq!(doc.root["="].as_str(), Some("default"));
}

#[test]
fn duplicate_mapping_keys_rejected_across_bases() {
    // 0x10 and 16 construct to the same integer, so they collide.
    let result = Loader::from_str("0x10: a\n16: b\n").load();
    assert!(result.is_err());
}
