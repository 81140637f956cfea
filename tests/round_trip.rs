use chrono::DateTime;
use indoc::indoc;
use pretty_assertions::assert_eq;
use yaml11::{Document, Dumper, Loader, Node};

const CORPUS: &[&str] = &[
    "Answer: 42\n",
    "- one\n- two\n- three\n",
    indoc! {"
        invoice: 34843
        date: 2001-01-23
        bill-to: &id001
          given: Chris
          family: Dumars
          address:
            lines: |
              458 Walker Rd.
              Suite #292
            city: Royal Oak
            state: MI
            postal: 48046
        ship-to: *id001
        total: 4443.52
        comments: >
          Late afternoon is best.
          Backup contact is Nancy
          Billsmer @ 338-4338.
    "},
    indoc! {"
        flow: {a: 1, b: [x, y]}
        empty map: {}
        empty seq: []
        nulls: [~, null, '']
    "},
    indoc! {"
        bools: [yes, No, TRUE, off]
        ints: [0, -42, 0x1F, 0b101, 02, 190:20:30]
        floats: [0.5, -1.25, .inf, -.inf]
    "},
    indoc! {"
        'quoted key': plain value
        ? explicit key
        : explicit value
        nested:
          - - deep
            - deeper
          - inner: map
    "},
    indoc! {"
        defaults: &defaults
          adapter: postgres
          host: localhost
        development:
          <<: *defaults
          database: dev
    "},
    indoc! {"
        text: |
          verbatim
            indented
        folded: >
          one
          two
        strip: |-
          no newline
    "},
    // Root scalars spelled like document markers must come back quoted.
    "--- '--- a'\n--- '... b'\n",
];

fn load(text: &str) -> Vec<Document> {
    Loader::from_str(text)
        .load_all()
        .unwrap_or_else(|err| panic!("failed to load {text:?}: {err}"))
}

fn dump(documents: &[Document], canonical: bool) -> String {
    let mut output = Vec::new();
    {
        let mut dumper = Dumper::new(&mut output).canonical(canonical);
        for document in documents {
            dumper.dump_document(document).unwrap();
        }
        dumper.finish().unwrap();
    }
    String::from_utf8(output).unwrap()
}

fn roots(documents: &[Document]) -> Vec<&Node> {
    documents.iter().map(|document| &document.root).collect()
}

#[test]
fn load_dump_load_is_identity_on_data() {
    for text in CORPUS {
        let first = load(text);
        let dumped = dump(&first, false);
        let second = load(&dumped);
        assert_eq!(
            roots(&first),
            roots(&second),
            "round trip changed the tree for {text:?}\ndumped: {dumped}"
        );
    }
}

#[test]
fn canonical_dump_parses_to_the_same_tree() {
    for text in CORPUS {
        let first = load(text);
        let canonical = dump(&first, true);
        let second = load(&canonical);
        assert_eq!(
            roots(&first),
            roots(&second),
            "canonical form diverged for {text:?}\ncanonical: {canonical}"
        );
    }
}

fn round_trip_scalar(node: Node) -> Node {
    let mut output = Vec::new();
    Dumper::new(&mut output).dump(node).unwrap();
    let text = String::from_utf8(output).unwrap();
    Loader::from_str(&text)
        .load()
        .unwrap_or_else(|err| panic!("failed to reload {text:?}: {err}"))
        .root
}

#[test]
fn scalar_type_fidelity() {
    assert!(round_trip_scalar(Node::null()).is_null());
    assert_eq!(round_trip_scalar(Node::bool(true)).as_bool(), Some(true));
    assert_eq!(round_trip_scalar(Node::bool(false)).as_bool(), Some(false));
    for int in [0i64, 42, -685_230, i64::MAX, i64::MIN] {
        assert_eq!(round_trip_scalar(Node::int(int)).as_int(), Some(int));
    }
    for float in [0.0f64, 0.25, -3.5, 685_230.15, 1e300, 1.5e-13] {
        let reloaded = round_trip_scalar(Node::float(float)).as_float().unwrap();
        assert!((reloaded - float).abs() <= f64::EPSILON * float.abs());
    }
    assert!(round_trip_scalar(Node::float(f64::NAN))
        .as_float()
        .unwrap()
        .is_nan());
    assert_eq!(
        round_trip_scalar(Node::float(f64::INFINITY)).as_float(),
        Some(f64::INFINITY)
    );
    for text in ["plain words", "has: colon", "  leading space", "42", "null", "#comment-ish"] {
        assert_eq!(
            round_trip_scalar(Node::string(text)).as_str(),
            Some(text),
            "{text:?}"
        );
    }
    let bytes: Vec<u8> = (0..=255).collect();
    assert_eq!(
        round_trip_scalar(Node::bytes(bytes.clone())).as_bytes(),
        Some(bytes.as_slice())
    );
    let ts = DateTime::parse_from_rfc3339("2001-12-14T21:59:43.010-05:00").unwrap();
    let reloaded = round_trip_scalar(Node::timestamp(ts)).as_timestamp().unwrap();
    assert_eq!(reloaded, ts);
    assert_eq!(reloaded.offset().local_minus_utc(), -5 * 3600);
}

#[test]
fn multi_document_round_trip() {
    let text = "---\nfirst: 1\n---\n- a\n- b\n...\n";
    let first = load(text);
    assert_eq!(first.len(), 2);
    let dumped = dump(&first, false);
    let second = load(&dumped);
    assert_eq!(roots(&first), roots(&second));
}

#[test]
fn anchors_survive_round_trips() {
    let text = indoc! {"
        shared: &s
          one: 1
          two: 2
          three: 3
        left: *s
        right: *s
    "};
    let first = load(text);
    let dumped = dump(&first, false);
    // The shared mapping is large enough to be re-anchored, not inlined.
    assert!(dumped.contains('&'), "{dumped}");
    assert!(dumped.contains('*'), "{dumped}");
    let second = load(&dumped);
    assert_eq!(roots(&first), roots(&second));
}

#[test]
fn utf16_input_round_trips() {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "key: value\n".encode_utf16() {
        bytes.extend(unit.to_le_bytes());
    }
    let doc = Loader::from_bytes(&bytes).load().unwrap();
    assert_eq!(doc.root["key"].as_str(), Some("value"));
}
