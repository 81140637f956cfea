use std::collections::HashMap;

use regex::Regex;

use crate::node::NodeKind;
use crate::{
    BOOL_TAG, DEFAULT_MAPPING_TAG, DEFAULT_SCALAR_TAG, DEFAULT_SEQUENCE_TAG, FLOAT_TAG, INT_TAG,
    MERGE_TAG, NULL_TAG, TIMESTAMP_TAG, VALUE_TAG,
};

/// Tag resolution: decides the canonical tag of a node whose tag is absent or
/// non-specific.
pub trait Resolver {
    /// Resolve the tag for a node of the given kind. `tag` is the explicit
    /// tag from the event, if any; `value` is the raw scalar text for scalar
    /// nodes; `implicit` is true when the scalar was written plain.
    fn resolve(
        &self,
        kind: NodeKind,
        tag: Option<&str>,
        value: Option<&str>,
        implicit: bool,
    ) -> String;

    fn default_scalar_tag(&self) -> &str {
        DEFAULT_SCALAR_TAG
    }

    fn default_sequence_tag(&self) -> &str {
        DEFAULT_SEQUENCE_TAG
    }

    fn default_mapping_tag(&self) -> &str {
        DEFAULT_MAPPING_TAG
    }

    fn default_tag(&self, kind: NodeKind) -> &str {
        match kind {
            NodeKind::Scalar => self.default_scalar_tag(),
            NodeKind::Sequence => self.default_sequence_tag(),
            NodeKind::Mapping => self.default_mapping_tag(),
        }
    }
}

struct ImplicitRule {
    tag: String,
    pattern: Regex,
}

/// The YAML 1.1 schema resolver.
///
/// Implicit resolution dispatches on the first character of the scalar, then
/// tries each candidate pattern in registration order. The built-in schema
/// rules are always consulted before user-registered ones.
pub struct SchemaResolver {
    /// First character of the scalar -> indices into `rules`.
    dispatch: HashMap<char, Vec<usize>>,
    /// Rules matching the empty scalar.
    empty: Vec<usize>,
    rules: Vec<ImplicitRule>,
}

impl SchemaResolver {
    pub fn new() -> SchemaResolver {
        let mut resolver = SchemaResolver {
            dispatch: HashMap::new(),
            empty: Vec::new(),
            rules: Vec::new(),
        };
        resolver.add_rule(
            BOOL_TAG,
            r"^(?:yes|Yes|YES|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF)$",
            "yYnNtTfFoO",
        );
        resolver.add_rule(
            FLOAT_TAG,
            r"^(?:[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?|\.[0-9_]+(?:[eE][-+]?[0-9]+)?|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
            "-+0123456789.",
        );
        resolver.add_rule(
            INT_TAG,
            r"^(?:[-+]?0b[0-1_]+|[-+]?0x[0-9a-fA-F_]+|[-+]?0[0-7_]+|[-+]?(?:0|[1-9][0-9_]*)|[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+)$",
            "-+0123456789",
        );
        resolver.add_rule(MERGE_TAG, r"^(?:<<)$", "<");
        resolver.add_rule(NULL_TAG, r"^(?:~|null|Null|NULL|)$", "~nN");
        resolver.add_rule(
            TIMESTAMP_TAG,
            r"^(?:[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]|[0-9][0-9][0-9][0-9]-[0-9][0-9]?-[0-9][0-9]?(?:[Tt]|[ \t]+)[0-9][0-9]?:[0-9][0-9]:[0-9][0-9](?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9][0-9]?(?::[0-9][0-9])?))?)$",
            "0123456789",
        );
        resolver.add_rule(VALUE_TAG, r"^(?:=)$", "=");
        resolver
    }

    fn add_rule(&mut self, tag: &str, pattern: &str, first_chars: &str) {
        let index = self.rules.len();
        self.rules.push(ImplicitRule {
            tag: tag.into(),
            pattern: Regex::new(pattern).expect("schema pattern compiles"),
        });
        for ch in first_chars.chars() {
            self.dispatch.entry(ch).or_default().push(index);
        }
        if tag == NULL_TAG {
            // The empty scalar resolves to null.
            self.empty.push(index);
        }
    }

    /// Register a user implicit resolver. Within user rules the first added
    /// wins; the built-in schema rules always win over user ones.
    pub fn add_implicit_resolver(
        &mut self,
        tag: impl Into<String>,
        pattern: Regex,
        first_chars: &str,
    ) {
        let index = self.rules.len();
        self.rules.push(ImplicitRule {
            tag: tag.into(),
            pattern,
        });
        for ch in first_chars.chars() {
            self.dispatch.entry(ch).or_default().push(index);
        }
        if first_chars.is_empty() {
            self.empty.push(index);
        }
    }

    fn resolve_scalar(&self, value: &str, implicit: bool) -> String {
        if !implicit {
            return DEFAULT_SCALAR_TAG.into();
        }
        let candidates = match value.chars().next() {
            Some(first) => self.dispatch.get(&first),
            None => Some(&self.empty),
        };
        if let Some(candidates) = candidates {
            for &index in candidates {
                let rule = &self.rules[index];
                if rule.pattern.is_match(value) {
                    return rule.tag.clone();
                }
            }
        }
        DEFAULT_SCALAR_TAG.into()
    }
}

impl Resolver for SchemaResolver {
    fn resolve(
        &self,
        kind: NodeKind,
        tag: Option<&str>,
        value: Option<&str>,
        implicit: bool,
    ) -> String {
        if let Some(tag) = tag {
            if !tag.is_empty() && tag != "!" {
                return tag.into();
            }
        }
        match kind {
            NodeKind::Scalar => self.resolve_scalar(value.unwrap_or(""), implicit),
            NodeKind::Sequence => self.default_sequence_tag().into(),
            NodeKind::Mapping => self.default_mapping_tag().into(),
        }
    }
}

impl Default for SchemaResolver {
    fn default() -> Self {
        Self::new()
    }
}
