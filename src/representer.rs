use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, Timelike};

use crate::node::{Node, NodeContent, ScalarValue};
use crate::{CollectionStyle, RepresenterError, ScalarStyle, SET_TAG};

const BASE64_LINE_WIDTH: usize = 76;

type RepresentFn = Box<dyn Fn(&dyn Any, &Representer) -> Result<Node, RepresenterError>>;

/// Presentation of typed values: spells scalars back into their string form
/// and turns user-registered runtime types into nodes.
///
/// Exactly one representer may be registered per runtime type; registering
/// again replaces it.
pub struct Representer {
    representers: HashMap<TypeId, RepresentFn>,
}

impl Representer {
    pub fn new() -> Representer {
        Representer {
            representers: HashMap::new(),
        }
    }

    /// Register or replace the representer for a runtime type.
    pub fn add_representer<T: 'static>(
        &mut self,
        callback: impl Fn(&T, &Representer) -> Result<Node, RepresenterError> + 'static,
    ) {
        self.representers.insert(
            TypeId::of::<T>(),
            Box::new(move |any, representer| {
                let value = any.downcast_ref::<T>().expect("registered under TypeId");
                callback(value, representer)
            }),
        );
    }

    /// Build a scalar node from its string form.
    pub fn represent_scalar(
        &self,
        tag: &str,
        value: impl Into<String>,
        style: Option<ScalarStyle>,
    ) -> Node {
        Node::make(
            tag,
            NodeContent::Scalar {
                value: ScalarValue::String(value.into()),
                style: style.unwrap_or_default(),
            },
        )
    }

    /// Build a sequence node.
    pub fn represent_sequence(
        &self,
        tag: &str,
        items: Vec<Node>,
        style: Option<CollectionStyle>,
    ) -> Node {
        Node::make(
            tag,
            NodeContent::Sequence {
                items,
                style: style.unwrap_or_default(),
            },
        )
    }

    /// Build a mapping node.
    pub fn represent_mapping(
        &self,
        tag: &str,
        pairs: Vec<(Node, Node)>,
        style: Option<CollectionStyle>,
    ) -> Node {
        Node::make(
            tag,
            NodeContent::Mapping {
                pairs,
                style: style.unwrap_or_default(),
            },
        )
    }

    /// Replace user values with their represented nodes and normalize the
    /// schema shapes (`!!set` over a sequence becomes a mapping with null
    /// values), recursively.
    pub(crate) fn normalize(&self, node: &Node) -> Result<Node, RepresenterError> {
        match &node.content {
            NodeContent::Scalar {
                value: ScalarValue::Other(any),
                ..
            } => {
                let represented = self.represent_other(any)?;
                self.normalize(&represented)
            }
            NodeContent::Scalar { .. } => Ok(node.clone()),
            NodeContent::Sequence { items, style } => {
                let items = items
                    .iter()
                    .map(|item| self.normalize(item))
                    .collect::<Result<Vec<_>, _>>()?;
                if node.tag == SET_TAG {
                    // A set is presented as a mapping with null values.
                    let pairs = items.into_iter().map(|item| (item, Node::null())).collect();
                    return Ok(Node {
                        tag: node.tag.clone(),
                        content: NodeContent::Mapping {
                            pairs,
                            style: *style,
                        },
                        mark: node.mark,
                    });
                }
                Ok(Node {
                    tag: node.tag.clone(),
                    content: NodeContent::Sequence {
                        items,
                        style: *style,
                    },
                    mark: node.mark,
                })
            }
            NodeContent::Mapping { pairs, style } => {
                let pairs = pairs
                    .iter()
                    .map(|(key, value)| Ok((self.normalize(key)?, self.normalize(value)?)))
                    .collect::<Result<Vec<_>, RepresenterError>>()?;
                Ok(Node {
                    tag: node.tag.clone(),
                    content: NodeContent::Mapping {
                        pairs,
                        style: *style,
                    },
                    mark: node.mark,
                })
            }
        }
    }

    fn represent_other(&self, any: &Rc<dyn Any>) -> Result<Node, RepresenterError> {
        let type_id = any.as_ref().type_id();
        match self.representers.get(&type_id) {
            Some(callback) => callback(any.as_ref(), self),
            None => Err(RepresenterError::NoRepresenter {
                type_name: "opaque user value",
            }),
        }
    }

    /// The string form of a typed scalar, and the style it prefers.
    pub(crate) fn present_scalar(
        &self,
        node: &Node,
    ) -> Result<(String, ScalarStyle), RepresenterError> {
        let NodeContent::Scalar { value, style } = &node.content else {
            return Err(RepresenterError::Problem(
                "present_scalar on a non-scalar node".into(),
            ));
        };
        let (text, preferred) = match value {
            ScalarValue::Null => ("null".to_string(), ScalarStyle::Plain),
            ScalarValue::Bool(true) => ("true".to_string(), ScalarStyle::Plain),
            ScalarValue::Bool(false) => ("false".to_string(), ScalarStyle::Plain),
            ScalarValue::Int(value) => (value.to_string(), ScalarStyle::Plain),
            ScalarValue::Float(value) => (spell_float(*value), ScalarStyle::Plain),
            ScalarValue::Bytes(bytes) => (spell_base64(bytes), ScalarStyle::Literal),
            ScalarValue::Timestamp(ts) => (spell_timestamp(*ts), ScalarStyle::Plain),
            ScalarValue::String(text) => (text.clone(), ScalarStyle::Any),
            ScalarValue::Other(_) => {
                return Err(RepresenterError::Problem(
                    "user value survived normalization".into(),
                ));
            }
        };
        // An explicit style on the node wins over the type's preference.
        let style = if *style == ScalarStyle::Any {
            preferred
        } else {
            *style
        };
        Ok((text, style))
    }
}

impl Default for Representer {
    fn default() -> Self {
        Self::new()
    }
}

/// Spell a float in fixed point, falling back to scientific notation when
/// fixed point cannot reproduce the value. The spelling always re-resolves
/// as a float.
fn spell_float(value: f64) -> String {
    if value.is_nan() {
        return ".nan".into();
    }
    if value == f64::INFINITY {
        return ".inf".into();
    }
    if value == f64::NEG_INFINITY {
        return "-.inf".into();
    }
    let fixed = format!("{value:.12}");
    let trimmed = {
        let without = fixed.trim_end_matches('0');
        if without.ends_with('.') {
            format!("{without}0")
        } else {
            without.to_string()
        }
    };
    if trimmed.parse::<f64>() == Ok(value) {
        return trimmed;
    }
    let mut scientific = format!("{value:e}");
    if let Some(position) = scientific.find('e') {
        if !scientific[..position].contains('.') {
            scientific.insert_str(position, ".0");
        }
    }
    scientific
}

/// Spell a timestamp in ISO-extended form with its offset.
fn spell_timestamp(value: DateTime<FixedOffset>) -> String {
    let mut text = value.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = value.nanosecond();
    if nanos != 0 {
        let fraction = format!("{nanos:09}");
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    if value.offset().local_minus_utc() == 0 {
        text.push('Z');
    } else {
        text.push_str(&value.format("%:z").to_string());
    }
    text
}

/// Base64 with line breaks, as emitted inside a literal block scalar.
fn spell_base64(bytes: &[u8]) -> String {
    let encoded = BASE64.encode(bytes);
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_WIDTH + 1);
    let mut rest = encoded.as_str();
    while rest.len() > BASE64_LINE_WIDTH {
        let (line, tail) = rest.split_at(BASE64_LINE_WIDTH);
        wrapped.push_str(line);
        wrapped.push('\n');
        rest = tail;
    }
    wrapped.push_str(rest);
    wrapped.push('\n');
    wrapped
}
