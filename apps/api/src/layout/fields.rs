//! Path-tracking reader over `serde_json::Value`.
//!
//! Template definitions and menu payloads arrive as loosely shaped JSON. Both
//! loaders walk them with `Node`, so any failure carries the dotted path of
//! the offending field (`sections[2].items[0].price`).

use serde_json::{Map, Value};

/// A field-level problem; callers wrap it into the matching `LayoutError`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldIssue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Segment<'k> {
    Key(&'k str),
    Index(usize),
}

#[derive(Debug, Clone)]
pub struct Node<'a> {
    path: String,
    value: &'a Value,
}

impl<'a> Node<'a> {
    pub fn root(value: &'a Value) -> Self {
        Node {
            path: String::new(),
            value,
        }
    }

    pub fn path(&self) -> &str {
        if self.path.is_empty() {
            "<root>"
        } else {
            &self.path
        }
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    fn join(&self, segment: Segment<'_>) -> String {
        match segment {
            Segment::Key(key) if self.path.is_empty() => key.to_string(),
            Segment::Key(key) => format!("{}.{key}", self.path),
            Segment::Index(i) => format!("{}[{i}]", self.path),
        }
    }

    /// Path a child would have, for reporting on fields that are absent.
    pub fn child_path(&self, key: &str) -> String {
        self.join(Segment::Key(key))
    }

    fn object(&self) -> Result<&'a Map<String, Value>, FieldIssue> {
        self.value
            .as_object()
            .ok_or_else(|| FieldIssue::new(self.path(), "expected an object"))
    }

    /// Returns the child at `key`, treating JSON `null` as absent.
    pub fn get(&self, key: &str) -> Result<Option<Node<'a>>, FieldIssue> {
        let object = self.object()?;
        Ok(object
            .get(key)
            .filter(|v| !v.is_null())
            .map(|value| Node {
                path: self.join(Segment::Key(key)),
                value,
            }))
    }

    /// First present child among `keys`, for accepting field aliases.
    pub fn get_any(&self, keys: &[&str]) -> Result<Option<Node<'a>>, FieldIssue> {
        for key in keys {
            if let Some(node) = self.get(key)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    pub fn require(&self, key: &str) -> Result<Node<'a>, FieldIssue> {
        self.get(key)?
            .ok_or_else(|| FieldIssue::new(self.join(Segment::Key(key)), "required field is missing"))
    }

    pub fn entries(&self) -> Result<Vec<(&'a str, Node<'a>)>, FieldIssue> {
        let object = self.object()?;
        Ok(object
            .iter()
            .map(|(key, value)| {
                (
                    key.as_str(),
                    Node {
                        path: self.join(Segment::Key(key)),
                        value,
                    },
                )
            })
            .collect())
    }

    pub fn items(&self) -> Result<Vec<Node<'a>>, FieldIssue> {
        let array = self
            .value
            .as_array()
            .ok_or_else(|| FieldIssue::new(self.path(), "expected an array"))?;
        Ok(array
            .iter()
            .enumerate()
            .map(|(i, value)| Node {
                path: self.join(Segment::Index(i)),
                value,
            })
            .collect())
    }

    pub fn as_str(&self) -> Result<&'a str, FieldIssue> {
        self.value
            .as_str()
            .ok_or_else(|| FieldIssue::new(self.path(), "expected a string"))
    }

    pub fn as_f64(&self) -> Result<f64, FieldIssue> {
        self.value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| FieldIssue::new(self.path(), "expected a number"))
    }

    pub fn as_u32(&self) -> Result<u32, FieldIssue> {
        self.value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| FieldIssue::new(self.path(), "expected a non-negative integer"))
    }

    pub fn as_bool(&self) -> Result<bool, FieldIssue> {
        self.value
            .as_bool()
            .ok_or_else(|| FieldIssue::new(self.path(), "expected a boolean"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths_follow_keys_and_indices() {
        let doc = json!({ "sections": [ { "items": [ { "price": "x" } ] } ] });
        let root = Node::root(&doc);
        let sections = root.require("sections").unwrap().items().unwrap();
        let items = sections[0].require("items").unwrap().items().unwrap();
        let price = items[0].require("price").unwrap();
        assert_eq!(price.path(), "sections[0].items[0].price");
        let err = price.as_f64().unwrap_err();
        assert_eq!(err.field, "sections[0].items[0].price");
    }

    #[test]
    fn test_null_is_treated_as_missing() {
        let doc = json!({ "description": null });
        let root = Node::root(&doc);
        assert!(root.get("description").unwrap().is_none());
        let err = root.require("description").unwrap_err();
        assert_eq!(err.field, "description");
    }

    #[test]
    fn test_get_any_prefers_first_alias() {
        let doc = json!({ "imageUrl": "b.png", "imageRef": "a.png" });
        let node = Node::root(&doc)
            .get_any(&["imageRef", "imageUrl"])
            .unwrap()
            .unwrap();
        assert_eq!(node.as_str().unwrap(), "a.png");
    }

    #[test]
    fn test_root_path_is_labelled() {
        let doc = json!([1, 2]);
        let err = Node::root(&doc).require("x").unwrap_err();
        assert_eq!(err.field, "<root>");
    }
}
