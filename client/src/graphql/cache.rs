//! In-memory result cache with optional object normalization.
//!
//! Query results are stored per `(document, variables)`. Objects the
//! configured identity function recognizes are lifted into a shared object
//! store and referenced from results by `{"__ref": id}`, so a later write of
//! the same object (from a subscription, say) updates every result that
//! contains it.

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use appsync::GraphqlRequest;
use serde_json::{Map, Value};

const REF_KEY: &str = "__ref";
const TYPENAME: &str = "__typename";

/// Maps a result object to its cache id, or `None` to leave it inline.
pub type IdentifyFn = Rc<dyn Fn(&Map<String, Value>) -> Option<String>>;

#[derive(Clone)]
pub struct CacheConfig {
    /// Add `__typename` to every selection set before sending.
    pub add_typename: bool,
    /// Custom identity. The default is `__typename:id`.
    pub identify: Option<IdentifyFn>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { add_typename: true, identify: None }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("add_typename", &self.add_typename)
            .field("identify", &self.identify.as_ref().map(|_| "custom"))
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCache {
    config: CacheConfig,
    results: HashMap<String, Value>,
    objects: HashMap<String, Map<String, Value>>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self { config, results: HashMap::new(), objects: HashMap::new() }
    }

    /// Apply the document rewrites this cache needs before a request is sent.
    #[must_use]
    pub fn transform_request(&self, mut request: GraphqlRequest) -> GraphqlRequest {
        if self.config.add_typename {
            request.query = add_typename(&request.query);
        }
        request
    }

    /// Cached result for `request`, with references resolved.
    #[must_use]
    pub fn read_query(&self, request: &GraphqlRequest) -> Option<Value> {
        self.results.get(&result_key(request)).map(|tree| self.resolve(tree, &mut Vec::new()))
    }

    pub fn write_query(&mut self, request: &GraphqlRequest, data: &Value) {
        let tree = self.normalize(data);
        self.results.insert(result_key(request), tree);
    }

    /// Merge every identifiable object in `data` into the object store
    /// without recording a query result.
    pub fn write_objects(&mut self, data: &Value) {
        let _ = self.normalize(data);
    }

    /// A normalized object with references resolved.
    #[must_use]
    pub fn read_object(&self, id: &str) -> Option<Value> {
        if !self.objects.contains_key(id) {
            return None;
        }
        Some(self.resolve(&reference(id), &mut Vec::new()))
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn reset(&mut self) {
        self.results.clear();
        self.objects.clear();
    }

    fn identify(&self, object: &Map<String, Value>) -> Option<String> {
        if let Some(identify) = &self.config.identify {
            return identify(object);
        }
        let typename = object.get(TYPENAME)?.as_str()?;
        let id = match object.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(format!("{typename}:{id}"))
    }

    /// Replace identifiable objects with references, storing them.
    fn normalize(&mut self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.iter().map(|v| self.normalize(v)).collect()),
            Value::Object(object) => {
                let fields: Map<String, Value> = object.iter().map(|(k, v)| (k.clone(), self.normalize(v))).collect();
                match self.identify(object) {
                    Some(id) => {
                        // Shallow merge: later writes win per field.
                        self.objects.entry(id.clone()).or_default().extend(fields);
                        reference(&id)
                    }
                    None => Value::Object(fields),
                }
            }
            other => other.clone(),
        }
    }

    /// Inline references. `seen` holds the ids on the current path so
    /// self-referencing objects stop at the reference.
    fn resolve(&self, value: &Value, seen: &mut Vec<String>) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.iter().map(|v| self.resolve(v, seen)).collect()),
            Value::Object(object) => {
                if let Some(id) = ref_id(object) {
                    let Some(fields) = self.objects.get(id) else {
                        return Value::Null;
                    };
                    if seen.iter().any(|s| s == id) {
                        return value.clone();
                    }
                    seen.push(id.to_owned());
                    let resolved = fields.iter().map(|(k, v)| (k.clone(), self.resolve(v, seen))).collect();
                    seen.pop();
                    return Value::Object(resolved);
                }
                Value::Object(object.iter().map(|(k, v)| (k.clone(), self.resolve(v, seen))).collect())
            }
            other => other.clone(),
        }
    }
}

fn reference(id: &str) -> Value {
    let mut object = Map::new();
    object.insert(REF_KEY.to_owned(), Value::String(id.to_owned()));
    Value::Object(object)
}

fn ref_id(object: &Map<String, Value>) -> Option<&str> {
    if object.len() != 1 {
        return None;
    }
    object.get(REF_KEY)?.as_str()
}

/// Document plus canonical variables. `serde_json` maps are ordered, so
/// equal variables serialize identically.
fn result_key(request: &GraphqlRequest) -> String {
    format!("{}\u{0}{}", request.query.trim(), request.variables)
}

/// Insert `__typename` into every selection set except an operation's root.
///
/// Braces inside strings, comments and argument lists are left alone.
#[must_use]
pub fn add_typename(document: &str) -> String {
    let mut out = String::with_capacity(document.len() + 64);
    let mut depth = 0usize;
    let mut parens = 0usize;
    let mut header = String::new();
    let mut chars = document.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '"' => {
                let mut escaped = false;
                for s in chars.by_ref() {
                    out.push(s);
                    if s == '"' && !escaped {
                        break;
                    }
                    escaped = s == '\\' && !escaped;
                }
            }
            '#' => {
                while let Some(&s) = chars.peek() {
                    if s == '\n' {
                        break;
                    }
                    out.push(s);
                    chars.next();
                }
            }
            '(' => parens += 1,
            ')' => parens = parens.saturating_sub(1),
            '{' if parens == 0 => {
                let is_root = depth == 0;
                let is_fragment = header.trim_start().starts_with("fragment");
                if !is_root || is_fragment {
                    out.push_str(" __typename");
                }
                depth += 1;
            }
            '}' if parens == 0 => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    header.clear();
                }
            }
            _ if depth == 0 => header.push(c),
            _ => {}
        }
    }
    out
}
