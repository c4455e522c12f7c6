use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Canonical cache key: a resource identifier plus an optional parameter set.
///
/// The parameter set is stored as one canonical JSON object with keys sorted
/// (recursively, for nested objects), so two parameter objects that differ
/// only in key order produce the same key. Parameters whose value is JSON
/// `null` are dropped, and an empty parameter set means no parameters.
///
/// Resource and parameters are kept apart, so a resource string can never
/// spell out the same key as a parameterized one. `Display` renders
/// `resource?{"k1":v1,"k2":v2}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    resource: String,
    params: Option<String>,
}

impl CacheKey {
    /// Key for a resource with no parameters.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: None,
        }
    }

    /// Key for a resource and an already-built parameter map.
    pub fn with_params(resource: &str, params: &Map<String, Value>) -> Self {
        let present: Map<String, Value> = params
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if present.is_empty() {
            return Self::new(resource);
        }

        let mut canonical = String::with_capacity(16 * present.len());
        write_canonical(&Value::Object(present), &mut canonical);
        Self {
            resource: resource.to_string(),
            params: Some(canonical),
        }
    }

    /// Key for a resource and any serializable parameter object
    /// (a filter struct, a `json!({..})` literal, a map).
    ///
    /// `None`/unit serializes to `null` and means "no parameters"; anything
    /// other than an object or null is rejected.
    pub fn from_params<P: Serialize + ?Sized>(
        resource: &str,
        params: &P,
    ) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(params)? {
            Value::Object(map) => Ok(Self::with_params(resource, &map)),
            Value::Null => Ok(Self::new(resource)),
            other => Err(serde::ser::Error::custom(format!(
                "cache parameters must be an object, got {}",
                other
            ))),
        }
    }

    /// The resource identifier without parameters.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Canonical JSON of the parameter set, if there is one.
    pub fn params(&self) -> Option<&str> {
        self.params.as_deref()
    }

    /// Prefix match on the resource identifier.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.resource.starts_with(prefix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource)?;
        if let Some(ref params) = self.params {
            write!(f, "?{}", params)?;
        }
        Ok(())
    }
}

impl From<&str> for CacheKey {
    fn from(resource: &str) -> Self {
        Self::new(resource)
    }
}

/// Serialize `value` as compact JSON with object keys in sorted order,
/// independent of how the map was built.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (k, v)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
