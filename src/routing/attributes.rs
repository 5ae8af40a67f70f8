//! Group attribute inheritance.
//!
//! # Responsibilities
//! - Typed record of the attributes a group or route declares
//! - Merge a new declaration onto the attributes inherited from the enclosing group
//!
//! # Design Decisions
//! - Known attributes are fields; anything else lands in `extensions`
//! - `merge` has no special case for an empty parent: the empty record is a
//!   regular value that every rule handles
//! - Handler references use `Controller@action`, namespaces are `::`-separated,
//!   and a leading `::` marks a reference as absolute

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Separator between namespace segments, and the absolute-reference marker.
pub const NAMESPACE_SEPARATOR: &str = "::";

static EMPTY: GroupAttributes = GroupAttributes::new();

/// Attributes declared by a group, or by a route acting as a singleton group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupAttributes {
    /// API versions the routes answer to.
    #[serde(deserialize_with = "version_set")]
    pub version: BTreeSet<String>,

    /// Path prefix, without surrounding slashes once merged.
    pub prefix: Option<String>,

    /// Host the routes are bound to.
    pub domain: Option<String>,

    /// Namespace qualifying relative handler references.
    pub namespace: Option<String>,

    /// Route name prefix (`as`), concatenated across groups.
    #[serde(rename = "as")]
    pub name: Option<String>,

    #[serde(deserialize_with = "tag_list")]
    pub middleware: Vec<String>,

    #[serde(deserialize_with = "tag_list")]
    pub providers: Vec<String>,

    #[serde(deserialize_with = "tag_list")]
    pub scopes: Vec<String>,

    #[serde(deserialize_with = "tag_list")]
    pub before: Vec<String>,

    #[serde(deserialize_with = "tag_list")]
    pub after: Vec<String>,

    /// Regex constraints per URI parameter.
    #[serde(rename = "where")]
    pub wheres: BTreeMap<String, String>,

    /// Whether successful responses take part in ETag handling.
    #[serde(alias = "conditionalRequest")]
    pub conditional_request: Option<bool>,

    /// Handler reference (`Controller@action`).
    pub uses: Option<String>,

    /// Unrecognized attributes, merged structurally.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl GroupAttributes {
    pub const fn new() -> Self {
        Self {
            version: BTreeSet::new(),
            prefix: None,
            domain: None,
            namespace: None,
            name: None,
            middleware: Vec::new(),
            providers: Vec::new(),
            scopes: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            wheres: BTreeMap::new(),
            conditional_request: None,
            uses: None,
            extensions: BTreeMap::new(),
        }
    }

    /// The all-absent record.
    pub fn empty() -> &'static GroupAttributes {
        &EMPTY
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version.insert(version.into());
        self
    }

    pub fn versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.version.extend(versions.into_iter().map(Into::into));
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append middleware tags. `"auth|throttle"` adds two.
    pub fn middleware(mut self, tags: &str) -> Self {
        self.middleware.extend(split_tags(tags));
        self
    }

    pub fn providers(mut self, tags: &str) -> Self {
        self.providers.extend(split_tags(tags));
        self
    }

    pub fn scopes(mut self, tags: &str) -> Self {
        self.scopes.extend(split_tags(tags));
        self
    }

    pub fn before(mut self, tags: &str) -> Self {
        self.before.extend(split_tags(tags));
        self
    }

    pub fn after(mut self, tags: &str) -> Self {
        self.after.extend(split_tags(tags));
        self
    }

    /// Constrain a URI parameter with a regex.
    pub fn constrain(mut self, param: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.wheres.insert(param.into(), pattern.into());
        self
    }

    pub fn conditional_request(mut self, enabled: bool) -> Self {
        self.conditional_request = Some(enabled);
        self
    }

    pub fn uses(mut self, reference: impl Into<String>) -> Self {
        self.uses = Some(reference.into());
        self
    }

    pub fn extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// The prefix without surrounding slashes, if non-empty.
    pub fn trimmed_prefix(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
    }

    /// The host routes are restricted to. An empty domain means any host.
    pub fn trimmed_domain(&self) -> Option<&str> {
        self.domain.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }
}

/// Merge `new` onto the attributes inherited from `old`.
pub fn merge(new: GroupAttributes, old: &GroupAttributes) -> GroupAttributes {
    let GroupAttributes {
        version,
        prefix,
        domain,
        namespace,
        name,
        middleware,
        providers,
        scopes,
        before,
        after,
        wheres,
        conditional_request,
        uses,
        extensions,
    } = new;

    let uses = match uses {
        Some(reference) => Some(qualify(&reference, old.namespace.as_deref())),
        None => old.uses.clone(),
    };

    let mut merged_wheres = old.wheres.clone();
    merged_wheres.extend(wheres);

    let mut merged_extensions = old.extensions.clone();
    for (key, value) in extensions {
        let merged = match merged_extensions.remove(&key) {
            Some(previous) => merge_values(previous, value),
            None => value,
        };
        merged_extensions.insert(key, merged);
    }

    GroupAttributes {
        version: old.version.iter().cloned().chain(version).collect(),
        prefix: match prefix {
            Some(prefix) => Some(join_prefix(old.prefix.as_deref(), &prefix)),
            None => old.prefix.clone(),
        },
        domain: domain.or_else(|| old.domain.clone()),
        namespace: match namespace {
            Some(namespace) => Some(join_namespace(old.namespace.as_deref(), &namespace)),
            None => old.namespace.clone(),
        },
        name: match (&old.name, name) {
            (Some(old), Some(new)) => Some(format!("{old}{new}")),
            (old, new) => new.or_else(|| old.clone()),
        },
        middleware: concat(&old.middleware, middleware),
        providers: concat(&old.providers, providers),
        scopes: concat(&old.scopes, scopes),
        before: concat(&old.before, before),
        after: concat(&old.after, after),
        wheres: merged_wheres,
        conditional_request: conditional_request.or(old.conditional_request),
        uses,
        extensions: merged_extensions,
    }
}

/// Qualify a handler reference with a namespace unless it is absolute.
pub fn qualify(reference: &str, namespace: Option<&str>) -> String {
    if let Some(absolute) = reference.strip_prefix(NAMESPACE_SEPARATOR) {
        return absolute.to_string();
    }
    match namespace.map(|n| n.trim_matches(':')).filter(|n| !n.is_empty()) {
        Some(namespace) => format!("{namespace}{NAMESPACE_SEPARATOR}{reference}"),
        None => reference.to_string(),
    }
}

/// Split a `|`-delimited tag string.
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split('|')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_prefix(old: Option<&str>, new: &str) -> String {
    join(old.unwrap_or(""), new, '/', "/")
}

fn join_namespace(old: Option<&str>, new: &str) -> String {
    join(old.unwrap_or(""), new, ':', NAMESPACE_SEPARATOR)
}

fn join(old: &str, new: &str, trim: char, separator: &str) -> String {
    [old.trim_matches(trim), new.trim_matches(trim)]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn concat(old: &[String], new: Vec<String>) -> Vec<String> {
    old.iter().cloned().chain(new).collect()
}

fn merge_values(old: Value, new: Value) -> Value {
    match (old, new) {
        (Value::Object(mut old), Value::Object(new)) => {
            for (key, value) in new {
                let merged = match old.remove(&key) {
                    Some(previous) => merge_values(previous, value),
                    None => value,
                };
                old.insert(key, merged);
            }
            Value::Object(old)
        }
        (Value::Array(mut old), Value::Array(new)) => {
            old.extend(new);
            Value::Array(old)
        }
        (_, new) => new,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn version_set<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(version) => BTreeSet::from([version]),
        OneOrMany::Many(versions) => versions.into_iter().collect(),
    })
}

fn tag_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(tags) => split_tags(&tags),
        OneOrMany::Many(tags) => tags,
    })
}
