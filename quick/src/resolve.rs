//! Generator descriptions and their resolution into `GeneratorSpec` trees.
//!
//! A [`Description`] is what a property declares for each parameter: a leaf
//! tag, a one-element sequence literal, a one-entry mapping literal, or a
//! builder whose own parameters carry descriptions. The [`Resolver`] turns it
//! into an immutable [`GeneratorSpec`] once, at registration time.

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, InvalidSpecReason, PropertyError, Result};
use crate::generator::{BuildFn, Compose, Domain, GeneratorSpec, Param, PrimitiveKind};
use crate::value::{Arguments, Value};

/// Leaf generator tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Unrestricted number
    Number,
    /// Strictly positive whole number
    PositiveNumber,
    Integer,
    Boolean,
    Text,
}

impl Tag {
    /// Look a tag up by one of its conventional names
    pub fn from_name(name: &str) -> Option<Tag> {
        match name {
            "number" | "num" | "float" => Some(Tag::Number),
            "positive_num" | "positive" => Some(Tag::PositiveNumber),
            "int" | "integer" => Some(Tag::Integer),
            "bool" | "boolean" => Some(Tag::Boolean),
            "str" | "string" | "text" => Some(Tag::Text),
            _ => None,
        }
    }

    fn primitive(self) -> (PrimitiveKind, Domain) {
        match self {
            Tag::Number => (PrimitiveKind::Number, Domain::Any),
            Tag::PositiveNumber => (PrimitiveKind::Number, Domain::Positive),
            Tag::Integer => (PrimitiveKind::Integer, Domain::Any),
            Tag::Boolean => (PrimitiveKind::Boolean, Domain::Any),
            Tag::Text => (PrimitiveKind::Text, Domain::Any),
        }
    }
}

/// Produces a description on demand; used for self-referential definitions
pub type DeferFn = Arc<dyn Fn() -> Description + Send + Sync>;

/// A builder function together with its declared parameters
#[derive(Clone)]
pub struct BuilderDef {
    name: String,
    params: Vec<(String, Description)>,
    builder: BuildFn,
}

/// Declared, unresolved generator of one parameter
#[derive(Clone)]
pub enum Description {
    Tag(Tag),
    /// A leaf tag given by name
    Named(String),
    /// One-element sequence literal
    Sequence(Vec<Description>),
    /// One-entry mapping literal
    Mapping(Vec<(Description, Description)>),
    Builder(BuilderDef),
    Deferred(DeferFn),
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Description::Tag(tag) => write!(f, "Tag({:?})", tag),
            Description::Named(name) => write!(f, "Named({:?})", name),
            Description::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            Description::Mapping(entries) => f.debug_tuple("Mapping").field(entries).finish(),
            Description::Builder(def) => f
                .debug_struct("Builder")
                .field("name", &def.name)
                .field("params", &def.params)
                .finish_non_exhaustive(),
            Description::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

impl From<Tag> for Description {
    fn from(tag: Tag) -> Self {
        Description::Tag(tag)
    }
}

impl From<&str> for Description {
    fn from(name: &str) -> Self {
        Description::Named(name.to_string())
    }
}

impl From<String> for Description {
    fn from(name: String) -> Self {
        Description::Named(name)
    }
}

pub fn number() -> Description {
    Description::Tag(Tag::Number)
}

pub fn positive_num() -> Description {
    Description::Tag(Tag::PositiveNumber)
}

pub fn integer() -> Description {
    Description::Tag(Tag::Integer)
}

pub fn boolean() -> Description {
    Description::Tag(Tag::Boolean)
}

pub fn text() -> Description {
    Description::Tag(Tag::Text)
}

/// A leaf tag looked up by name at resolution time
pub fn named(name: impl Into<String>) -> Description {
    Description::Named(name.into())
}

/// Sequences whose elements follow `element`
pub fn list_of(element: impl Into<Description>) -> Description {
    Description::Sequence(vec![element.into()])
}

/// Mappings with keys from `key` and values from `value`
pub fn dict_of(key: impl Into<Description>, value: impl Into<Description>) -> Description {
    Description::Mapping(vec![(key.into(), value.into())])
}

/// A description computed when resolved
pub fn deferred<F>(f: F) -> Description
where
    F: Fn() -> Description + Send + Sync + 'static,
{
    Description::Deferred(Arc::new(f))
}

/// Start declaring a builder function named `name`
pub fn builder(name: impl Into<String>) -> BuilderDraft {
    BuilderDraft {
        name: name.into(),
        params: Vec::new(),
    }
}

/// Builder declaration in progress
#[derive(Debug, Clone)]
pub struct BuilderDraft {
    name: String,
    params: Vec<(String, Description)>,
}

impl BuilderDraft {
    /// Declare the next parameter of the builder
    pub fn param(mut self, name: impl Into<String>, description: impl Into<Description>) -> Self {
        self.params.push((name.into(), description.into()));
        self
    }

    /// Attach the builder function, receiving parameter values by name
    pub fn build<F, V, E>(self, f: F) -> Description
    where
        F: Fn(&Arguments) -> std::result::Result<V, E> + Send + Sync + 'static,
        V: Into<Value>,
        E: fmt::Display,
    {
        let builder: BuildFn = Arc::new(move |args: &Arguments| {
            f(args).map(Into::into).map_err(PropertyError::raised)
        });
        Description::Builder(BuilderDef {
            name: self.name,
            params: self.params,
            builder,
        })
    }
}

/// Turns descriptions into generator trees
#[derive(Debug, Clone)]
pub struct Resolver {
    max_depth: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Config::default().max_depth)
    }
}

impl Resolver {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Resolve a description; `path` names the parameter in errors
    pub fn resolve(&self, path: &str, description: &Description) -> Result<Arc<GeneratorSpec>> {
        self.resolve_at(path, description, 1)
    }

    fn resolve_at(
        &self,
        path: &str,
        description: &Description,
        depth: usize,
    ) -> Result<Arc<GeneratorSpec>> {
        if depth > self.max_depth {
            return Err(Error::invalid_spec(
                path,
                InvalidSpecReason::DepthExceeded(self.max_depth),
            ));
        }

        match description {
            Description::Tag(tag) => {
                let (kind, domain) = tag.primitive();
                Ok(GeneratorSpec::primitive(kind, domain))
            }
            Description::Named(name) => match Tag::from_name(name) {
                Some(tag) => self.resolve_at(path, &Description::Tag(tag), depth),
                None => Err(Error::invalid_spec(
                    path,
                    InvalidSpecReason::UnknownTag(name.clone()),
                )),
            },
            Description::Sequence(items) => {
                let element = single(path, items)?;
                let element = self.resolve_at(&format!("{}[]", path), element, depth + 1)?;
                Ok(Arc::new(GeneratorSpec::Sequence(element)))
            }
            Description::Mapping(entries) => {
                let (key, value) = single(path, entries)?;
                let key = self.resolve_at(&format!("{}{{key}}", path), key, depth + 1)?;
                let value = self.resolve_at(&format!("{}{{value}}", path), value, depth + 1)?;
                Ok(Arc::new(GeneratorSpec::Mapping(key, value)))
            }
            Description::Builder(def) => {
                let params = def
                    .params
                    .iter()
                    .map(|(name, child)| {
                        let spec = self.resolve_at(&format!("{}.{}", path, name), child, depth + 1)?;
                        Ok(Param {
                            name: name.clone(),
                            spec,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Arc::new(GeneratorSpec::Compose(Compose {
                    name: def.name.clone(),
                    params,
                    builder: Arc::clone(&def.builder),
                })))
            }
            Description::Deferred(produce) => self.resolve_at(path, &produce(), depth + 1),
        }
    }
}

/// Resolve with the default depth cutoff
pub fn resolve(description: &Description) -> Result<Arc<GeneratorSpec>> {
    Resolver::default().resolve("$", description)
}

fn single<'a, T>(path: &str, items: &'a [T]) -> Result<&'a T> {
    match items {
        [item] => Ok(item),
        [] => Err(Error::invalid_spec(path, InvalidSpecReason::EmptyLiteral)),
        _ => Err(Error::invalid_spec(
            path,
            InvalidSpecReason::AmbiguousLiteral(items.len()),
        )),
    }
}
