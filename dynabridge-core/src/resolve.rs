//! # Overload Resolver
//!
//! Picks the overload of an operation matching the arguments of a call. Overloads are
//! tried in catalog order and the first match wins:
//!
//! 1. No declared parameters and no arguments: [`Strategy::NoArguments`].
//! 2. The arguments look like a request object: [`Strategy::RequestObject`].
//! 3. As many arguments as parameters, and the first parameter is not a complex
//!    request type: [`Strategy::Positional`].
//!
//! Arguments look like a request object when all of the following hold:
//!
//! * more than one argument is supplied and at least one parameter is declared,
//! * the argument count is even, or the last parameter takes raw content (bytes),
//! * at least one argument is a field-name token,
//! * the first or the last parameter is a complex request type.
//!
//! An odd number of key/value arguments against an operation without a trailing raw
//! content parameter never matches.
use crate::{
    client::OperationDescriptor, coerce::CoercionRegistry, credential::Credential, value::Value,
};

/// One supplied argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A field-name token, the key half of a key/value pair.
    Field(String),
    Value(Value),
}

impl Arg {
    pub fn is_field(&self) -> bool {
        matches!(self, Arg::Field(_))
    }

    /// The argument as a generic value. Field tokens read as strings.
    pub fn to_value(&self) -> Value {
        match self {
            Arg::Field(name) => Value::String(name.clone()),
            Arg::Value(value) => value.clone(),
        }
    }
}

/// The arguments of one call: an optional leading credential followed by
/// key/value pairs or positional values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    credential: Option<Credential>,
    items: Vec<Arg>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Appends a `key value` pair.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.items.push(Arg::Field(key.into()));
        self.items.push(Arg::Value(value.into()));
        self
    }

    pub fn positional(mut self, value: impl Into<Value>) -> Self {
        self.items.push(Arg::Value(value.into()));
        self
    }

    pub fn push(mut self, arg: Arg) -> Self {
        self.items.push(arg);
        self
    }

    /// Plain values, the first of which may be a credential map.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        let mut values = values.into_iter().peekable();
        let credential = values.peek().and_then(Credential::from_value);
        if credential.is_some() {
            values.next();
        }

        Self {
            credential,
            items: values.map(Arg::Value).collect(),
        }
    }

    pub fn leading_credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn items(&self) -> &[Arg] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// When the only argument is a map, the same call with the map spread into
    /// key/value pairs.
    pub fn flatten_single_map(&self) -> Option<Args> {
        let [Arg::Value(Value::Map(entries))] = self.items.as_slice() else {
            return None;
        };

        let items = entries
            .iter()
            .flat_map(|(key, value)| [Arg::Field(key.clone()), Arg::Value(value.clone())])
            .collect();

        Some(Args {
            credential: self.credential.clone(),
            items,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NoArguments,
    /// Build one request object from key/value pairs.
    RequestObject,
    /// Coerce each argument to the parameter at the same position.
    Positional,
}

#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub overload: &'a OperationDescriptor,
    pub strategy: Strategy,
}

pub fn resolve<'a>(
    overloads: &'a [OperationDescriptor],
    args: &[Arg],
    registry: &CoercionRegistry,
) -> Option<Resolution<'a>> {
    overloads.iter().find_map(|overload| {
        strategy(overload, args, registry).map(|strategy| Resolution { overload, strategy })
    })
}

fn strategy(
    overload: &OperationDescriptor,
    args: &[Arg],
    registry: &CoercionRegistry,
) -> Option<Strategy> {
    let params = &overload.params;

    if params.is_empty() && args.is_empty() {
        return Some(Strategy::NoArguments);
    }

    if looks_like_request_object(overload, args, registry) {
        return Some(Strategy::RequestObject);
    }

    if let Some(first) = params.first()
        && params.len() == args.len()
        && !registry.is_complex(first)
    {
        return Some(Strategy::Positional);
    }

    None
}

pub fn looks_like_request_object(
    overload: &OperationDescriptor,
    args: &[Arg],
    registry: &CoercionRegistry,
) -> bool {
    let (Some(first), Some(last)) = (overload.params.first(), overload.params.last()) else {
        return false;
    };

    args.len() > 1
        && (args.len() % 2 == 0 || last.is_raw_content())
        && args.iter().any(Arg::is_field)
        && (registry.is_complex(first) || registry.is_complex(last))
}
