//! Client value coercion and variable filling.
//!
//! Client-submitted values always arrive as plain strings (or arrays of
//! strings), never as native typed values. This module turns them into
//! strongly typed runtime values according to the declared base type and
//! cardinality, the only way a [`RuntimeVariable`] can come into existence.

use serde::{Deserialize, Serialize};

use crate::error::{CoercionError, FillError};
use crate::model::{BaseType, Cardinality, ItemDefinition, VariableDeclaration};

/// A value as transmitted by the client: a scalar string or an array of
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientValue {
    Scalar(String),
    List(Vec<String>),
}

impl From<&str> for ClientValue {
    fn from(s: &str) -> Self {
        ClientValue::Scalar(s.to_string())
    }
}

impl From<Vec<String>> for ClientValue {
    fn from(vs: Vec<String>) -> Self {
        ClientValue::List(vs)
    }
}

/// A strongly typed runtime value. The tag always matches the declared
/// base type; invalid combinations are unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum QtiValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Identifier(String),
    Uri(String),
    Point(i64, i64),
    Pair(String, String),
    DirectedPair(String, String),
}

impl QtiValue {
    /// The base type this value was coerced for.
    pub fn base_type(&self) -> BaseType {
        match self {
            QtiValue::Boolean(_) => BaseType::Boolean,
            QtiValue::Integer(_) => BaseType::Integer,
            QtiValue::Float(_) => BaseType::Float,
            QtiValue::String(_) => BaseType::String,
            QtiValue::Identifier(_) => BaseType::Identifier,
            QtiValue::Uri(_) => BaseType::Uri,
            QtiValue::Point(_, _) => BaseType::Point,
            QtiValue::Pair(_, _) => BaseType::Pair,
            QtiValue::DirectedPair(_, _) => BaseType::DirectedPair,
        }
    }
}

/// The value bound to a runtime variable, shaped by its cardinality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cardinality", content = "values", rename_all = "lowercase")]
pub enum BoundValue {
    Single(QtiValue),
    Multiple(Vec<QtiValue>),
    Ordered(Vec<QtiValue>),
}

impl BoundValue {
    /// Equality that ignores element order for `Multiple` containers.
    pub fn equals(&self, other: &BoundValue) -> bool {
        match (self, other) {
            (BoundValue::Multiple(a), BoundValue::Multiple(b)) => {
                a.len() == b.len() && a.iter().all(|v| b.contains(v))
            }
            _ => self == other,
        }
    }
}

/// A declaration bound to a concrete value. Created by
/// [`VariableFiller::fill`], mutated only by replacing the bound value,
/// destroyed with the owning session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeVariable {
    pub declaration: VariableDeclaration,
    pub value: BoundValue,
}

/// Coerce one client value into a [`QtiValue`] of the given base type.
///
/// Numeric parsing is locale-independent; non-numeric input yields a zero
/// value rather than an error, matching historical behavior. Boolean
/// accepts only the literal `"true"` token.
pub fn coerce(base_type: BaseType, raw: &ClientValue) -> Result<QtiValue, CoercionError> {
    if base_type.is_tuple() {
        let (a, b) = pair_components(base_type, raw)?;
        return Ok(match base_type {
            BaseType::Point => QtiValue::Point(parse_integer(a), parse_integer(b)),
            BaseType::Pair => QtiValue::Pair(a.to_string(), b.to_string()),
            BaseType::DirectedPair => QtiValue::DirectedPair(a.to_string(), b.to_string()),
            _ => unreachable!("is_tuple covers exactly these three"),
        });
    }

    let scalar = match raw {
        ClientValue::Scalar(s) => s.as_str(),
        ClientValue::List(_) => return Err(CoercionError::ExpectedScalar { base_type }),
    };

    Ok(match base_type {
        BaseType::Boolean => QtiValue::Boolean(scalar == "true"),
        BaseType::Integer => QtiValue::Integer(parse_integer(scalar)),
        BaseType::Float => QtiValue::Float(parse_float(scalar)),
        BaseType::String => QtiValue::String(scalar.to_string()),
        BaseType::Identifier => QtiValue::Identifier(scalar.to_string()),
        BaseType::Uri => QtiValue::Uri(scalar.to_string()),
        _ => unreachable!("tuple types handled above"),
    })
}

fn pair_components<'a>(
    base_type: BaseType,
    raw: &'a ClientValue,
) -> Result<(&'a str, &'a str), CoercionError> {
    match raw {
        ClientValue::List(vs) if vs.len() == 2 => Ok((&vs[0], &vs[1])),
        ClientValue::List(vs) => Err(CoercionError::ExpectedPair {
            base_type,
            got: vs.len(),
        }),
        ClientValue::Scalar(_) => Err(CoercionError::ExpectedPair { base_type, got: 1 }),
    }
}

/// Leading-numeric parse with a zero fallback, like C `atoi`.
fn parse_integer(s: &str) -> i64 {
    let trimmed = s.trim();
    match trimmed.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            // Accept a numeric prefix ("12px" -> 12), else 0.
            let end = trimmed
                .char_indices()
                .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
                .map(|(i, c)| i + c.len_utf8())
                .last()
                .unwrap_or(0);
            trimmed[..end].parse::<i64>().unwrap_or(0)
        }
    }
}

fn parse_float(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(0.0)
}

/// Fills runtime variables for one item from client-submitted values.
pub struct VariableFiller<'a> {
    item: &'a ItemDefinition,
}

impl<'a> VariableFiller<'a> {
    /// Create a filler for the item whose variables are being filled.
    pub fn new(item: &'a ItemDefinition) -> Self {
        Self { item }
    }

    /// Fill the variable named `identifier` with a correctly transformed
    /// client value.
    ///
    /// Response declarations are consulted first, then outcome
    /// declarations. A non-array client value is wrapped into a
    /// single-element list before coercion; the coerced elements are bound
    /// according to the declared cardinality. If any element fails
    /// coercion the partially built result is discarded.
    pub fn fill(
        &self,
        identifier: &str,
        value: ClientValue,
    ) -> Result<RuntimeVariable, FillError> {
        let declaration = self.lookup(identifier).ok_or_else(|| {
            FillError::VariableNotDeclared {
                identifier: identifier.to_string(),
                item: self.item.identifier.clone(),
            }
        })?;

        tracing::debug!(variable = identifier, "filling variable");

        let bound = bind(&declaration, value).map_err(|source| {
            FillError::ValueCoercionFailed {
                identifier: identifier.to_string(),
                source,
            }
        })?;

        Ok(RuntimeVariable {
            declaration,
            value: bound,
        })
    }

    fn lookup(&self, identifier: &str) -> Option<VariableDeclaration> {
        self.item
            .response_declarations
            .iter()
            .map(|r| &r.variable)
            .chain(self.item.outcome_declarations.iter())
            .find(|d| d.identifier == identifier)
            .cloned()
    }
}

/// Coerce each element of the client value and bind the result per the
/// declared cardinality.
fn bind(
    declaration: &VariableDeclaration,
    value: ClientValue,
) -> Result<BoundValue, CoercionError> {
    let base_type = declaration.base_type;

    // A single tuple value is transmitted as one 2-element array; keep it
    // whole instead of splitting into scalar elements.
    let elements: Vec<ClientValue> = match value {
        ClientValue::Scalar(s) => vec![ClientValue::Scalar(s)],
        ClientValue::List(vs)
            if base_type.is_tuple() && declaration.cardinality == Cardinality::Single =>
        {
            vec![ClientValue::List(vs)]
        }
        ClientValue::List(vs) => vs.into_iter().map(ClientValue::Scalar).collect(),
    };

    let mut coerced = Vec::with_capacity(elements.len());
    for element in &elements {
        coerced.push(coerce(base_type, element)?);
    }

    match declaration.cardinality {
        Cardinality::Single => coerced
            .into_iter()
            .next()
            .map(BoundValue::Single)
            .ok_or(CoercionError::EmptyInput),
        Cardinality::Multiple => Ok(BoundValue::Multiple(coerced)),
        Cardinality::Ordered => Ok(BoundValue::Ordered(coerced)),
    }
}
