//! Core data model types for qtiforge.
//!
//! These are the fundamental types that the entire qtiforge system uses
//! to represent authored tests, their structure, and variable declarations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::branch::BranchRule;
use crate::error::CoercionError;

/// An authored assessment test: an ordered tree of parts, sections and
/// item references, plus test-level outcome declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Unique identifier for this test.
    pub identifier: String,
    /// Human-readable title.
    pub title: String,
    /// Test-level outcome declarations.
    #[serde(default)]
    pub outcome_declarations: Vec<VariableDeclaration>,
    /// The ordered test parts.
    #[serde(default)]
    pub parts: Vec<TestPart>,
}

impl TestDefinition {
    /// Total number of item references across all parts and sections.
    pub fn item_ref_count(&self) -> usize {
        self.parts
            .iter()
            .flat_map(|p| &p.sections)
            .map(|s| s.item_refs.len())
            .sum()
    }
}

/// One test part, carrying its navigation mode and sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPart {
    /// Unique identifier within the test.
    pub identifier: String,
    /// Whether the candidate may move backward within this part.
    #[serde(default)]
    pub navigation_mode: NavigationMode,
    /// The ordered sections of this part.
    #[serde(default)]
    pub sections: Vec<AssessmentSection>,
}

/// Navigation mode of a test part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    /// Items are visited strictly in order; backward moves are rejected.
    #[default]
    Linear,
    /// The candidate may move backward to revisit items.
    NonLinear,
}

impl fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationMode::Linear => write!(f, "linear"),
            NavigationMode::NonLinear => write!(f, "nonlinear"),
        }
    }
}

impl FromStr for NavigationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(NavigationMode::Linear),
            "nonlinear" | "non-linear" => Ok(NavigationMode::NonLinear),
            other => Err(format!("unknown navigation mode: {other}")),
        }
    }
}

/// One section of a test part: rubric blocks plus ordered item references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSection {
    /// Unique identifier within the test.
    pub identifier: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Rubric blocks attached to this section.
    #[serde(default)]
    pub rubric_blocks: Vec<RubricBlock>,
    /// The ordered item references of this section.
    #[serde(default)]
    pub item_refs: Vec<ItemRef>,
}

/// A reference from a test to an item document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRef {
    /// Unique identifier within the test.
    pub identifier: String,
    /// Resolvable reference to the authored item document.
    pub href: String,
    /// Response-dependent rule redirecting navigation after this item.
    #[serde(default)]
    pub branch_rule: Option<BranchRule>,
}

/// Shared instructional markup attached to a section, rendered separately
/// from item content at compile time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricBlock {
    /// Unique identifier within the test; also used as the root element id
    /// that scoped stylesheets are bound to.
    pub identifier: String,
    /// Who the rubric is shown to.
    #[serde(default)]
    pub view: RubricView,
    /// The authored markup body.
    pub content: String,
    /// Stylesheet references, relative to the test content directory.
    #[serde(default)]
    pub stylesheets: Vec<String>,
}

/// The audience of a rubric block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RubricView {
    #[default]
    Candidate,
    Proctor,
    Scorer,
}

impl fmt::Display for RubricView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RubricView::Candidate => write!(f, "candidate"),
            RubricView::Proctor => write!(f, "proctor"),
            RubricView::Scorer => write!(f, "scorer"),
        }
    }
}

impl FromStr for RubricView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "candidate" => Ok(RubricView::Candidate),
            "proctor" => Ok(RubricView::Proctor),
            "scorer" => Ok(RubricView::Scorer),
            other => Err(format!("unknown rubric view: {other}")),
        }
    }
}

/// An authored item document, as far as the test compiler and the delivery
/// runtime need it: declarations and correct responses. Interaction bodies
/// are opaque to this crate and handled by the item compiler collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Unique identifier of the item.
    pub identifier: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Response variable declarations, with their correct responses.
    #[serde(default)]
    pub response_declarations: Vec<ResponseDeclaration>,
    /// Outcome variable declarations.
    #[serde(default)]
    pub outcome_declarations: Vec<VariableDeclaration>,
}

/// A response declaration: a variable declaration plus the set of response
/// identifiers considered correct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDeclaration {
    #[serde(flatten)]
    pub variable: VariableDeclaration,
    /// Identifiers of the correct responses, in declaration order.
    #[serde(default)]
    pub correct_responses: Vec<String>,
}

/// A declared variable: identifier, base type, cardinality and an optional
/// default value. Immutable once loaded from the authored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// The variable identifier.
    pub identifier: String,
    /// The primitive datatype of the variable.
    pub base_type: BaseType,
    /// How many values the variable holds.
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Default value tokens, coerced on bind.
    #[serde(default)]
    pub default_value: Option<Vec<String>>,
}

/// The nine recognized base types a variable can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseType {
    Boolean,
    Integer,
    Float,
    String,
    Identifier,
    Point,
    Pair,
    DirectedPair,
    Uri,
}

impl BaseType {
    /// Whether values of this type are built from a 2-element input.
    pub fn is_tuple(&self) -> bool {
        matches!(self, BaseType::Point | BaseType::Pair | BaseType::DirectedPair)
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::Boolean => write!(f, "boolean"),
            BaseType::Integer => write!(f, "integer"),
            BaseType::Float => write!(f, "float"),
            BaseType::String => write!(f, "string"),
            BaseType::Identifier => write!(f, "identifier"),
            BaseType::Point => write!(f, "point"),
            BaseType::Pair => write!(f, "pair"),
            BaseType::DirectedPair => write!(f, "directedPair"),
            BaseType::Uri => write!(f, "uri"),
        }
    }
}

impl FromStr for BaseType {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(BaseType::Boolean),
            "integer" => Ok(BaseType::Integer),
            "float" => Ok(BaseType::Float),
            "string" => Ok(BaseType::String),
            "identifier" => Ok(BaseType::Identifier),
            "point" => Ok(BaseType::Point),
            "pair" => Ok(BaseType::Pair),
            "directedPair" => Ok(BaseType::DirectedPair),
            "uri" => Ok(BaseType::Uri),
            other => Err(CoercionError::UnsupportedBaseType(other.to_string())),
        }
    }
}

/// Whether a variable holds one value, an unordered bag, or an ordered list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Single,
    Multiple,
    Ordered,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Single => write!(f, "single"),
            Cardinality::Multiple => write!(f, "multiple"),
            Cardinality::Ordered => write!(f, "ordered"),
        }
    }
}

impl FromStr for Cardinality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(Cardinality::Single),
            "multiple" => Ok(Cardinality::Multiple),
            "ordered" => Ok(Cardinality::Ordered),
            other => Err(format!("unknown cardinality: {other}")),
        }
    }
}
