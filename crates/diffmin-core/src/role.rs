//! Roles and the role-indexed collection accessor.
//!
//! A [`Role`] is the relationship of a node to its parent. The list-valued
//! roles denote an ordered sibling collection; [`collection_for`] returns it
//! and [`index_of`] locates a node inside it. The enumeration is closed: a
//! role that is not list-valued is reported as unsupported rather than
//! guessed at.

use std::fmt;

use crate::tree::{NodeId, Tree, TreeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// The package root; has no parent.
    Root,
    Statement,
    Argument,
    TypeMember,
    TypeParameter,
    Parameter,
    /// A top-level type of a compilation unit.
    ContainedType,
    Case,
    CaseExpression,
    Annotation,
    Thrown,
    Import,
    /// A modifier keyword, or the aggregate modifier list of a declaration.
    Modifier,
    PackageDeclaration,
    CaseLabel,
    /// A named field of the parent.
    Slot(Slot),
    /// An unnamed child of a node that keeps its own tokens.
    Child,
    /// An anonymous token (keyword, operator, punctuation).
    Token,
}

impl Role {
    pub const COLLECTIONS: [Role; 11] = [
        Role::Statement,
        Role::Argument,
        Role::TypeMember,
        Role::TypeParameter,
        Role::Parameter,
        Role::ContainedType,
        Role::Case,
        Role::CaseExpression,
        Role::Annotation,
        Role::Thrown,
        Role::Import,
    ];

    /// Whether the role denotes an ordered sibling collection.
    pub fn is_collection(self) -> bool {
        Role::COLLECTIONS.contains(&self)
    }

    /// Non-collection roles that may still occur several times under one
    /// parent, so that they need an ordinal to be addressed.
    pub fn is_repeatable(self) -> bool {
        match self {
            Role::Child | Role::Token | Role::CaseLabel | Role::Modifier => true,
            Role::Slot(slot) => slot.is_repeatable(),
            _ => false,
        }
    }

    /// Roles that hold at most one node per parent.
    pub fn is_single_slot(self) -> bool {
        match self {
            Role::PackageDeclaration => true,
            Role::Slot(slot) => !slot.is_repeatable(),
            _ => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Root => "root",
            Role::Statement => "statement",
            Role::Argument => "argument",
            Role::TypeMember => "type_member",
            Role::TypeParameter => "type_parameter",
            Role::Parameter => "parameter",
            Role::ContainedType => "contained_type",
            Role::Case => "case",
            Role::CaseExpression => "case_expression",
            Role::Annotation => "annotation",
            Role::Thrown => "thrown",
            Role::Import => "import",
            Role::Modifier => "modifier",
            Role::PackageDeclaration => "package_declaration",
            Role::CaseLabel => "case_label",
            Role::Slot(slot) => return write!(f, "{}", slot.field_name()),
            Role::Child => "child",
            Role::Token => "token",
        };
        f.write_str(name)
    }
}

/// Named single-node fields, after tree-sitter-java's field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Name,
    Type,
    Body,
    Condition,
    Consequence,
    Alternative,
    Value,
    Left,
    Right,
    Operand,
    Object,
    Field,
    Arguments,
    Parameters,
    TypeParameters,
    TypeArguments,
    Superclass,
    Interfaces,
    Permits,
    Declarator,
    Dimensions,
    Init,
    Update,
    Index,
    Array,
    Element,
    Pattern,
    Resources,
    Constructor,
    Scope,
    Key,
}

impl Slot {
    pub fn from_field(field: &str) -> Option<Self> {
        let slot = match field {
            "name" => Slot::Name,
            "type" => Slot::Type,
            "body" => Slot::Body,
            "condition" => Slot::Condition,
            "consequence" => Slot::Consequence,
            "alternative" => Slot::Alternative,
            "value" => Slot::Value,
            "left" => Slot::Left,
            "right" => Slot::Right,
            "operand" => Slot::Operand,
            "object" => Slot::Object,
            "field" => Slot::Field,
            "arguments" => Slot::Arguments,
            "parameters" => Slot::Parameters,
            "type_parameters" => Slot::TypeParameters,
            "type_arguments" => Slot::TypeArguments,
            "superclass" => Slot::Superclass,
            "interfaces" => Slot::Interfaces,
            "permits" => Slot::Permits,
            "declarator" => Slot::Declarator,
            "dimensions" => Slot::Dimensions,
            "init" => Slot::Init,
            "update" => Slot::Update,
            "index" => Slot::Index,
            "array" => Slot::Array,
            "element" => Slot::Element,
            "pattern" => Slot::Pattern,
            "resources" => Slot::Resources,
            "constructor" => Slot::Constructor,
            "scope" => Slot::Scope,
            "key" => Slot::Key,
            _ => return None,
        };
        Some(slot)
    }

    pub fn field_name(self) -> &'static str {
        match self {
            Slot::Name => "name",
            Slot::Type => "type",
            Slot::Body => "body",
            Slot::Condition => "condition",
            Slot::Consequence => "consequence",
            Slot::Alternative => "alternative",
            Slot::Value => "value",
            Slot::Left => "left",
            Slot::Right => "right",
            Slot::Operand => "operand",
            Slot::Object => "object",
            Slot::Field => "field",
            Slot::Arguments => "arguments",
            Slot::Parameters => "parameters",
            Slot::TypeParameters => "type_parameters",
            Slot::TypeArguments => "type_arguments",
            Slot::Superclass => "superclass",
            Slot::Interfaces => "interfaces",
            Slot::Permits => "permits",
            Slot::Declarator => "declarator",
            Slot::Dimensions => "dimensions",
            Slot::Init => "init",
            Slot::Update => "update",
            Slot::Index => "index",
            Slot::Array => "array",
            Slot::Element => "element",
            Slot::Pattern => "pattern",
            Slot::Resources => "resources",
            Slot::Constructor => "constructor",
            Slot::Scope => "scope",
            Slot::Key => "key",
        }
    }

    /// `int a, b;` has two declarators, `for (i = 0, j = 0; ..)` two inits.
    pub fn is_repeatable(self) -> bool {
        matches!(
            self,
            Slot::Declarator | Slot::Dimensions | Slot::Init | Slot::Update
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("unsupported role: {0}")]
    UnsupportedRole(Role),
    #[error("node {0} has no parent")]
    NoParent(NodeId),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// The ordered sibling collection that `node`'s role denotes in its parent.
pub fn collection_for(tree: &Tree, node: NodeId) -> Result<Vec<NodeId>, RoleError> {
    let role = tree.role(node);
    match role {
        Role::ContainedType => Ok(tree.only_unit()?.declared_types.clone()),
        Role::Statement
        | Role::Argument
        | Role::TypeMember
        | Role::TypeParameter
        | Role::Parameter
        | Role::Case
        | Role::CaseExpression
        | Role::Annotation
        | Role::Thrown
        | Role::Import => {
            let parent = tree.parent(node).ok_or(RoleError::NoParent(node))?;
            Ok(tree.children_with_role(parent, role))
        }
        Role::Root
        | Role::Modifier
        | Role::PackageDeclaration
        | Role::CaseLabel
        | Role::Slot(_)
        | Role::Child
        | Role::Token => Err(RoleError::UnsupportedRole(role)),
    }
}

/// Position of `node` in its role collection, or `None` when its role is not
/// list-valued.
pub fn index_of(tree: &Tree, node: NodeId) -> Result<Option<usize>, RoleError> {
    if !tree.role(node).is_collection() {
        return Ok(None);
    }
    let collection = collection_for(tree, node)?;
    Ok(collection.iter().position(|&n| n == node))
}
