//! Universal abstract syntax tree as returned by the parsing service

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

macro_rules! roles {
    ($($role:ident),+ $(,)?) => {
        /// Annotation attached to a node describing what it is, independently of
        /// the source language.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Role {
            $($role),+
        }

        impl Role {
            pub const ALL: &'static [Role] = &[$(Role::$role),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Role::$role => stringify!($role)),+
                }
            }
        }

        impl FromStr for Role {
            type Err = UnknownRole;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($role) => Ok(Role::$role),)+
                    _ => Err(UnknownRole(s.to_string())),
                }
            }
        }
    };
}

roles! {
    Invalid, Identifier, Qualified, Operator, Binary, Unary, Left, Right, Infix, Postfix,
    Bitwise, Boolean, Unsigned, LeftShift, RightShift, Or, Xor, And, Expression, Statement,
    Equal, Not, LessThan, LessThanOrEqual, GreaterThan, GreaterThanOrEqual, Identical,
    Contains, Increment, Decrement, Negative, Positive, Dereference, TakeAddress, File, Add,
    Substract, Multiply, Divide, Modulo, Package, Declaration, Import, Pathname, Alias,
    Function, Body, Name, Receiver, Argument, Value, ArgsList, Base, Implements, Instance,
    Subtype, Subpackage, Module, Friend, World, If, Condition, Then, Else, Switch, Case,
    Default, For, Initialization, Update, Iterator, While, DoWhile, Break, Continue, Goto,
    Block, Scope, Return, Try, Catch, Finally, Throw, Assert, Call, Callee, Positional,
    Noop, Literal, Byte, ByteString, Character, List, Map, Null, Number, Regexp, Set,
    String, Tuple, Type, Entry, Key, Primitive, Assignment, This, Comment, Documentation,
    Whitespace, Incomplete, Unannotated, Visibility, Annotation, Anonymous, Enumeration,
    Arithmetic, Relational, Variable,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A single syntax node. Leaves carry an empty `children` list, never a missing one;
/// the viewer depends on all three fields being present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "InternalType")]
    pub internal_type: String,
    #[serde(rename = "Roles")]
    pub roles: Vec<Role>,
    #[serde(rename = "Children")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(internal_type: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            internal_type: internal_type.into(),
            roles,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Visit this node and all of its descendants in document order.
    pub fn pre_order(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Alias.to_string(), "Alias");
        assert_eq!(Role::LessThanOrEqual.to_string(), "LessThanOrEqual");
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("Import".parse::<Role>().unwrap(), Role::Import);
        assert_eq!("Variable".parse::<Role>().unwrap(), Role::Variable);
        assert_eq!(
            "import".parse::<Role>(),
            Err(UnknownRole("import".to_string()))
        );
    }

    #[test]
    fn test_every_role_parses_back() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
    }

    #[test]
    fn test_leaf_serializes_empty_children() {
        let node = Node::new("Child2", vec![Role::Alias]);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"InternalType": "Child2", "Roles": ["Alias"], "Children": []})
        );
    }

    #[test]
    fn test_roleless_node_serializes_empty_roles() {
        let node = Node::new("Block", vec![]);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["Roles"], json!([]));
    }

    #[test]
    fn test_pre_order() {
        let tree = Node::new("A", vec![]).with_children(vec![
            Node::new("B", vec![]).with_children(vec![Node::new("C", vec![])]),
            Node::new("D", vec![]),
        ]);

        let order: Vec<_> = tree
            .pre_order()
            .into_iter()
            .map(|n| n.internal_type.as_str())
            .collect();
        assert_eq!(order, vec!["A", "B", "C", "D"]);
    }
}
