//! Path queries over a UAST.
//!
//! The supported language is the subset of XPath 1.0 that makes sense for a tree whose
//! nodes only carry an internal type and a set of roles:
//!
//! ```text
//! //*[@roleAlias]                     every node with the Alias role
//! /File/*[1]                          first child of the root, if the root is a File
//! //Call[not(@roleCallee)]/..         parents of Call nodes that are not callees
//! //*[@internalType='Import'] | //*[ancestor::Module]
//! ```
//!
//! Matches are returned in document order without duplicates.

use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

use crate::core::uast::{Node, Role};

/// Internal type of the synthetic root that wraps query matches.
pub const SEARCH_RESULTS_TYPE: &str = "Dashboard: Search results";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid query {query:?} at position {position}: {message}")]
pub struct QueryError {
    pub query: String,
    pub position: usize,
    pub message: String,
}

/// Apply `query` to `tree`. No query, or an empty one, returns the tree untouched;
/// otherwise the matches become the children of a synthetic root node.
pub fn filter(tree: Option<Node>, query: Option<&str>) -> Result<Option<Node>, QueryError> {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Ok(tree);
    };
    let Some(tree) = tree else {
        return Ok(None);
    };

    let matches = Query::parse(query)?
        .select(&tree)
        .into_iter()
        .cloned()
        .collect();

    Ok(Some(Node::new(SEARCH_RESULTS_TYPE, vec![]).with_children(matches)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    paths: Vec<LocationPath>,
}

#[derive(Debug, Clone, PartialEq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfNode,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "self" => Some(Axis::SelfNode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    /// `node()`, also matches the document itself
    Node,
    /// `*`
    Any,
    Type(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    HasRole(Role),
    TypeEq { value: String, negate: bool },
    Position(usize),
    Last,
    Path(LocationPath),
}

impl Query {
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        let tokens = tokenize(query).map_err(|(position, message)| QueryError {
            query: query.to_string(),
            position,
            message,
        })?;

        Parser {
            query,
            tokens,
            pos: 0,
        }
        .parse_query()
    }

    /// Nodes of `tree` matched by this query, in document order.
    pub fn select<'a>(&self, tree: &'a Node) -> Vec<&'a Node> {
        let arena = Arena::new(tree);
        let mut matched: Vec<usize> = self
            .paths
            .iter()
            .flat_map(|path| arena.eval_path(path, DOCUMENT))
            .collect();
        matched.sort_unstable();
        matched.dedup();

        matched
            .into_iter()
            .filter_map(|idx| arena.entries[idx].node)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Dot,
    DotDot,
    Star,
    Pipe,
    ColonColon,
    Eq,
    NotEq,
    Name(String),
    Literal(String),
    Number(usize),
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn tokenize(query: &str) -> Result<Vec<(usize, Token)>, (usize, String)> {
    let mut tokens = Vec::new();
    let mut chars: Peekable<CharIndices> = query.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '/' if chars.next_if(|&(_, c)| c == '/').is_some() => Token::DoubleSlash,
            '/' => Token::Slash,
            '.' if chars.next_if(|&(_, c)| c == '.').is_some() => Token::DotDot,
            '.' => Token::Dot,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '@' => Token::At,
            '*' => Token::Star,
            '|' => Token::Pipe,
            '=' => Token::Eq,
            ':' if chars.next_if(|&(_, c)| c == ':').is_some() => Token::ColonColon,
            '!' if chars.next_if(|&(_, c)| c == '=').is_some() => Token::NotEq,
            '\'' | '"' => {
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some((_, q)) if q == c => break,
                        Some((_, ch)) => literal.push(ch),
                        None => return Err((start, "unterminated string literal".to_string())),
                    }
                }
                Token::Literal(literal)
            }
            c if c.is_ascii_digit() => {
                let mut digits = c.to_string();
                while let Some((_, d)) = chars.next_if(|&(_, d)| d.is_ascii_digit()) {
                    digits.push(d);
                }
                let n = digits
                    .parse()
                    .map_err(|_| (start, format!("number {digits} is too large")))?;
                Token::Number(n)
            }
            c if is_name_start(c) => {
                let mut name = c.to_string();
                while let Some((_, ch)) = chars.next_if(|&(_, ch)| is_name_char(ch)) {
                    name.push(ch);
                }
                Token::Name(name)
            }
            other => return Err((start, format!("unexpected character {other:?}"))),
        };
        tokens.push((start, token));
    }

    Ok(tokens)
}

struct Parser<'q> {
    query: &'q str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(_, t)| t)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn peek_name(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == name)
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        let position = self
            .tokens
            .get(self.pos)
            .map_or(self.query.len(), |(p, _)| *p);
        QueryError {
            query: self.query.to_string(),
            position,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), QueryError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn parse_query(mut self) -> Result<Query, QueryError> {
        let mut paths = vec![self.parse_path()?];
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            paths.push(self.parse_path()?);
        }

        if self.peek().is_some() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(Query { paths })
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot | Token::DotDot | Token::Star | Token::Name(_))
        )
    }

    fn parse_path(&mut self) -> Result<LocationPath, QueryError> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if self.starts_step() {
                    self.parse_relative(&mut steps)?;
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                self.parse_relative(&mut steps)?;
                true
            }
            _ => {
                self.parse_relative(&mut steps)?;
                false
            }
        };

        Ok(LocationPath { absolute, steps })
    }

    fn parse_relative(&mut self, steps: &mut Vec<Step>) -> Result<(), QueryError> {
        loop {
            steps.push(self.parse_step()?);
            match self.peek() {
                Some(Token::Slash) => self.pos += 1,
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(Step::descendant_or_self());
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step, QueryError> {
        let abbreviated = |axis| Step {
            axis,
            test: NodeTest::Node,
            predicates: Vec::new(),
        };

        match self.peek() {
            Some(Token::Dot) => {
                self.pos += 1;
                return Ok(abbreviated(Axis::SelfNode));
            }
            Some(Token::DotDot) => {
                self.pos += 1;
                return Ok(abbreviated(Axis::Parent));
            }
            _ => {}
        }

        let axis = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Name(name)), Some(Token::ColonColon)) => {
                let axis = Axis::from_name(name)
                    .ok_or_else(|| self.error(format!("unsupported axis '{name}'")))?;
                self.pos += 2;
                axis
            }
            _ => Axis::Child,
        };

        let test = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Star), _) => {
                self.pos += 1;
                NodeTest::Any
            }
            (Some(Token::Name(name)), Some(Token::LParen)) if name == "node" => {
                self.pos += 2;
                self.expect(Token::RParen, "')'")?;
                NodeTest::Node
            }
            (Some(Token::Name(name)), _) => {
                let test = NodeTest::Type(name.clone());
                self.pos += 1;
                test
            }
            _ => return Err(self.error("expected a node test")),
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket, "']'")?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_or(&mut self) -> Result<Expr, QueryError> {
        let mut expr = self.parse_and()?;
        while self.peek_name("or") {
            self.pos += 1;
            expr = Expr::Or(Box::new(expr), Box::new(self.parse_and()?));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, QueryError> {
        let mut expr = self.parse_unary()?;
        while self.peek_name("and") {
            self.pos += 1;
            expr = Expr::And(Box::new(expr), Box::new(self.parse_unary()?));
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, QueryError> {
        if self.peek_name("not") && self.peek_at(1) == Some(&Token::LParen) {
            self.pos += 2;
            let inner = self.parse_or()?;
            self.expect(Token::RParen, "')'")?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, QueryError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::Number(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(Expr::Position(n))
            }
            Some(Token::Name(name)) if name == "last" && self.peek_at(1) == Some(&Token::LParen) => {
                self.pos += 2;
                self.expect(Token::RParen, "')'")?;
                Ok(Expr::Last)
            }
            Some(Token::At) => {
                self.pos += 1;
                self.parse_attribute()
            }
            Some(Token::Slash | Token::DoubleSlash) => Ok(Expr::Path(self.parse_path()?)),
            _ if self.starts_step() => Ok(Expr::Path(self.parse_path()?)),
            _ => Err(self.error("expected an expression")),
        }
    }

    fn parse_attribute(&mut self) -> Result<Expr, QueryError> {
        let Some(Token::Name(attr)) = self.peek().cloned() else {
            return Err(self.error("expected an attribute name"));
        };

        if let Some(role_name) = attr.strip_prefix("role").filter(|r| !r.is_empty()) {
            let role = role_name
                .parse::<Role>()
                .map_err(|e| self.error(e.to_string()))?;
            self.pos += 1;
            return Ok(Expr::HasRole(role));
        }

        if attr != "internalType" {
            return Err(self.error(format!("unsupported attribute '@{attr}'")));
        }
        self.pos += 1;

        let negate = match self.advance() {
            Some(Token::Eq) => false,
            Some(Token::NotEq) => true,
            _ => {
                self.pos -= 1;
                return Err(self.error("expected '=' or '!=' after @internalType"));
            }
        };

        match self.advance() {
            Some(Token::Literal(value)) => Ok(Expr::TypeEq { value, negate }),
            _ => {
                self.pos -= 1;
                Err(self.error("expected a string literal"))
            }
        }
    }
}

const DOCUMENT: usize = 0;

struct Entry<'a> {
    /// `None` only for the document that holds the root node
    node: Option<&'a Node>,
    parent: Option<usize>,
    children: Vec<usize>,
    /// One past the last index of this entry's subtree
    end: usize,
}

/// Pre-order flattening of a tree, so that index order is document order.
struct Arena<'a> {
    entries: Vec<Entry<'a>>,
}

impl<'a> Arena<'a> {
    fn new(root: &'a Node) -> Self {
        let mut arena = Self {
            entries: vec![Entry {
                node: None,
                parent: None,
                children: Vec::new(),
                end: 0,
            }],
        };
        arena.push_tree(root);
        arena
    }

    fn push_tree(&mut self, root: &'a Node) {
        let mut stack = vec![(root, DOCUMENT)];
        while let Some((node, parent)) = stack.pop() {
            let idx = self.entries.len();
            self.entries.push(Entry {
                node: Some(node),
                parent: Some(parent),
                children: Vec::with_capacity(node.children.len()),
                end: 0,
            });
            self.entries[parent].children.push(idx);
            stack.extend(node.children.iter().rev().map(|child| (child, idx)));
        }

        // Children come after their parent, so walking backwards sees every
        // subtree's end before the parent's.
        for idx in (0..self.entries.len()).rev() {
            let end = self.entries[idx]
                .children
                .last()
                .map_or(idx + 1, |&last| self.entries[last].end);
            self.entries[idx].end = end;
        }
    }

    fn ancestors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.entries[idx].parent, |&p| self.entries[p].parent)
    }

    /// Nodes along `axis` from `idx`, closest first.
    fn axis(&self, idx: usize, axis: Axis) -> Vec<usize> {
        let entry = &self.entries[idx];
        match axis {
            Axis::Child => entry.children.clone(),
            Axis::Descendant => (idx + 1..entry.end).collect(),
            Axis::DescendantOrSelf => (idx..entry.end).collect(),
            Axis::Parent => entry.parent.into_iter().collect(),
            Axis::Ancestor => self.ancestors(idx).collect(),
            Axis::AncestorOrSelf => std::iter::once(idx).chain(self.ancestors(idx)).collect(),
            Axis::SelfNode => vec![idx],
        }
    }

    fn matches_test(&self, idx: usize, test: &NodeTest) -> bool {
        match (test, self.entries[idx].node) {
            (NodeTest::Node, _) => true,
            (NodeTest::Any, node) => node.is_some(),
            (NodeTest::Type(name), Some(node)) => node.internal_type == *name,
            (NodeTest::Type(_), None) => false,
        }
    }

    fn eval_path(&self, path: &LocationPath, context: usize) -> Vec<usize> {
        let start = if path.absolute { DOCUMENT } else { context };
        path.steps
            .iter()
            .fold(vec![start], |nodes, step| self.eval_step(&nodes, step))
    }

    fn eval_step(&self, context: &[usize], step: &Step) -> Vec<usize> {
        let mut out = Vec::new();
        for &ctx in context {
            let mut candidates: Vec<usize> = self
                .axis(ctx, step.axis)
                .into_iter()
                .filter(|&idx| self.matches_test(idx, &step.test))
                .collect();

            for predicate in &step.predicates {
                let size = candidates.len();
                candidates = candidates
                    .into_iter()
                    .enumerate()
                    .filter(|&(i, idx)| self.eval_predicate(predicate, idx, i + 1, size))
                    .map(|(_, idx)| idx)
                    .collect();
            }
            out.extend(candidates);
        }

        out.sort_unstable();
        out.dedup();
        out
    }

    fn eval_predicate(&self, expr: &Expr, idx: usize, position: usize, size: usize) -> bool {
        match expr {
            Expr::Or(a, b) => {
                self.eval_predicate(a, idx, position, size)
                    || self.eval_predicate(b, idx, position, size)
            }
            Expr::And(a, b) => {
                self.eval_predicate(a, idx, position, size)
                    && self.eval_predicate(b, idx, position, size)
            }
            Expr::Not(inner) => !self.eval_predicate(inner, idx, position, size),
            Expr::HasRole(role) => self.entries[idx].node.is_some_and(|n| n.has_role(*role)),
            Expr::TypeEq { value, negate } => self.entries[idx]
                .node
                .is_some_and(|n| (n.internal_type == *value) != *negate),
            Expr::Position(n) => position == *n,
            Expr::Last => position == size,
            Expr::Path(path) => !self.eval_path(path, idx).is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_tree() -> Node {
        Node::new("Root", vec![Role::File]).with_children(vec![
            Node::new("Child1", vec![Role::Argument, Role::Import]),
            Node::new("Child2", vec![Role::Alias]),
        ])
    }

    fn deeper_tree() -> Node {
        Node::new("Module", vec![Role::File, Role::Module]).with_children(vec![
            Node::new("Import", vec![Role::Import, Role::Declaration]).with_children(vec![
                Node::new("alias", vec![Role::Import, Role::Pathname, Role::Identifier]),
            ]),
            Node::new("Assign", vec![Role::Assignment, Role::Statement]).with_children(vec![
                Node::new("Name", vec![Role::Identifier, Role::Left]),
                Node::new("Call", vec![Role::Call, Role::Right]).with_children(vec![
                    Node::new("Name", vec![Role::Identifier, Role::Callee]),
                    Node::new("Num", vec![Role::Literal, Role::Number, Role::Argument]),
                ]),
            ]),
        ])
    }

    fn select_types(query: &str, tree: &Node) -> Vec<String> {
        Query::parse(query)
            .unwrap()
            .select(tree)
            .into_iter()
            .map(|n| n.internal_type.clone())
            .collect()
    }

    #[test]
    fn test_role_predicate() {
        assert_eq!(select_types("//*[@roleAlias]", &sample_tree()), vec!["Child2"]);
    }

    #[test]
    fn test_descendant_matches_root() {
        assert_eq!(
            select_types("//*", &sample_tree()),
            vec!["Root", "Child1", "Child2"]
        );
    }

    #[test]
    fn test_absolute_and_relative_paths() {
        let tree = sample_tree();
        assert_eq!(select_types("/Root/Child2", &tree), vec!["Child2"]);
        assert_eq!(select_types("Root/*", &tree), vec!["Child1", "Child2"]);
        assert_eq!(select_types("/Child2", &tree), Vec::<String>::new());
        assert_eq!(select_types("/", &tree), Vec::<String>::new());
    }

    #[test]
    fn test_boolean_operators() {
        let tree = sample_tree();
        assert_eq!(
            select_types("//*[@roleImport and @roleArgument]", &tree),
            vec!["Child1"]
        );
        assert_eq!(
            select_types("//*[@roleAlias or @roleImport]", &tree),
            vec!["Child1", "Child2"]
        );
        assert_eq!(
            select_types("//*[not(@roleFile)]", &tree),
            vec!["Child1", "Child2"]
        );
        assert_eq!(
            select_types("//*[(@roleAlias or @roleFile) and not(@roleAlias)]", &tree),
            vec!["Root"]
        );
    }

    #[test]
    fn test_internal_type_attribute() {
        let tree = sample_tree();
        assert_eq!(
            select_types("//*[@internalType='Child1']", &tree),
            vec!["Child1"]
        );
        assert_eq!(
            select_types("//*[@internalType != \"Child1\"]", &tree),
            vec!["Root", "Child2"]
        );
    }

    #[test]
    fn test_ancestor_and_parent_axes() {
        let tree = deeper_tree();
        assert_eq!(
            select_types("//Num/ancestor::*", &tree),
            vec!["Module", "Assign", "Call"]
        );
        assert_eq!(
            select_types("//Num/ancestor-or-self::*[@roleRight or @roleNumber]", &tree),
            vec!["Call", "Num"]
        );
        assert_eq!(select_types("//*[@roleCallee]/..", &tree), vec!["Call"]);
        assert_eq!(select_types("//Name/parent::Assign", &tree), vec!["Assign"]);
    }

    #[test]
    fn test_nested_path_predicates() {
        let tree = deeper_tree();
        assert_eq!(select_types("//*[Call]", &tree), vec!["Assign"]);
        assert_eq!(
            select_types("//*[.//*[@roleCallee]]", &tree),
            vec!["Module", "Assign", "Call"]
        );
        assert_eq!(
            select_types("//Name[ancestor::Call]", &tree),
            vec!["Name"]
        );
        assert_eq!(
            select_types("//*[@roleIdentifier][not(ancestor::Import)]", &tree),
            vec!["Name", "Name"]
        );
    }

    #[test]
    fn test_descendant_axis_between_steps() {
        let tree = deeper_tree();
        assert_eq!(
            select_types("/Module//Name", &tree),
            vec!["Name", "Name"]
        );
        assert_eq!(
            select_types("/Module/descendant::*[@roleImport]", &tree),
            vec!["Import", "alias"]
        );
        assert_eq!(
            select_types("//Call/self::node()", &tree),
            vec!["Call"]
        );
    }

    #[test]
    fn test_positional_predicates() {
        let tree = deeper_tree();
        assert_eq!(select_types("/Module/*[1]", &tree), vec!["Import"]);
        assert_eq!(select_types("/Module/*[last()]", &tree), vec!["Assign"]);
        assert_eq!(select_types("//Call/*[2]", &tree), vec!["Num"]);
        assert_eq!(select_types("/Module/*[3]", &tree), Vec::<String>::new());
    }

    #[test]
    fn test_union_is_ordered_and_deduplicated() {
        let tree = sample_tree();
        assert_eq!(
            select_types("//Child2 | //Child1", &tree),
            vec!["Child1", "Child2"]
        );
        assert_eq!(
            select_types("//* | //Child1", &tree),
            vec!["Root", "Child1", "Child2"]
        );
    }

    #[test]
    fn test_filter_without_query_is_identity() {
        let tree = sample_tree();
        assert_eq!(filter(Some(tree.clone()), None).unwrap(), Some(tree.clone()));
        assert_eq!(filter(Some(tree.clone()), Some("")).unwrap(), Some(tree));
    }

    #[test]
    fn test_filter_blank_query_is_error() {
        let err = filter(Some(sample_tree()), Some("  ")).unwrap_err();
        assert_eq!(err.position, 2);
        assert_eq!(err.message, "expected a node test");
    }

    #[test]
    fn test_filter_wraps_matches() {
        let result = filter(Some(sample_tree()), Some("//*[@roleAlias]"))
            .unwrap()
            .unwrap();

        assert_eq!(
            result,
            Node::new(SEARCH_RESULTS_TYPE, vec![])
                .with_children(vec![Node::new("Child2", vec![Role::Alias])])
        );
    }

    #[test]
    fn test_filter_keeps_matched_subtrees() {
        let tree = sample_tree();
        let result = filter(Some(tree.clone()), Some("//*")).unwrap().unwrap();

        assert_eq!(result.children.len(), 3);
        assert_eq!(result.children[0], tree);
        assert_eq!(result.children[1], tree.children[0]);
    }

    #[test]
    fn test_filter_no_matches_gives_empty_wrapper() {
        let result = filter(Some(sample_tree()), Some("//Missing"))
            .unwrap()
            .unwrap();
        assert_eq!(result.internal_type, SEARCH_RESULTS_TYPE);
        assert!(result.roles.is_empty());
        assert!(result.children.is_empty());
    }

    #[test]
    fn test_filter_absent_tree_stays_absent() {
        assert_eq!(filter(None, Some("//*[@roleAlias]")).unwrap(), None);
        assert_eq!(filter(None, Some("//*[")).unwrap(), None);
    }

    #[test]
    fn test_select_on_deep_tree() {
        let mut tree = Node::new("Leaf", vec![Role::Identifier]);
        for _ in 0..2_000 {
            tree = Node::new("Block", vec![]).with_children(vec![tree]);
        }

        let query = Query::parse("//Leaf/ancestor::Block").unwrap();
        let matched = query.select(&tree);
        assert_eq!(matched.len(), 2_000);
        assert!(std::ptr::eq(matched[0], &tree));

        let leaves = Query::parse("//*[@roleIdentifier]").unwrap().select(&tree);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].internal_type, "Leaf");
    }

    #[test]
    fn test_unknown_role_is_error() {
        let err = Query::parse("//*[@roleNope]").unwrap_err();
        assert_eq!(err.query, "//*[@roleNope]");
        assert_eq!(err.position, 5);
        assert!(err.message.contains("Nope"));
    }

    #[test]
    fn test_syntax_errors_report_position() {
        let err = Query::parse("//*[").unwrap_err();
        assert_eq!(err.position, 4);

        let err = Query::parse("//*[@roleAlias").unwrap_err();
        assert_eq!(err.position, 14);
        assert_eq!(err.message, "expected ']'");

        let err = Query::parse("//sibling::*").unwrap_err();
        assert_eq!(err.position, 2);

        let err = Query::parse("//*[@internalType='x]").unwrap_err();
        assert_eq!(err.position, 18);
        assert_eq!(err.message, "unterminated string literal");

        let err = Query::parse("//* foo").unwrap_err();
        assert_eq!(err.message, "unexpected trailing input");

        let err = Query::parse("//*[@token]").unwrap_err();
        assert!(err.message.contains("@token"));

        let err = Query::parse("#").unwrap_err();
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_error_display_includes_query() {
        let err = Query::parse("//*[").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid query \"//*[\" at position 4: expected an expression"
        );
    }
}
