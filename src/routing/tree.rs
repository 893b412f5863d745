//! Path tree used to match sync subscription paths.
//!
//! # Segments
//! - static: `users`
//! - parameter: `:id`, captures one segment
//! - wildcard: `*rest`, captures the remainder and must be last
//!
//! # Design Decisions
//! - A level holds either static children or exactly one parameter or
//!   wildcard child, so resolution never backtracks
//! - Trailing slashes are significant (`/a/` and `/a` are different routes)

use std::collections::HashMap;

/// Captured path parameters.
pub type Params = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("route {0} conflicts with existing route")]
    Conflict(String),

    #[error("parameter with different name ({existing:?}) already defined: for route: {route}")]
    ParameterName { existing: String, route: String },

    #[error("wildcard with different name ({existing:?}) already defined: for route: {route}")]
    Wildcard { existing: String, route: String },

    #[error("static route already defined for route: {0}")]
    StaticDefined(String),

    #[error("parameterized route already defined for route: {0}")]
    ParameterDefined(String),

    #[error("wildcard must be the last segment: for route: {0}")]
    WildcardNotLast(String),
}

#[derive(Debug, Clone)]
enum Children<T> {
    Static(HashMap<String, Node<T>>),
    Param(String, Box<Node<T>>),
    Wildcard(String, Box<Node<T>>),
}

#[derive(Debug, Clone)]
struct Node<T> {
    value: Option<T>,
    children: Children<T>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            value: None,
            children: Children::Static(HashMap::new()),
        }
    }

    fn has_no_children(&self) -> bool {
        matches!(&self.children, Children::Static(map) if map.is_empty())
    }
}

#[derive(Clone, Copy)]
enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
    Wildcard(&'a str),
}

impl<'a> Segment<'a> {
    fn parse(raw: &'a str) -> Self {
        if let Some(name) = raw.strip_prefix(':') {
            Segment::Param(name)
        } else if let Some(name) = raw.strip_prefix('*') {
            Segment::Wildcard(name)
        } else {
            Segment::Static(raw)
        }
    }
}

/// Prefix tree over `/`-separated path segments.
#[derive(Debug, Clone)]
pub struct PathTree<T> {
    root: Node<T>,
}

impl<T> Default for PathTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathTree<T> {
    pub fn new() -> Self {
        Self { root: Node::new() }
    }

    /// Add a route, rejecting anything that would make resolution ambiguous.
    pub fn add_route(&mut self, route: &str, value: T) -> Result<(), RouteError> {
        let segments = to_segments(route);
        let last = segments.len().saturating_sub(1);
        let mut node = &mut self.root;

        for (i, raw) in segments.iter().enumerate() {
            let segment = Segment::parse(raw);
            if matches!(segment, Segment::Wildcard(_)) && i != last {
                return Err(RouteError::WildcardNotLast(route.to_string()));
            }

            let fresh = node.has_no_children();
            if fresh {
                node.children = match segment {
                    Segment::Static(_) => Children::Static(HashMap::new()),
                    Segment::Param(name) => Children::Param(name.to_string(), Box::new(Node::new())),
                    Segment::Wildcard(name) => {
                        Children::Wildcard(name.to_string(), Box::new(Node::new()))
                    }
                };
            }

            node = match (&mut node.children, segment) {
                (Children::Wildcard(_, child), Segment::Wildcard(_)) if fresh => child.as_mut(),
                (Children::Static(map), Segment::Static(name)) => {
                    map.entry(name.to_string()).or_insert_with(Node::new)
                }
                (Children::Static(_), _) => {
                    return Err(RouteError::StaticDefined(route.to_string()));
                }
                (Children::Param(existing, child), Segment::Param(name)) => {
                    if existing != name {
                        return Err(RouteError::ParameterName {
                            existing: existing.clone(),
                            route: route.to_string(),
                        });
                    }
                    child.as_mut()
                }
                (Children::Param(..), Segment::Static(_)) => {
                    return Err(RouteError::ParameterDefined(route.to_string()));
                }
                (Children::Param(existing, _), Segment::Wildcard(_))
                | (Children::Wildcard(existing, _), _) => {
                    return Err(RouteError::Wildcard {
                        existing: existing.clone(),
                        route: route.to_string(),
                    });
                }
            };
        }

        if node.value.is_some() {
            return Err(RouteError::Conflict(route.to_string()));
        }
        node.value = Some(value);
        Ok(())
    }

    /// Find the value registered for a request path along with captured params.
    pub fn resolve(&self, path: &str) -> Option<(&T, Params)> {
        let segments = to_segments(path);
        let mut params = Params::new();
        let mut node = &self.root;

        for (i, segment) in segments.iter().enumerate() {
            node = match &node.children {
                Children::Static(map) => map.get(*segment)?,
                Children::Param(name, child) => {
                    params.insert(name.clone(), (*segment).to_string());
                    child
                }
                Children::Wildcard(name, child) => {
                    params.insert(name.clone(), segments[i..].join("/"));
                    return child.value.as_ref().map(|v| (v, params));
                }
            };
        }

        node.value.as_ref().map(|v| (v, params))
    }
}

fn to_segments(path: &str) -> Vec<&str> {
    if path == "/" || path.is_empty() {
        return Vec::new();
    }
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}
