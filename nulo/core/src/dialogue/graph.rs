//! Dialogue graph
//!
//! An immutable, validated table of nodes. Validation happens once at
//! construction so a walk can never hit a dangling reference.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the entry sentinel in content files
pub const ENTRY_NAME: &str = "intro";

/// Node identifier: the entry sentinel or a numbered node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawNodeId", into = "RawNodeId")]
pub enum NodeId {
    /// Where every walk begins
    Entry,
    /// Numbered node
    Index(u32),
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "{ENTRY_NAME}"),
            Self::Index(n) => write!(f, "{n}"),
        }
    }
}

/// On-disk form: `"intro"` or an integer
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawNodeId {
    Index(u32),
    Name(String),
}

impl TryFrom<RawNodeId> for NodeId {
    type Error = GraphError;

    fn try_from(raw: RawNodeId) -> Result<Self, Self::Error> {
        match raw {
            RawNodeId::Index(n) => Ok(Self::Index(n)),
            RawNodeId::Name(name) if name == ENTRY_NAME => Ok(Self::Entry),
            RawNodeId::Name(name) => Err(GraphError::UnknownName(name)),
        }
    }
}

impl From<NodeId> for RawNodeId {
    fn from(id: NodeId) -> Self {
        match id {
            NodeId::Entry => Self::Name(ENTRY_NAME.to_string()),
            NodeId::Index(n) => Self::Index(n),
        }
    }
}

/// Actions a terminal choice hands to the session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTag {
    /// Start the destruction sequence
    Destroy,
}

/// Where a choice leads
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChoiceTarget {
    /// Enter another node
    Next(NodeId),
    /// Leave the dialogue with an action
    Terminal(ActionTag),
}

/// One selectable answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    /// Button label
    pub label: String,
    /// Destination
    pub target: ChoiceTarget,
    /// Presentation tag
    pub style: Option<String>,
}

impl Choice {
    /// Choice leading to `next`
    #[must_use]
    pub fn next(label: &str, next: NodeId) -> Self {
        Self {
            label: label.to_string(),
            target: ChoiceTarget::Next(next),
            style: None,
        }
    }

    /// Choice ending the dialogue with `action`
    #[must_use]
    pub fn terminal(label: &str, action: ActionTag) -> Self {
        Self {
            label: label.to_string(),
            target: ChoiceTarget::Terminal(action),
            style: None,
        }
    }

    /// Attach a presentation tag
    #[must_use]
    pub fn styled(mut self, style: &str) -> Self {
        self.style = Some(style.to_string());
        self
    }
}

/// One line of dialogue with its answers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogueNode {
    /// Identifier
    pub id: NodeId,
    /// Text revealed character by character
    pub text: String,
    /// Run the glitch decoration after the reveal
    pub decorated: bool,
    /// Switch to critical-error styling on entry
    pub critical: bool,
    /// Answers in display order; empty means the node is terminal
    pub choices: Vec<Choice>,
}

impl DialogueNode {
    /// Plain node
    #[must_use]
    pub fn new(id: NodeId, text: &str, choices: Vec<Choice>) -> Self {
        Self {
            id,
            text: text.to_string(),
            decorated: false,
            critical: false,
            choices,
        }
    }

    /// Mark as decorated
    #[must_use]
    pub fn decorated(mut self) -> Self {
        self.decorated = true;
        self
    }

    /// Mark as critical
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// Problems found while building a graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// No nodes at all
    #[error("dialogue graph has no nodes")]
    Empty,

    /// Two nodes share an id
    #[error("duplicate node id {0}")]
    DuplicateId(NodeId),

    /// Entry sentinel missing
    #[error("dialogue graph has no '{ENTRY_NAME}' node")]
    MissingEntry,

    /// A choice points at a node that does not exist
    #[error("choice {choice} of node {from} points at missing node {target}")]
    DanglingNext {
        /// Node holding the choice
        from: NodeId,
        /// Choice index
        choice: usize,
        /// Missing target
        target: NodeId,
    },

    /// A choice in a content file has both or neither of `next`/`action`
    #[error("choice {choice} of node {node} must have exactly one of 'next' or 'action'")]
    AmbiguousChoice {
        /// Node holding the choice
        node: NodeId,
        /// Choice index
        choice: usize,
    },

    /// String id other than the entry sentinel
    #[error("unknown node name '{0}' (only '{ENTRY_NAME}' or integers are allowed)")]
    UnknownName(String),

    /// Content file unreadable
    #[error("failed to read dialogue content at {path}: {source}")]
    Read {
        /// Attempted path
        path: PathBuf,
        /// IO error
        source: std::io::Error,
    },

    /// Content file is not valid TOML
    #[error("failed to parse dialogue content: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Validated dialogue table
#[derive(Clone, Debug)]
pub struct DialogueGraph {
    nodes: HashMap<NodeId, DialogueNode>,
}

impl DialogueGraph {
    /// Build and validate a graph
    ///
    /// # Errors
    ///
    /// Rejects empty tables, duplicate ids, a missing entry node and any
    /// `next` that does not resolve. Unreachable nodes are only warned about.
    pub fn new(nodes: Vec<DialogueNode>) -> Result<Self, GraphError> {
        if nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut table = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let id = node.id;
            if table.insert(id, node).is_some() {
                return Err(GraphError::DuplicateId(id));
            }
        }
        if !table.contains_key(&NodeId::Entry) {
            return Err(GraphError::MissingEntry);
        }

        for node in table.values() {
            for (index, choice) in node.choices.iter().enumerate() {
                if let ChoiceTarget::Next(target) = choice.target {
                    if !table.contains_key(&target) {
                        return Err(GraphError::DanglingNext {
                            from: node.id,
                            choice: index,
                            target,
                        });
                    }
                }
            }
        }

        let graph = Self { nodes: table };
        graph.warn_unreachable();
        Ok(graph)
    }

    fn warn_unreachable(&self) {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([NodeId::Entry]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                queue.extend(node.choices.iter().filter_map(|c| match c.target {
                    ChoiceTarget::Next(next) => Some(next),
                    ChoiceTarget::Terminal(_) => None,
                }));
            }
        }
        for id in self.nodes.keys().filter(|id| !seen.contains(id)) {
            tracing::warn!(node = %id, "Dialogue node is unreachable from the entry");
        }
    }

    /// Parse and validate a TOML content table
    ///
    /// # Errors
    ///
    /// Parse errors, malformed choices, or any validation error of [`Self::new`].
    pub fn from_toml_str(content: &str) -> Result<Self, GraphError> {
        let file: ContentFile = toml::from_str(content)?;
        let nodes = file
            .node
            .into_iter()
            .map(RawNode::into_node)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(nodes)
    }

    /// Read, parse and validate a TOML content file
    ///
    /// # Errors
    ///
    /// IO errors plus everything [`Self::from_toml_str`] rejects.
    pub fn from_toml_file(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path).map_err(|source| GraphError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let graph = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), nodes = graph.len(), "Loaded dialogue content");
        Ok(graph)
    }

    /// The built-in dialogue
    ///
    /// # Errors
    ///
    /// Only if the built-in table itself were inconsistent.
    pub fn builtin() -> Result<Self, GraphError> {
        Self::new(super::content::builtin_nodes())
    }

    /// Load from `path` if given, otherwise the built-in dialogue
    ///
    /// # Errors
    ///
    /// See [`Self::from_toml_file`].
    pub fn load(path: Option<&Path>) -> Result<Self, GraphError> {
        match path {
            Some(path) => Self::from_toml_file(path),
            None => Self::builtin(),
        }
    }

    /// Find a node
    ///
    /// # Errors
    ///
    /// [`super::DialogueError::NotFound`] if `id` is not in the graph.
    pub fn lookup(&self, id: NodeId) -> Result<&DialogueNode, super::DialogueError> {
        self.nodes
            .get(&id)
            .ok_or(super::DialogueError::NotFound(id))
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a validated graph
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// =============================================================================
// Content file format
// =============================================================================

#[derive(Debug, Deserialize)]
struct ContentFile {
    #[serde(default)]
    node: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: NodeId,
    text: String,
    #[serde(default)]
    decorated: bool,
    #[serde(default)]
    critical: bool,
    #[serde(default)]
    choices: Vec<RawChoice>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    label: String,
    next: Option<NodeId>,
    action: Option<ActionTag>,
    style: Option<String>,
}

impl RawNode {
    fn into_node(self) -> Result<DialogueNode, GraphError> {
        let id = self.id;
        let choices = self
            .choices
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let target = match (raw.next, raw.action) {
                    (Some(next), None) => ChoiceTarget::Next(next),
                    (None, Some(action)) => ChoiceTarget::Terminal(action),
                    _ => {
                        return Err(GraphError::AmbiguousChoice {
                            node: id,
                            choice: index,
                        })
                    }
                };
                Ok(Choice {
                    label: raw.label,
                    target,
                    style: raw.style,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DialogueNode {
            id,
            text: self.text,
            decorated: self.decorated,
            critical: self.critical,
            choices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::DialogueError;

    fn two_nodes() -> Vec<DialogueNode> {
        vec![
            DialogueNode::new(NodeId::Entry, "hello", vec![Choice::next("go", NodeId::Index(0))]),
            DialogueNode::new(
                NodeId::Index(0),
                "bye",
                vec![Choice::terminal("end", ActionTag::Destroy)],
            ),
        ]
    }

    #[test]
    fn test_valid_graph_lookup() {
        let graph = DialogueGraph::new(two_nodes()).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.lookup(NodeId::Index(0)).unwrap().text, "bye");
        assert!(matches!(
            graph.lookup(NodeId::Index(9)),
            Err(DialogueError::NotFound(NodeId::Index(9)))
        ));
    }

    #[test]
    fn test_dangling_next_rejected() {
        let mut nodes = two_nodes();
        nodes[1].choices.push(Choice::next("lost", NodeId::Index(99)));

        let err = DialogueGraph::new(nodes).unwrap_err();
        assert!(matches!(
            err,
            GraphError::DanglingNext {
                from: NodeId::Index(0),
                choice: 1,
                target: NodeId::Index(99)
            }
        ));
    }

    #[test]
    fn test_duplicate_and_missing_entry_rejected() {
        let mut nodes = two_nodes();
        nodes.push(DialogueNode::new(NodeId::Index(0), "again", vec![]));
        assert!(matches!(
            DialogueGraph::new(nodes),
            Err(GraphError::DuplicateId(NodeId::Index(0)))
        ));

        let nodes = vec![DialogueNode::new(NodeId::Index(0), "alone", vec![])];
        assert!(matches!(
            DialogueGraph::new(nodes),
            Err(GraphError::MissingEntry)
        ));
        assert!(matches!(DialogueGraph::new(vec![]), Err(GraphError::Empty)));
    }

    #[test]
    fn test_unreachable_nodes_are_allowed() {
        let mut nodes = two_nodes();
        nodes.push(DialogueNode::new(NodeId::Index(7), "orphan", vec![]));
        assert!(DialogueGraph::new(nodes).is_ok());
    }

    #[test]
    fn test_toml_content() {
        let content = r#"
[[node]]
id = "intro"
text = "Quem chama?"
[[node.choices]]
label = "Eu."
next = 1

[[node]]
id = 1
text = "Fim."
critical = true
[[node.choices]]
label = "Destruir"
action = "destroy"
style = "destroy"
"#;
        let graph = DialogueGraph::from_toml_str(content).unwrap();
        let entry = graph.lookup(NodeId::Entry).unwrap();
        assert_eq!(entry.choices[0].target, ChoiceTarget::Next(NodeId::Index(1)));

        let last = graph.lookup(NodeId::Index(1)).unwrap();
        assert!(last.critical);
        assert_eq!(
            last.choices[0].target,
            ChoiceTarget::Terminal(ActionTag::Destroy)
        );
        assert_eq!(last.choices[0].style.as_deref(), Some("destroy"));
    }

    #[test]
    fn test_toml_rejects_ambiguous_choice_and_unknown_name() {
        let both = r#"
[[node]]
id = "intro"
text = "x"
[[node.choices]]
label = "y"
next = 1
action = "destroy"
"#;
        assert!(matches!(
            DialogueGraph::from_toml_str(both),
            Err(GraphError::AmbiguousChoice { .. })
        ));

        let named = r#"
[[node]]
id = "start"
text = "x"
"#;
        assert!(DialogueGraph::from_toml_str(named).is_err());
    }

    #[test]
    fn test_toml_dangling_next_rejected() {
        let content = r#"
[[node]]
id = "intro"
text = "x"
[[node.choices]]
label = "y"
next = 4
"#;
        assert!(matches!(
            DialogueGraph::from_toml_str(content),
            Err(GraphError::DanglingNext { .. })
        ));
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::Entry.to_string(), "intro");
        assert_eq!(NodeId::Index(3).to_string(), "3");
    }
}
