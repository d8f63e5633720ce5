//! Markdown document tree.
//!
//! [`parse`] builds a [`Node`] tree from `pulldown-cmark` events, and [`walk`]
//! visits it depth first, calling the visitor once on entry and once on exit
//! of every node.

use log::trace;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, LinkType, Parser, Tag};

/// The kinds of node the renderer understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,

    // blocks
    Heading { level: u32 },
    Blockquote,
    CodeBlock { lines: Vec<String> },
    FencedCodeBlock { info: String, lines: Vec<String> },
    List { ordered: bool, start: u64 },
    ListItem,
    Paragraph,
    /// Inline content of a tight list item.
    TextBlock,
    ThematicBreak,

    // inlines
    AutoLink { url: String },
    CodeSpan,
    Emphasis { level: u32 },
    Image { destination: String },
    Link { destination: String },
    Text {
        value: String,
        soft_break: bool,
        hard_break: bool,
    },
    /// Literal text, such as the contents of a code span.
    String { value: String },
}

impl NodeKind {
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::AutoLink { .. }
                | NodeKind::CodeSpan
                | NodeKind::Emphasis { .. }
                | NodeKind::Image { .. }
                | NodeKind::Link { .. }
                | NodeKind::Text { .. }
                | NodeKind::String { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Node { kind, children }
    }

    pub fn leaf(kind: NodeKind) -> Self {
        Node::new(kind, Vec::new())
    }

    /// A plain text node without line breaks.
    pub fn text(value: impl Into<String>) -> Self {
        Node::leaf(NodeKind::Text {
            value: value.into(),
            soft_break: false,
            hard_break: false,
        })
    }
}

/// What the walk does after a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    Continue,
    /// Don't visit the children. Only meaningful on entry; the node is still
    /// visited on exit.
    SkipChildren,
    /// End the walk.
    Stop,
}

/// Walk `node` depth first. `visit` receives each node and whether it is
/// being entered.
pub fn walk<F, E>(node: &Node, visit: &mut F) -> Result<WalkStatus, E>
where
    F: FnMut(&Node, bool) -> Result<WalkStatus, E>,
{
    let status = visit(node, true)?;
    if status == WalkStatus::Stop {
        return Ok(WalkStatus::Stop);
    }
    if status != WalkStatus::SkipChildren {
        for child in &node.children {
            if walk(child, visit)? == WalkStatus::Stop {
                return Ok(WalkStatus::Stop);
            }
        }
    }
    visit(node, false)
}

/// Parse CommonMark into a document tree.
pub fn parse(markdown: &str) -> Node {
    let mut builder = TreeBuilder {
        frames: vec![Frame::new(Some(NodeKind::Document))],
    };
    for event in Parser::new(markdown) {
        builder.event(event);
    }
    builder.finish()
}

struct Frame {
    /// `None` for containers that are dropped, keeping their children.
    kind: Option<NodeKind>,
    children: Vec<Node>,
    /// Accumulated code block contents.
    code: String,
}

impl Frame {
    fn new(kind: Option<NodeKind>) -> Self {
        Frame {
            kind,
            children: Vec::new(),
            code: String::new(),
        }
    }

    fn is_code(&self) -> bool {
        matches!(
            self.kind,
            Some(NodeKind::CodeBlock { .. }) | Some(NodeKind::FencedCodeBlock { .. })
        )
    }
}

struct TreeBuilder {
    frames: Vec<Frame>,
}

impl TreeBuilder {
    fn top(&mut self) -> &mut Frame {
        // The document frame is never popped before `finish`.
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn push(&mut self, node: Node) {
        self.top().children.push(node);
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.frames.push(Frame::new(node_kind(tag))),
            Event::End(_) => self.close(),
            Event::Text(text) => {
                if self.top().is_code() {
                    self.top().code.push_str(&text);
                } else {
                    self.push(Node::text(text.to_string()));
                }
            }
            Event::Code(code) => self.push(Node::new(
                NodeKind::CodeSpan,
                vec![Node::leaf(NodeKind::String {
                    value: code.to_string(),
                })],
            )),
            Event::SoftBreak => self.line_break(false),
            Event::HardBreak => self.line_break(true),
            Event::Rule => self.push(Node::leaf(NodeKind::ThematicBreak)),
            other => trace!("ignoring {:?}", other),
        }
    }

    /// Mark the preceding text node as ending in a line break.
    fn line_break(&mut self, hard: bool) {
        let top = self.top();
        if let Some(Node {
            kind:
                NodeKind::Text {
                    soft_break,
                    hard_break,
                    ..
                },
            ..
        }) = top.children.last_mut()
        {
            if !*soft_break && !*hard_break {
                *soft_break = !hard;
                *hard_break = hard;
                return;
            }
        }
        top.children.push(Node::leaf(NodeKind::Text {
            value: String::new(),
            soft_break: !hard,
            hard_break: hard,
        }));
    }

    fn close(&mut self) {
        if self.frames.len() < 2 {
            return;
        }
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let Frame {
            kind,
            children,
            code,
        } = frame;

        match kind {
            Some(mut kind) => {
                if let NodeKind::CodeBlock { lines } | NodeKind::FencedCodeBlock { lines, .. } =
                    &mut kind
                {
                    *lines = code.split_inclusive('\n').map(str::to_string).collect();
                }
                let children = match kind {
                    NodeKind::ListItem => wrap_inlines(children),
                    // The URL is the whole of an autolink; it has no label.
                    NodeKind::AutoLink { .. } => Vec::new(),
                    _ => children,
                };
                self.push(Node::new(kind, children));
            }
            None => self.top().children.extend(children),
        }
    }

    fn finish(mut self) -> Node {
        while self.frames.len() > 1 {
            self.close();
        }
        let children = self
            .frames
            .pop()
            .map(|frame| frame.children)
            .unwrap_or_default();
        Node::new(NodeKind::Document, children)
    }
}

fn node_kind(tag: Tag<'_>) -> Option<NodeKind> {
    let kind = match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading(level, _, _) => NodeKind::Heading {
            level: heading_level(level),
        },
        Tag::BlockQuote => NodeKind::Blockquote,
        Tag::CodeBlock(CodeBlockKind::Indented) => NodeKind::CodeBlock { lines: Vec::new() },
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => NodeKind::FencedCodeBlock {
            info: info.to_string(),
            lines: Vec::new(),
        },
        Tag::List(start) => NodeKind::List {
            ordered: start.is_some(),
            start: start.unwrap_or(1),
        },
        Tag::Item => NodeKind::ListItem,
        Tag::Emphasis => NodeKind::Emphasis { level: 1 },
        Tag::Strong => NodeKind::Emphasis { level: 2 },
        Tag::Link(LinkType::Autolink | LinkType::Email, url, _) => NodeKind::AutoLink {
            url: url.to_string(),
        },
        Tag::Link(_, destination, _) => NodeKind::Link {
            destination: destination.to_string(),
        },
        Tag::Image(_, destination, _) => NodeKind::Image {
            destination: destination.to_string(),
        },
        _ => return None,
    };
    Some(kind)
}

fn heading_level(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Group runs of inline children into text blocks.
fn wrap_inlines(children: Vec<Node>) -> Vec<Node> {
    let mut wrapped = Vec::with_capacity(children.len());
    let mut inlines = Vec::new();
    for child in children {
        if child.kind.is_inline() {
            inlines.push(child);
            continue;
        }
        if !inlines.is_empty() {
            wrapped.push(Node::new(NodeKind::TextBlock, std::mem::take(&mut inlines)));
        }
        wrapped.push(child);
    }
    if !inlines.is_empty() {
        wrapped.push(Node::new(NodeKind::TextBlock, inlines));
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(node: &Node) -> Vec<&NodeKind> {
        node.children.iter().map(|n| &n.kind).collect()
    }

    #[test]
    fn headings_and_paragraphs() {
        let doc = parse("# Title\n\nSome *soft*\nand **strong** text.\n");
        assert_eq!(
            kinds(&doc),
            vec![&NodeKind::Heading { level: 1 }, &NodeKind::Paragraph]
        );
        assert_eq!(doc.children[0].children, vec![Node::text("Title")]);

        let para = &doc.children[1];
        assert_eq!(para.children[1].kind, NodeKind::Emphasis { level: 1 });
        assert_eq!(
            para.children[2].kind,
            NodeKind::Text {
                value: String::new(),
                soft_break: true,
                hard_break: false
            }
        );
        assert_eq!(para.children[4].kind, NodeKind::Emphasis { level: 2 });
    }

    #[test]
    fn breaks_attach_to_preceding_text() {
        let doc = parse("one\ntwo  \nthree");
        let para = &doc.children[0];
        assert_eq!(
            para.children[0].kind,
            NodeKind::Text {
                value: "one".to_string(),
                soft_break: true,
                hard_break: false
            }
        );
        assert_eq!(
            para.children[1].kind,
            NodeKind::Text {
                value: "two".to_string(),
                soft_break: false,
                hard_break: true
            }
        );
    }

    #[test]
    fn tight_items_get_text_blocks() {
        let doc = parse("- a\n- b\n");
        let list = &doc.children[0];
        assert_eq!(
            list.kind,
            NodeKind::List {
                ordered: false,
                start: 1
            }
        );
        assert_eq!(list.children.len(), 2);
        assert_eq!(kinds(&list.children[0]), vec![&NodeKind::TextBlock]);

        let doc = parse("3. a\n\n4. b\n");
        let list = &doc.children[0];
        assert_eq!(
            list.kind,
            NodeKind::List {
                ordered: true,
                start: 3
            }
        );
        assert_eq!(kinds(&list.children[0]), vec![&NodeKind::Paragraph]);
    }

    #[test]
    fn code_blocks_keep_their_lines() {
        let doc = parse("```rust\nfn main() {\n\n}\n```\n\n    indented\n");
        assert_eq!(
            doc.children[0].kind,
            NodeKind::FencedCodeBlock {
                info: "rust".to_string(),
                lines: vec!["fn main() {\n".into(), "\n".into(), "}\n".into()],
            }
        );
        assert_eq!(
            doc.children[1].kind,
            NodeKind::CodeBlock {
                lines: vec!["indented\n".into()]
            }
        );
        assert!(doc.children[0].children.is_empty());
    }

    #[test]
    fn inline_nodes() {
        let doc = parse("`x` <https://a.example> [l](docs/l.md) ![alt](i.png)\n\n---\n");
        let para = &doc.children[0];
        assert_eq!(para.children[0].kind, NodeKind::CodeSpan);
        assert_eq!(
            para.children[0].children[0].kind,
            NodeKind::String {
                value: "x".to_string()
            }
        );
        assert_eq!(
            para.children[2].kind,
            NodeKind::AutoLink {
                url: "https://a.example".to_string()
            }
        );
        assert!(para.children[2].children.is_empty());
        assert_eq!(
            para.children[4].kind,
            NodeKind::Link {
                destination: "docs/l.md".to_string()
            }
        );
        assert_eq!(
            para.children[6].kind,
            NodeKind::Image {
                destination: "i.png".to_string()
            }
        );
        assert_eq!(doc.children[1].kind, NodeKind::ThematicBreak);
    }

    #[test]
    fn walk_visits_enter_and_exit() {
        let doc = Node::new(
            NodeKind::Document,
            vec![
                Node::new(NodeKind::Paragraph, vec![Node::text("a")]),
                Node::new(NodeKind::Blockquote, vec![Node::text("b")]),
                Node::new(NodeKind::Paragraph, vec![Node::text("c")]),
            ],
        );

        let mut visits = Vec::new();
        let status = walk(&doc, &mut |node: &Node, enter| {
            let name = match &node.kind {
                NodeKind::Text { value, .. } => value.clone(),
                NodeKind::Blockquote => "quote".to_string(),
                NodeKind::Paragraph => "para".to_string(),
                _ => "doc".to_string(),
            };
            visits.push(format!("{}{}", if enter { "+" } else { "-" }, name));
            Ok::<_, ()>(match node.kind {
                NodeKind::Blockquote => WalkStatus::SkipChildren,
                NodeKind::Text { ref value, .. } if value == "c" => WalkStatus::Stop,
                _ => WalkStatus::Continue,
            })
        })
        .unwrap();

        assert_eq!(status, WalkStatus::Stop);
        assert_eq!(
            visits,
            vec!["+doc", "+para", "+a", "-a", "-para", "+quote", "-quote", "+para", "+c"]
        );
    }
}
