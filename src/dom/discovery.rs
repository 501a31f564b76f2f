//! Flattening of a container tree into the nodes a caller works with.
//!
//! Visible, checked composites are recursed into; invisible or skipped ones (and iframes,
//! unless expanded) are kept as a single opaque node. Mapping-shaped results key nodes by
//! the name they were registered under; names from nested composites that collide with
//! an existing key are re-keyed as `<composite>_<name>`.

use crate::dom::kind::ElementKind;
use crate::dom::node::{Node, NodeRef};
use crate::errors::{PageModelError, Result};
use std::str::FromStr;

/// Key a container is stored under in its own mapping.
pub const SELF_KEY: &str = "widget";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverOptions {
    /// Only nodes whose kind is-a `kind` are returned.
    pub kind: ElementKind,
    pub override_visible: bool,
    pub override_do_not_check: bool,
    pub expand_iframes: bool,
    pub include_self: bool,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            kind: ElementKind::Element,
            override_visible: false,
            override_do_not_check: false,
            expand_iframes: false,
            include_self: false,
        }
    }
}

impl DiscoverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything: both overrides, iframes expanded, the container included.
    pub fn all() -> Self {
        Self {
            kind: ElementKind::Element,
            override_visible: true,
            override_do_not_check: true,
            expand_iframes: true,
            include_self: true,
        }
    }

    #[must_use]
    pub fn of_kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_override_visible(mut self, value: bool) -> Self {
        self.override_visible = value;
        self
    }

    #[must_use]
    pub fn with_override_do_not_check(mut self, value: bool) -> Self {
        self.override_do_not_check = value;
        self
    }

    #[must_use]
    pub fn with_expand_iframes(mut self, value: bool) -> Self {
        self.expand_iframes = value;
        self
    }

    #[must_use]
    pub fn with_self(mut self, value: bool) -> Self {
        self.include_self = value;
        self
    }

    fn self_matches(&self, kind: ElementKind) -> bool {
        kind.is_a(self.kind) && (kind != ElementKind::IFrame || self.expand_iframes)
    }

    fn recurses_into(&self, node: &Node) -> bool {
        let element = node.element();
        (element.expects_visible() || self.override_visible)
            && (!element.is_do_not_check() || self.override_do_not_check)
            && (node.kind() != ElementKind::IFrame || self.expand_iframes)
    }

    fn leaf_matches(&self, kind: ElementKind) -> bool {
        !self.kind.is_container() && kind.is_a(self.kind)
    }
}

/// Result shape of a discovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Sequence,
    Mapping,
}

impl FromStr for Shape {
    type Err = PageModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "list" | "sequence" => Ok(Shape::Sequence),
            "dict" | "mapping" | "map" => Ok(Shape::Mapping),
            other => Err(PageModelError::InvalidConfiguration(format!(
                "result shape can either be 'list' or 'dict', but was '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Discovered<'a> {
    Sequence(Vec<NodeRef<'a>>),
    Mapping(NodeMap<'a>),
}

impl<'a> Discovered<'a> {
    pub fn len(&self) -> usize {
        match self {
            Discovered::Sequence(nodes) => nodes.len(),
            Discovered::Mapping(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nodes in discovery order, whatever the shape.
    pub fn into_nodes(self) -> Vec<NodeRef<'a>> {
        match self {
            Discovered::Sequence(nodes) => nodes,
            Discovered::Mapping(map) => map.values().collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<'a> {
    key: String,
    node: NodeRef<'a>,
    /// Child indices from the discovery root; empty for the root itself.
    path: Vec<usize>,
}

/// Insertion-ordered name to node mapping.
#[derive(Debug, Clone, Default)]
pub struct NodeMap<'a> {
    entries: Vec<Entry<'a>>,
}

impl<'a> NodeMap<'a> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn insert(&mut self, key: String, node: NodeRef<'a>, path: Vec<usize>) {
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => {
                entry.node = node;
                entry.path = path;
            }
            None => self.entries.push(Entry { key, node, path }),
        }
    }

    pub fn get(&self, key: &str) -> Option<NodeRef<'a>> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.node)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = NodeRef<'a>> + '_ {
        self.entries.iter().map(|entry| entry.node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeRef<'a>)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.key.as_str(), entry.node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Child indices leading from the discovery root to `key`.
    pub fn path_of(&self, key: &str) -> Option<&[usize]> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.path.as_slice())
    }
}

/// Sequence-shaped discovery over `children`, preceded by `root` when it matches.
pub fn discover<'a>(
    root: Option<NodeRef<'a>>,
    children: &'a [(String, Node)],
    options: &DiscoverOptions,
) -> Result<Vec<NodeRef<'a>>> {
    let mut found = Vec::new();
    collect_sequence(root, children, options, &mut found);
    ensure_single_iframe(found.iter().copied(), options)?;
    Ok(found)
}

/// Mapping-shaped discovery; `root` is stored under `root_key` when it matches.
pub fn discover_map<'a>(
    root: Option<NodeRef<'a>>,
    root_key: &str,
    children: &'a [(String, Node)],
    options: &DiscoverOptions,
) -> Result<NodeMap<'a>> {
    let map = collect_mapping(root, root_key, children, options);
    ensure_single_iframe(map.values(), options)?;
    Ok(map)
}

fn collect_sequence<'a>(
    root: Option<NodeRef<'a>>,
    children: &'a [(String, Node)],
    options: &DiscoverOptions,
    found: &mut Vec<NodeRef<'a>>,
) {
    if let Some(root) = root {
        if options.self_matches(root.kind()) {
            found.push(root);
        }
    }
    for (_, child) in children {
        let kind = child.kind();
        match child.children() {
            Some(nested) if options.recurses_into(child) => {
                collect_sequence(Some(child.view()), nested, options, found);
            }
            Some(_) => {
                if kind.is_a(options.kind) {
                    found.push(child.view());
                }
            }
            None => {
                if options.leaf_matches(kind) {
                    found.push(child.view());
                }
            }
        }
    }
}

fn collect_mapping<'a>(
    root: Option<NodeRef<'a>>,
    root_key: &str,
    children: &'a [(String, Node)],
    options: &DiscoverOptions,
) -> NodeMap<'a> {
    let mut map = NodeMap::new();
    if let Some(root) = root {
        if options.self_matches(root.kind()) {
            map.insert(root_key.to_string(), root, Vec::new());
        }
    }

    // nested results are merged after this container's own names
    let mut staged: Vec<(&'a str, NodeMap<'a>, usize)> = Vec::new();
    for (index, (name, child)) in children.iter().enumerate() {
        let kind = child.kind();
        match child.children() {
            Some(nested) if options.recurses_into(child) => {
                let inner = collect_mapping(Some(child.view()), name, nested, options);
                staged.push((name.as_str(), inner, index));
            }
            Some(_) => {
                if kind.is_a(options.kind) {
                    map.insert(name.clone(), child.view(), vec![index]);
                }
            }
            None => {
                if options.leaf_matches(kind) {
                    map.insert(name.clone(), child.view(), vec![index]);
                }
            }
        }
    }

    for (name, inner, index) in staged {
        for entry in inner.entries {
            let key = if map.contains_key(&entry.key) {
                format!("{}_{}", name, entry.key)
            } else {
                entry.key
            };
            let mut path = Vec::with_capacity(entry.path.len() + 1);
            path.push(index);
            path.extend(entry.path);
            map.insert(key, entry.node, path);
        }
    }
    map
}

fn ensure_single_iframe<'a>(
    nodes: impl Iterator<Item = NodeRef<'a>>,
    options: &DiscoverOptions,
) -> Result<()> {
    if options.expand_iframes {
        return Ok(());
    }
    let count = nodes
        .filter(|node| node.kind() == ElementKind::IFrame && !node.element().is_do_not_check())
        .count();
    if count > 1 {
        return Err(PageModelError::MultipleIFrames { count });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Session;
    use crate::dom::{Element, HasChildren, IFrame, Widget};
    use crate::locator::Locator;
    use crate::testing::TestHelper;

    fn element(session: &Session, xpath: &str) -> Element {
        Element::new(session.clone(), Locator::by_xpath(xpath))
    }

    fn elements(session: &Session) -> Vec<(String, Node)> {
        vec![
            ("regular_element".to_string(), element(session, "//a").into()),
            ("invisible_element".to_string(), element(session, "//b").mark_invisible().into()),
            ("not_checked_element".to_string(), element(session, "//c").mark_do_not_check().into()),
        ]
    }

    fn widget(session: &Session) -> Widget {
        Widget::new(session.clone(), Locator::by_xpath("//div[@id='widget']"))
            .with_child("regular_element_on_widget", element(session, "//d"))
            .with_child("invisible_element_on_widget", element(session, "//e").mark_invisible())
            .with_child("not_checked_element_on_widget", element(session, "//f").mark_do_not_check())
    }

    fn iframe(session: &Session, xpath: &str) -> IFrame {
        IFrame::new(session.clone(), Locator::by_xpath(xpath))
            .with_child("regular_element", element(session, "//j"))
            .with_child("invisible_element", element(session, "//k").mark_invisible())
            .with_child("not_checked_element", element(session, "//l").mark_do_not_check())
    }

    fn page_with(session: &Session, extra: Vec<(&str, Node)>) -> Vec<(String, Node)> {
        let mut children = elements(session);
        children.extend(extra.into_iter().map(|(name, node)| (name.to_string(), node)));
        children
    }

    fn keys(map: &NodeMap<'_>) -> Vec<String> {
        map.keys().map(str::to_string).collect()
    }

    #[test]
    fn test_plain_elements() {
        let (_driver, session) = TestHelper::mock_session();
        let children = elements(&session);
        let found = discover(None, &children, &DiscoverOptions::new()).unwrap();
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_visible_widget_is_recursed() {
        let (_driver, session) = TestHelper::mock_session();
        let children = page_with(&session, vec![("visible_widget", widget(&session).into())]);
        let found = discover(None, &children, &DiscoverOptions::new()).unwrap();
        assert_eq!(found.len(), 7);
        assert_eq!(found[3].kind(), ElementKind::Widget);
    }

    #[test]
    fn test_invisible_or_skipped_widget_is_opaque() {
        let (_driver, session) = TestHelper::mock_session();
        let children = page_with(
            &session,
            vec![("invisible_widget", widget(&session).mark_invisible().into())],
        );
        assert_eq!(discover(None, &children, &DiscoverOptions::new()).unwrap().len(), 4);

        let forced = DiscoverOptions::new().with_override_visible(true);
        assert_eq!(discover(None, &children, &forced).unwrap().len(), 7);

        let children = page_with(
            &session,
            vec![("skipped_widget", widget(&session).mark_do_not_check().into())],
        );
        assert_eq!(discover(None, &children, &DiscoverOptions::new()).unwrap().len(), 4);
        let forced = DiscoverOptions::new().with_override_do_not_check(true);
        assert_eq!(discover(None, &children, &forced).unwrap().len(), 7);
    }

    #[test]
    fn test_nested_panel() {
        let (_driver, session) = TestHelper::mock_session();
        let panel = Widget::panel(session.clone(), Locator::by_xpath("//div[@id='panel']"))
            .with_child("regular_element_on_panel", element(&session, "//g"))
            .with_child("invisible_element_on_panel", element(&session, "//h").mark_invisible())
            .with_child("not_checked_element_on_panel", element(&session, "//i").mark_do_not_check());
        let children = page_with(
            &session,
            vec![("widget_with_panel", widget(&session).with_child("panel", panel).into())],
        );
        let found = discover(None, &children, &DiscoverOptions::new()).unwrap();
        assert_eq!(found.len(), 11);

        let panels = discover(None, &children, &DiscoverOptions::new().of_kind(ElementKind::Panel)).unwrap();
        assert_eq!(panels.len(), 1);
        let widgets = discover(None, &children, &DiscoverOptions::new().of_kind(ElementKind::Widget)).unwrap();
        assert_eq!(widgets.len(), 2);
    }

    #[test]
    fn test_iframe_kept_whole_unless_expanded() {
        let (_driver, session) = TestHelper::mock_session();
        let children = page_with(&session, vec![("visible_iframe", iframe(&session, "//iframe").into())]);

        let found = discover(None, &children, &DiscoverOptions::new()).unwrap();
        assert_eq!(found.len(), 4);
        assert_eq!(found[3].kind(), ElementKind::IFrame);

        let expanded = DiscoverOptions::new().with_expand_iframes(true);
        assert_eq!(discover(None, &children, &expanded).unwrap().len(), 7);

        let map = discover_map(None, SELF_KEY, &children, &expanded).unwrap();
        assert_eq!(map.len(), 7);
        assert!(map.contains_key("visible_iframe"));
        assert!(map.contains_key("visible_iframe_regular_element"));
        assert!(map.contains_key("visible_iframe_invisible_element"));
        assert!(map.contains_key("visible_iframe_not_checked_element"));
        assert_eq!(
            map.get("regular_element").unwrap().element().locator(),
            Some(&Locator::by_xpath("//a"))
        );
        assert_eq!(
            map.get("visible_iframe_regular_element").unwrap().element().locator(),
            Some(&Locator::by_xpath("//j"))
        );
    }

    #[test]
    fn test_mapping_prefers_local_names() {
        let (_driver, session) = TestHelper::mock_session();
        let children = page_with(&session, vec![("visible_widget", widget(&session).into())]);
        let map = discover_map(None, SELF_KEY, &children, &DiscoverOptions::new()).unwrap();
        assert_eq!(
            keys(&map),
            vec![
                "regular_element",
                "invisible_element",
                "not_checked_element",
                "visible_widget",
                "regular_element_on_widget",
                "invisible_element_on_widget",
                "not_checked_element_on_widget",
            ]
        );
        assert_eq!(map.path_of("regular_element_on_widget"), Some(&[3usize, 0][..]));
    }

    #[test]
    fn test_root_included_under_self_key() {
        let (_driver, session) = TestHelper::mock_session();
        let widget = widget(&session);
        let map = widget.discover_map(&DiscoverOptions::new().with_self(true)).unwrap();
        assert!(map.contains_key(SELF_KEY));
        assert_eq!(map.path_of(SELF_KEY), Some(&[][..]));

        let found = widget.discover(&DiscoverOptions::new().with_self(true)).unwrap();
        assert_eq!(found[0].kind(), ElementKind::Widget);
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn test_iframe_root_excluded_unless_expanded() {
        let (_driver, session) = TestHelper::mock_session();
        let frame = iframe(&session, "//iframe");
        let found = frame.discover(&DiscoverOptions::new().with_self(true)).unwrap();
        assert_eq!(found.len(), 3);
        let found = frame
            .discover(&DiscoverOptions::new().with_self(true).with_expand_iframes(true))
            .unwrap();
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn test_multiple_iframes_rejected() {
        let (_driver, session) = TestHelper::mock_session();
        let children = page_with(
            &session,
            vec![
                ("first_iframe", iframe(&session, "//iframe[1]").into()),
                ("second_iframe", iframe(&session, "//iframe[2]").into()),
            ],
        );
        let err = discover_map(None, SELF_KEY, &children, &DiscoverOptions::new()).unwrap_err();
        assert!(matches!(err, PageModelError::MultipleIFrames { count: 2 }));
        assert!(discover(None, &children, &DiscoverOptions::new()).is_err());

        let expanded = DiscoverOptions::new().with_expand_iframes(true);
        assert_eq!(discover_map(None, SELF_KEY, &children, &expanded).unwrap().len(), 11);
    }

    #[test]
    fn test_skipped_iframe_does_not_count() {
        let (_driver, session) = TestHelper::mock_session();
        let children = page_with(
            &session,
            vec![
                ("first_iframe", iframe(&session, "//iframe[1]").into()),
                ("second_iframe", iframe(&session, "//iframe[2]").mark_do_not_check().into()),
            ],
        );
        assert_eq!(discover(None, &children, &DiscoverOptions::new()).unwrap().len(), 5);
    }

    #[test]
    fn test_iframe_nested_in_widget_still_counts() {
        let (_driver, session) = TestHelper::mock_session();
        let inner = widget(&session).with_child("inner_iframe", iframe(&session, "//iframe[2]"));
        let children = page_with(
            &session,
            vec![
                ("first_iframe", iframe(&session, "//iframe[1]").into()),
                ("visible_widget", inner.into()),
            ],
        );
        let err = discover(None, &children, &DiscoverOptions::new()).unwrap_err();
        assert!(matches!(err, PageModelError::MultipleIFrames { count: 2 }));
    }

    #[test]
    fn test_kind_filter() {
        let (_driver, session) = TestHelper::mock_session();
        let children = vec![
            ("button".to_string(), Element::button(session.clone(), Locator::by_id("b")).into()),
            ("link".to_string(), Element::link(session.clone(), Locator::by_id("l")).into()),
            ("checkbox".to_string(), Element::checkbox(session.clone(), Locator::by_id("c")).into()),
            ("field".to_string(), Element::text_field(session.clone(), Locator::by_id("f")).into()),
            ("plain".to_string(), element(&session, "//p").into()),
        ];
        let count = |kind| {
            discover(None, &children, &DiscoverOptions::new().of_kind(kind))
                .unwrap()
                .len()
        };
        assert_eq!(count(ElementKind::Element), 5);
        assert_eq!(count(ElementKind::Clickable), 2);
        assert_eq!(count(ElementKind::Button), 1);
        assert_eq!(count(ElementKind::TextElement), 1);
        assert_eq!(count(ElementKind::Widget), 0);
    }

    #[test]
    fn test_shape_parsing() {
        assert_eq!("list".parse::<Shape>().unwrap(), Shape::Sequence);
        assert_eq!("dict".parse::<Shape>().unwrap(), Shape::Mapping);
        assert!(matches!(
            "set".parse::<Shape>(),
            Err(PageModelError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_shaped_discovery() {
        let (_driver, session) = TestHelper::mock_session();
        let widget = widget(&session);
        let found = widget.discover_shaped(&DiscoverOptions::new(), Shape::Mapping).unwrap();
        assert!(matches!(found, Discovered::Mapping(_)));
        assert_eq!(found.len(), 3);
        assert_eq!(found.into_nodes().len(), 3);
    }
}
