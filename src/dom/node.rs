use crate::dom::discovery::{self, DiscoverOptions, Discovered, NodeMap, Shape, SELF_KEY};
use crate::dom::element::Element;
use crate::dom::iframe::IFrame;
use crate::dom::kind::ElementKind;
use crate::dom::widget::Widget;
use crate::errors::{PageModelError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// A registered member of a page model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Element(Element),
    Widget(Widget),
    IFrame(IFrame),
}

impl Node {
    pub fn view(&self) -> NodeRef<'_> {
        match self {
            Node::Element(element) => NodeRef::Element(element),
            Node::Widget(widget) => NodeRef::Widget(widget),
            Node::IFrame(iframe) => NodeRef::IFrame(iframe),
        }
    }

    pub fn element(&self) -> &Element {
        match self {
            Node::Element(element) => element,
            Node::Widget(widget) => widget.element(),
            Node::IFrame(iframe) => iframe.element(),
        }
    }

    pub fn element_mut(&mut self) -> &mut Element {
        match self {
            Node::Element(element) => element,
            Node::Widget(widget) => widget.element_mut(),
            Node::IFrame(iframe) => iframe.element_mut(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.element().kind()
    }

    pub fn is_composite(&self) -> bool {
        !matches!(self, Node::Element(_))
    }

    pub fn children(&self) -> Option<&[(String, Node)]> {
        match self {
            Node::Element(_) => None,
            Node::Widget(widget) => Some(widget.children()),
            Node::IFrame(iframe) => Some(iframe.children()),
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<(String, Node)>> {
        match self {
            Node::Element(_) => None,
            Node::Widget(widget) => Some(widget.children_mut()),
            Node::IFrame(iframe) => Some(iframe.children_mut()),
        }
    }

    pub fn as_widget(&self) -> Option<&Widget> {
        match self {
            Node::Widget(widget) => Some(widget),
            _ => None,
        }
    }

    pub fn as_iframe(&self) -> Option<&IFrame> {
        match self {
            Node::IFrame(iframe) => Some(iframe),
            _ => None,
        }
    }

    pub fn mark_invisible(mut self) -> Self {
        self.element_mut().set_visible(false);
        self
    }

    pub fn mark_visible(mut self) -> Self {
        self.element_mut().set_visible(true);
        self
    }

    pub fn mark_do_not_check(mut self) -> Self {
        self.element_mut().set_do_not_check(true);
        self
    }

    pub fn mark_check(mut self) -> Self {
        self.element_mut().set_do_not_check(false);
        self
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Widget> for Node {
    fn from(widget: Widget) -> Self {
        Node::Widget(widget)
    }
}

impl From<IFrame> for Node {
    fn from(iframe: IFrame) -> Self {
        Node::IFrame(iframe)
    }
}

/// Borrowed view of a node, as returned by discovery. Containers discover themselves
/// through this too, so it does not require the node to live inside a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    Element(&'a Element),
    Widget(&'a Widget),
    IFrame(&'a IFrame),
}

impl<'a> NodeRef<'a> {
    pub fn element(&self) -> &'a Element {
        match *self {
            NodeRef::Element(element) => element,
            NodeRef::Widget(widget) => widget.element(),
            NodeRef::IFrame(iframe) => iframe.element(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.element().kind()
    }

    pub fn is_composite(&self) -> bool {
        !matches!(self, NodeRef::Element(_))
    }

    pub fn children(&self) -> Option<&'a [(String, Node)]> {
        match *self {
            NodeRef::Element(_) => None,
            NodeRef::Widget(widget) => Some(widget.children()),
            NodeRef::IFrame(iframe) => Some(iframe.children()),
        }
    }

    pub fn as_widget(&self) -> Option<&'a Widget> {
        match *self {
            NodeRef::Widget(widget) => Some(widget),
            _ => None,
        }
    }

    pub fn as_iframe(&self) -> Option<&'a IFrame> {
        match *self {
            NodeRef::IFrame(iframe) => Some(iframe),
            _ => None,
        }
    }
}

/// Presence and visibility waits shared by every node kind.
#[async_trait]
pub trait Waitable: Send + Sync {
    fn element(&self) -> &Element;

    async fn wait_for_present(&self, timeout: Option<Duration>) -> Result<()> {
        self.element().wait_for_present(timeout).await.map(|_| ())
    }

    async fn wait_for_visible(&self, timeout: Option<Duration>) -> Result<()> {
        self.element().wait_for_visible(timeout).await.map(|_| ())
    }

    async fn wait_for_present_and_visible(&self, timeout: Option<Duration>) -> Result<()> {
        self.element()
            .wait_for_present_and_visible(timeout)
            .await
            .map(|_| ())
    }

    async fn is_present(&self, timeout: Option<Duration>) -> bool {
        self.element().is_present(timeout).await
    }

    async fn is_visible(&self, timeout: Option<Duration>) -> bool {
        self.element().is_visible(timeout).await
    }

    async fn is_present_and_visible(&self, timeout: Option<Duration>) -> bool {
        self.element().is_present_and_visible(timeout).await
    }
}

impl Waitable for Element {
    fn element(&self) -> &Element {
        self
    }
}

impl Waitable for Widget {
    fn element(&self) -> &Element {
        Widget::element(self)
    }
}

impl Waitable for IFrame {
    fn element(&self) -> &Element {
        IFrame::element(self)
    }
}

impl Waitable for Node {
    fn element(&self) -> &Element {
        Node::element(self)
    }
}

impl Waitable for NodeRef<'_> {
    fn element(&self) -> &Element {
        NodeRef::element(self)
    }
}

/// Containers: an ordered list of named children plus discovery over them.
pub trait HasChildren {
    fn children(&self) -> &[(String, Node)];

    fn children_mut(&mut self) -> &mut Vec<(String, Node)>;

    /// The container itself as a discoverable node; `None` for the page root.
    fn as_node_ref(&self) -> Option<NodeRef<'_>>;

    /// The container's own element, for marking it through `lookup_mut`.
    fn own_element_mut(&mut self) -> Option<&mut Element>;

    /// Name used in lookup errors.
    fn container_name(&self) -> String;

    /// Register `node` under `name`, replacing an existing child of that name in place.
    fn register_child(&mut self, name: impl Into<String>, node: impl Into<Node>)
    where
        Self: Sized,
    {
        let name = name.into();
        let node = node.into();
        let children = self.children_mut();
        match children.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = node,
            None => children.push((name, node)),
        }
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children()
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, node)| node)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children_mut()
            .iter_mut()
            .find(|(existing, _)| existing == name)
            .map(|(_, node)| node)
    }

    /// Directly registered children, without recursing into composites.
    fn local_children(&self) -> Vec<(&str, &Node)> {
        self.children()
            .iter()
            .map(|(name, node)| (name.as_str(), node))
            .collect()
    }

    fn discover(&self, options: &DiscoverOptions) -> Result<Vec<NodeRef<'_>>> {
        let root = if options.include_self { self.as_node_ref() } else { None };
        discovery::discover(root, self.children(), options)
    }

    fn discover_map(&self, options: &DiscoverOptions) -> Result<NodeMap<'_>> {
        let root = if options.include_self { self.as_node_ref() } else { None };
        discovery::discover_map(root, SELF_KEY, self.children(), options)
    }

    fn discover_shaped(&self, options: &DiscoverOptions, shape: Shape) -> Result<Discovered<'_>> {
        match shape {
            Shape::Sequence => self.discover(options).map(Discovered::Sequence),
            Shape::Mapping => self.discover_map(options).map(Discovered::Mapping),
        }
    }

    /// Every node reachable from here, by name, with both overrides on and iframes expanded.
    fn all_elements(&self) -> Result<NodeMap<'_>> {
        self.discover_map(&DiscoverOptions::all())
    }

    fn lookup(&self, name: &str) -> Option<NodeRef<'_>> {
        self.all_elements().ok()?.get(name)
    }

    /// Like [`lookup`](HasChildren::lookup), failing with the list of valid names.
    fn try_lookup(&self, name: &str) -> Result<NodeRef<'_>> {
        let all = self.all_elements()?;
        all.get(name).ok_or_else(|| PageModelError::AttributeNotFound {
            container: self.container_name(),
            name: name.to_string(),
            available: all.keys().map(str::to_string).collect(),
        })
    }

    /// Mutable access to the element (flags included) of a discovered node.
    fn lookup_mut(&mut self, name: &str) -> Option<&mut Element> {
        let path = self.all_elements().ok()?.path_of(name)?.to_vec();
        if path.is_empty() {
            return self.own_element_mut();
        }
        node_at_path_mut(self.children_mut(), &path).map(Node::element_mut)
    }
}

fn node_at_path_mut<'a>(children: &'a mut Vec<(String, Node)>, path: &[usize]) -> Option<&'a mut Node> {
    let (first, rest) = path.split_first()?;
    let node = &mut children.get_mut(*first)?.1;
    if rest.is_empty() {
        Some(node)
    } else {
        node_at_path_mut(node.children_mut()?, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;
    use crate::testing::TestHelper;

    #[test]
    fn test_markers_toggle_every_node_type() {
        let (_driver, session) = TestHelper::mock_session();
        let nodes = vec![
            Node::from(Element::new(session.clone(), Locator::by_xpath("//a"))),
            Node::from(Widget::new(session.clone(), Locator::by_xpath("//w"))),
            Node::from(IFrame::new(session.clone(), Locator::by_xpath("//iframe"))),
        ];
        for node in nodes {
            let hidden = node.clone().mark_invisible().mark_do_not_check();
            assert!(!hidden.element().expects_visible());
            assert!(hidden.element().is_do_not_check());

            let restored = hidden.mark_visible().mark_check();
            assert!(restored.element().expects_visible());
            assert!(!restored.element().is_do_not_check());
            assert_eq!(restored, node);
        }
    }
}
