use crate::core::Session;
use crate::dom::discovery::DiscoverOptions;
use crate::dom::element::Element;
use crate::dom::kind::ElementKind;
use crate::dom::node::{HasChildren, Node, NodeRef};
use crate::dom::validation::{validate_nodes, ValidateOptions, ValidationPlan};
use crate::errors::Result;
use crate::locator::Locator;
use crate::utils::with_diagnostics;
use std::time::Duration;

/// A composite node: an element of its own plus named children, which may be
/// composites themselves. Panels are widgets with the `Panel` kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Widget {
    element: Element,
    children: Vec<(String, Node)>,
}

impl Widget {
    pub fn new(session: Session, locator: impl Into<Option<Locator>>) -> Self {
        Self::of_kind(ElementKind::Widget, session, locator)
    }

    pub fn panel(session: Session, locator: impl Into<Option<Locator>>) -> Self {
        Self::of_kind(ElementKind::Panel, session, locator)
    }

    pub(crate) fn of_kind(kind: ElementKind, session: Session, locator: impl Into<Option<Locator>>) -> Self {
        Self {
            element: Element::of_kind(kind, session, locator),
            children: Vec::new(),
        }
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    pub fn session(&self) -> &Session {
        self.element.session()
    }

    pub fn kind(&self) -> ElementKind {
        self.element.kind()
    }

    pub fn with_child(mut self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        self.register_child(name, node);
        self
    }

    pub fn mark_invisible(mut self) -> Self {
        self.element.set_visible(false);
        self
    }

    pub fn mark_visible(mut self) -> Self {
        self.element.set_visible(true);
        self
    }

    pub fn mark_do_not_check(mut self) -> Self {
        self.element.set_do_not_check(true);
        self
    }

    pub fn mark_check(mut self) -> Self {
        self.element.set_do_not_check(false);
        self
    }

    /// Check every discovered child for presence, and visibility where expected. The widget's
    /// own element is checked first when `options.include_self` is set. Timeout defaults to
    /// the element timeout.
    pub async fn validate(&self, options: ValidateOptions) -> Result<&Self> {
        self.validate_with(options, self.session().element_timeout())
            .await?;
        Ok(self)
    }

    async fn validate_with(&self, options: ValidateOptions, default_timeout: Duration) -> Result<()> {
        let session = self.session();
        let plan = ValidationPlan::resolve(session, &options, default_timeout);
        with_diagnostics(session, "validate", async {
            let nodes = self.discover(&DiscoverOptions::new().with_self(options.include_self))?;
            validate_nodes(session, nodes, plan).await
        })
        .await
    }

    /// Validate the widget and its children, timing the load under `<Kind>_load`.
    /// Timeout defaults to the page timeout.
    pub async fn wait_for_widget_load(
        &self,
        timeout: Option<Duration>,
        force_visible: bool,
        include_self: bool,
    ) -> Result<&Self> {
        let timer = format!("{}_load", self.kind());
        let session = self.session();
        session.timers().start(Some(&timer));
        let options = ValidateOptions::new()
            .with_optional_timeout(timeout)
            .with_force_visible(force_visible)
            .with_self(include_self);
        let result = self.validate_with(options, session.page_timeout()).await;
        let took = session.timers().stop(Some(&timer));
        if let Some(took) = took {
            session.debug(&format!("{} load took {:?}", self.kind(), took));
        }
        result.map(|_| self)
    }

    /// Fail-fast validation reported as a bool; no screenshots are taken.
    pub async fn is_widget_loaded(&self, timeout: Option<Duration>, force_visible: bool) -> bool {
        let session = self.session();
        let _quiet = session.suppress_screenshots();
        let options = ValidateOptions::new()
            .with_optional_timeout(timeout)
            .with_force_visible(force_visible)
            .with_fail_fast(true)
            .with_self(true);
        self.validate_with(options, session.element_timeout())
            .await
            .is_ok()
    }
}

impl HasChildren for Widget {
    fn children(&self) -> &[(String, Node)] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<(String, Node)> {
        &mut self.children
    }

    fn as_node_ref(&self) -> Option<NodeRef<'_>> {
        Some(NodeRef::Widget(self))
    }

    fn own_element_mut(&mut self) -> Option<&mut Element> {
        Some(&mut self.element)
    }

    fn container_name(&self) -> String {
        match self.element.locator() {
            Some(locator) => format!("{}({})", self.kind(), locator),
            None => self.kind().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::Waitable;
    use crate::dom::IFrame;
    use crate::errors::PageModelError;
    use crate::testing::{MockDriver, MockElement, TestHelper};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn complex_widget(session: &Session) -> Widget {
        Widget::new(session.clone(), Locator::by_xpath("//div[@id='widget']"))
            .with_child("regular_element_on_widget", Element::new(session.clone(), Locator::by_xpath("//d")))
            .with_child(
                "invisible_element_on_widget",
                Element::new(session.clone(), Locator::by_xpath("//e")).mark_invisible(),
            )
            .with_child(
                "not_checked_element_on_widget",
                Element::new(session.clone(), Locator::by_xpath("//f")).mark_do_not_check(),
            )
    }

    #[test]
    fn test_register_child_replaces_in_place() {
        let (_driver, session) = TestHelper::mock_session();
        let mut widget = Widget::new(session.clone(), Locator::by_xpath("//w"))
            .with_child("first", Element::new(session.clone(), Locator::by_xpath("//1")))
            .with_child("second", Element::new(session.clone(), Locator::by_xpath("//2")));
        widget.register_child("first", Element::new(session.clone(), Locator::by_xpath("//3")));

        let names: Vec<&str> = widget.local_children().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(
            widget.child("first").unwrap().element().locator(),
            Some(&Locator::by_xpath("//3"))
        );
    }

    #[test]
    fn test_local_children_do_not_recurse() {
        let (_driver, session) = TestHelper::mock_session();
        let widget = Widget::new(session.clone(), Locator::by_xpath("//w"))
            .with_child("inner", complex_widget(&session))
            .with_child("leaf", Element::new(session.clone(), Locator::by_xpath("//x")));
        assert_eq!(widget.local_children().len(), 2);
        assert_eq!(widget.all_elements().unwrap().len(), 6);
    }

    #[test]
    fn test_own_mapping_includes_widget_key() {
        let (_driver, session) = TestHelper::mock_session();
        let widget = complex_widget(&session);
        let all = widget.all_elements().unwrap();
        assert!(all.contains_key("widget"));
        assert!(all.contains_key("regular_element_on_widget"));
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_lookup_errors_list_valid_names() {
        let (_driver, session) = TestHelper::mock_session();
        let widget = complex_widget(&session);
        assert!(widget.lookup("regular_element_on_widget").is_some());
        assert!(widget.lookup("nope").is_none());

        let err = widget.try_lookup("nope").unwrap_err();
        match &err {
            PageModelError::AttributeNotFound { name, available, .. } => {
                assert_eq!(name, "nope");
                assert!(available.contains(&"invisible_element_on_widget".to_string()));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().contains("  - widget"));
    }

    #[test]
    fn test_lookup_mut_marks_nested_nodes() {
        let (_driver, session) = TestHelper::mock_session();
        let mut widget = Widget::new(session.clone(), Locator::by_xpath("//w"))
            .with_child("inner", complex_widget(&session));

        widget
            .lookup_mut("regular_element_on_widget")
            .unwrap()
            .set_do_not_check(true);
        widget.lookup_mut("widget").unwrap().set_visible(false);

        let inner = widget.child("inner").unwrap();
        let nested = inner.children().unwrap();
        assert!(nested[0].1.element().is_do_not_check());
        assert!(!widget.element().expects_visible());
    }

    #[tokio::test]
    async fn test_validate_checks_children_not_self() {
        let (driver, session) = TestHelper::mock_session();
        driver.add_element(Locator::by_xpath("//d"));
        driver.add(Locator::by_xpath("//e"), MockElement::new().hidden());
        let widget = complex_widget(&session);

        assert_ok!(widget.validate(ValidateOptions::new()).await);
        assert_eq!(driver.lookup_count(&Locator::by_xpath("//div[@id='widget']")), 0);
        assert_eq!(driver.lookup_count(&Locator::by_xpath("//f")), 0);

        // visibility is only enforced for //e when forced
        let err = assert_err!(widget.validate(ValidateOptions::new().with_force_visible(true)).await);
        assert!(err.to_string().contains("waiting for visible xpath=//e"));
    }

    #[tokio::test]
    async fn test_validate_with_self_checks_own_locator() {
        let (driver, session) = TestHelper::mock_session();
        driver.add_element(Locator::by_xpath("//d"));
        driver.add(Locator::by_xpath("//e"), MockElement::new().hidden());
        let widget = complex_widget(&session);

        let err = assert_err!(widget.validate(ValidateOptions::new().with_self(true)).await);
        assert!(err.to_string().contains("//div[@id='widget']"));
        assert_eq!(driver.lookup_count(&Locator::by_xpath("//d")), 0);

        driver.add_element(Locator::by_xpath("//div[@id='widget']"));
        assert_ok!(widget.validate(ValidateOptions::new().with_self(true)).await);
        assert!(driver.lookup_count(&Locator::by_xpath("//d")) > 0);
    }

    #[tokio::test]
    async fn test_wait_for_widget_load_includes_self_and_times_it() {
        let (driver, session) = TestHelper::mock_session();
        let widget = complex_widget(&session);
        driver.add_element(Locator::by_xpath("//d"));
        driver.add_element(Locator::by_xpath("//e"));

        assert!(!widget.is_widget_loaded(Some(Duration::ZERO), false).await);
        driver.add_element(Locator::by_xpath("//div[@id='widget']"));
        assert!(widget.is_widget_loaded(Some(Duration::ZERO), false).await);

        driver.add(Locator::by_xpath("//d"), MockElement::new().appears_after(3));
        assert_ok!(widget.wait_for_widget_load(None, false, true).await);
        assert!(session.timers().duration(Some("Widget_load")) >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_widget_waits_through_capability() {
        let (driver, session) = TestHelper::mock_session();
        let widget = complex_widget(&session);
        driver.add_element(Locator::by_xpath("//div[@id='widget']"));
        assert!(widget.is_present(Some(Duration::ZERO)).await);
        assert_ok!(Waitable::wait_for_present_and_visible(&widget, Some(Duration::ZERO)).await);
    }

    #[test]
    fn test_panels_and_iframes_compare_structurally() {
        let driver = Arc::new(MockDriver::new());
        let session = Session::new(driver);
        let a = Widget::panel(session.clone(), Locator::by_xpath("//p"))
            .with_child("x", Element::new(session.clone(), Locator::by_xpath("//x")));
        let b = Widget::panel(session.clone(), Locator::by_xpath("//p"))
            .with_child("x", Element::new(session.clone(), Locator::by_xpath("//x")));
        assert_eq!(a, b);
        assert_ne!(a, b.clone().mark_invisible());
        assert_ne!(Node::from(a), Node::from(IFrame::new(session, Locator::by_xpath("//p"))));
    }
}
