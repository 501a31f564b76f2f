use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a node. Kinds form an is-a chain used by discovery filters:
/// a `Checkbox` is-a `Clickable` is-a `Element`, an `IFrame` is-a `Panel` is-a `Widget`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Element,
    Clickable,
    Button,
    Link,
    TextElement,
    TextField,
    Checkbox,
    RadioButton,
    Dropdown,
    Table,
    Widget,
    Panel,
    IFrame,
}

impl ElementKind {
    pub fn parent(self) -> Option<ElementKind> {
        use ElementKind::*;
        match self {
            Element => None,
            Clickable | Button | TextElement | Table => Some(Element),
            TextField => Some(TextElement),
            Link | Checkbox | RadioButton | Dropdown | Widget => Some(Clickable),
            Panel => Some(Widget),
            IFrame => Some(Panel),
        }
    }

    /// True when `self` is `other` or one of its descendants.
    pub fn is_a(self, other: ElementKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Container kinds own children and are discovered as units.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            ElementKind::Widget | ElementKind::Panel | ElementKind::IFrame
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Element => "Element",
            ElementKind::Clickable => "Clickable",
            ElementKind::Button => "Button",
            ElementKind::Link => "Link",
            ElementKind::TextElement => "TextElement",
            ElementKind::TextField => "TextField",
            ElementKind::Checkbox => "Checkbox",
            ElementKind::RadioButton => "RadioButton",
            ElementKind::Dropdown => "Dropdown",
            ElementKind::Table => "Table",
            ElementKind::Widget => "Widget",
            ElementKind::Panel => "Panel",
            ElementKind::IFrame => "IFrame",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
