pub mod discovery;
pub mod element;
pub mod iframe;
pub mod kind;
pub mod node;
pub mod validation;
pub mod wait;
pub mod widget;

pub use discovery::{DiscoverOptions, Discovered, NodeMap, Shape};
pub use element::Element;
pub use iframe::IFrame;
pub use kind::ElementKind;
pub use node::{HasChildren, Node, NodeRef, Waitable};
pub use validation::ValidateOptions;
pub use wait::Condition;
pub use widget::Widget;
