use crate::core::ElementHandle;
use crate::locator::{Locator, Strategy};
use serde_json::Value;

/// Attribute used to tag matched DOM nodes so later calls can address them.
pub const HANDLE_ATTRIBUTE: &str = "data-pagemodel-handle";

/// Builders for the scripts the Chrome backend evaluates.
///
/// Every script evaluates to a JSON string so results survive the CDP round trip
/// regardless of the value's shape.
pub struct ScriptBuilder;

impl ScriptBuilder {
    /// Quote `value` as a JavaScript string literal.
    pub fn literal(value: &str) -> String {
        Value::String(value.to_string()).to_string()
    }

    /// Expression for the document the current frame path points into.
    pub fn document_root(frames: &[ElementHandle]) -> String {
        let mut root = String::from("document");
        for frame in frames {
            root = format!(
                "(function(d) {{ const f = d ? d.querySelector({}) : null; return f ? f.contentDocument : null; }})({})",
                Self::literal(&Self::handle_selector(frame)),
                root
            );
        }
        root
    }

    pub fn handle_selector(handle: &ElementHandle) -> String {
        format!("[{}=\"{}\"]", HANDLE_ATTRIBUTE, handle.id())
    }

    /// Expression evaluating to an array of DOM nodes matching `locator` under `root`.
    fn nodes(root: &str, locator: &Locator) -> String {
        let value = Self::literal(locator.value());
        match locator.strategy() {
            Strategy::XPath => format!(
                r#"(function() {{
                    const r = {root}.evaluate({value}, {root}, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                    const out = [];
                    for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i));
                    return out;
                }})()"#,
                root = root,
                value = value
            ),
            Strategy::Css => format!("Array.from({}.querySelectorAll({}))", root, value),
            Strategy::Id => format!(
                "Array.from({}.getElementsByTagName('*')).filter(e => e.id === {})",
                root, value
            ),
            Strategy::Name => format!(
                "Array.from({}.getElementsByTagName('*')).filter(e => e.getAttribute('name') === {})",
                root, value
            ),
            Strategy::ClassName => format!("Array.from({}.getElementsByClassName({}))", root, value),
            Strategy::TagName => format!("Array.from({}.getElementsByTagName({}))", root, value),
            Strategy::LinkText => format!(
                "Array.from({}.getElementsByTagName('a')).filter(e => (e.innerText || e.textContent || '').trim() === {})",
                root, value
            ),
            Strategy::PartialLinkText => format!(
                "Array.from({}.getElementsByTagName('a')).filter(e => (e.innerText || e.textContent || '').includes({}))",
                root, value
            ),
        }
    }

    /// Tag every match with a handle id (reusing existing tags) and return the ids as JSON.
    pub fn find_elements(frames: &[ElementHandle], locator: &Locator, prefix: &str) -> String {
        let root = Self::document_root(frames);
        format!(
            r#"(function() {{
                const __root = {root};
                if (!__root) return '[]';
                const nodes = {nodes};
                return JSON.stringify(nodes.map(function(el) {{
                    let id = el.getAttribute('{attr}');
                    if (!id) {{
                        window.__pagemodelSeq = (window.__pagemodelSeq || 0) + 1;
                        id = {prefix} + '-' + window.__pagemodelSeq;
                        el.setAttribute('{attr}', id);
                    }}
                    return id;
                }}));
            }})()"#,
            root = root,
            nodes = Self::nodes("__root", locator),
            attr = HANDLE_ATTRIBUTE,
            prefix = Self::literal(prefix),
        )
    }

    /// Run `body` (an expression over `el`) against the tagged element.
    /// Evaluates to `{"found": bool, "value": ...}` as JSON.
    pub fn on_element(frames: &[ElementHandle], handle: &ElementHandle, body: &str) -> String {
        format!(
            r#"(function() {{
                const __root = {root};
                const el = __root ? __root.querySelector({selector}) : null;
                if (!el) return JSON.stringify({{ found: false }});
                const value = {body};
                return JSON.stringify({{ found: true, value: value === undefined ? null : value }});
            }})()"#,
            root = Self::document_root(frames),
            selector = Self::literal(&Self::handle_selector(handle)),
            body = body,
        )
    }

    pub fn is_displayed() -> &'static str {
        r#"(function() {
            const style = (el.ownerDocument.defaultView || window).getComputedStyle(el);
            if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
            const rect = el.getBoundingClientRect();
            return rect.width > 0 && rect.height > 0;
        })()"#
    }

    pub fn is_enabled() -> &'static str {
        "!el.disabled"
    }

    pub fn is_selected() -> &'static str {
        "!!(el.checked || el.selected)"
    }

    /// Attribute value, falling back to a same-named scalar property (`innerHTML`, `value`).
    pub fn get_attribute(name: &str) -> String {
        format!(
            r#"(function(n) {{
                const a = el.getAttribute(n);
                if (a !== null) return a;
                const p = el[n];
                return (p === undefined || p === null || typeof p === 'object' || typeof p === 'function') ? null : String(p);
            }})({})"#,
            Self::literal(name)
        )
    }

    pub fn text() -> &'static str {
        "(el.innerText || el.textContent || '').trim()"
    }

    pub fn click() -> &'static str {
        "(el.click(), null)"
    }

    pub fn send_keys(text: &str) -> String {
        format!(
            r#"(function(t) {{
                el.focus();
                el.value = (el.value || '') + t;
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return null;
            }})({})"#,
            Self::literal(text)
        )
    }

    pub fn clear() -> &'static str {
        r#"(function() {
            el.value = '';
            el.dispatchEvent(new Event('input', { bubbles: true }));
            el.dispatchEvent(new Event('change', { bubbles: true }));
            return null;
        })()"#
    }

    pub fn submit() -> &'static str {
        r#"(function() {
            const form = el.tagName === 'FORM' ? el : el.form;
            if (!form) return false;
            if (form.requestSubmit) form.requestSubmit(); else form.submit();
            return true;
        })()"#
    }

    pub fn title() -> &'static str {
        "JSON.stringify(document.title)"
    }
}
