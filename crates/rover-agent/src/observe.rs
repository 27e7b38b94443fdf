//! DOM enumeration: the indexed element list the model acts on.

use std::fmt;

use eoka::Page;
use serde::Deserialize;

use crate::Result;

/// An interactive element on the page, identified by index.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveElement {
    /// Zero-based index (stable until the next observation)
    pub index: usize,
    /// HTML tag name (e.g. "button", "input", "a")
    pub tag: String,
    /// ARIA role if set
    pub role: Option<String>,
    /// Visible text or label, truncated to 60 chars
    pub text: String,
    /// Placeholder attribute for inputs
    pub placeholder: Option<String>,
    /// Input type (only for `<input>` and `<select>` elements)
    pub input_type: Option<String>,
    /// Unique CSS selector for this element
    pub selector: String,
    /// Whether the element is checked (radio/checkbox)
    pub checked: bool,
    /// Current value of a form element, never set for password inputs
    pub value: Option<String>,
}

impl fmt::Display for InteractiveElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] <{}", self.index, self.tag)?;
        if let Some(ref t) = self.input_type {
            if t != "text" {
                write!(f, " type=\"{}\"", t)?;
            }
        }
        f.write_str(">")?;
        if self.checked {
            f.write_str(" [checked]")?;
        }
        if !self.text.is_empty() {
            write!(f, " \"{}\"", self.text)?;
        }
        if let Some(ref v) = self.value {
            write!(f, " value=\"{}\"", v)?;
        }
        if let Some(ref p) = self.placeholder {
            write!(f, " placeholder=\"{}\"", p)?;
        }
        if let Some(ref r) = self.role {
            let redundant = (r == "button" && self.tag == "button")
                || (r == "link" && self.tag == "a");
            if !redundant {
                write!(f, " role=\"{}\"", r)?;
            }
        }
        Ok(())
    }
}

/// Render elements one per line, the format the model sees.
pub fn element_list(elements: &[InteractiveElement]) -> String {
    let mut out = String::with_capacity(elements.len() * 40);
    for el in elements {
        out.push_str(&el.to_string());
        out.push('\n');
    }
    out
}

#[derive(Deserialize)]
struct RawElement {
    tag: String,
    role: Option<String>,
    text: String,
    placeholder: Option<String>,
    input_type: Option<String>,
    selector: String,
    checked: bool,
    value: String,
}

/// Enumerates visible interactive elements, returned as a JSON string.
/// `__rover_viewport_only` is prepended by [`observe`].
const OBSERVE_JS: &str = r#"
(() => {
    const INTERACTIVE = [
        'a', 'button', 'input', 'select', 'textarea',
        '[role="button"]', '[role="link"]', '[role="tab"]', '[role="menuitem"]',
        '[role="checkbox"]', '[onclick]', '[contenteditable="true"]',
    ].join(', ');
    const results = [];
    const seen = new Set();

    function labelFor(el) {
        if (el.id) {
            const label = document.querySelector('label[for=' + JSON.stringify(el.id) + ']');
            if (label) return label.textContent.trim();
        }
        const wrapping = el.closest('label');
        if (wrapping) {
            const clone = wrapping.cloneNode(true);
            clone.querySelectorAll('input, select, textarea').forEach(c => c.remove());
            const t = clone.textContent.trim();
            if (t) return t;
        }
        const labelledBy = el.getAttribute('aria-labelledby');
        if (labelledBy) {
            const lbl = document.getElementById(labelledBy);
            if (lbl) return lbl.textContent.trim();
        }
        return '';
    }

    function selectorFor(el, tag, inputType, ariaLabel, placeholder) {
        if (el.id) return '#' + CSS.escape(el.id);
        if (el.name && (tag === 'input' || tag === 'select' || tag === 'textarea')) {
            if ((inputType === 'radio' || inputType === 'checkbox') && el.value) {
                return tag + '[name=' + JSON.stringify(el.name) +
                    '][value=' + JSON.stringify(el.value) + ']';
            }
            return tag + '[name=' + JSON.stringify(el.name) + ']';
        }
        if (ariaLabel) return tag + '[aria-label=' + JSON.stringify(ariaLabel) + ']';
        if (tag === 'input' && placeholder) {
            return 'input[placeholder=' + JSON.stringify(placeholder) + ']';
        }
        const testId = el.getAttribute('data-testid');
        if (testId) return '[data-testid=' + JSON.stringify(testId) + ']';
        const parts = [];
        let node = el;
        while (node && node !== document.body && parts.length < 5) {
            let s = node.tagName.toLowerCase();
            if (node.id) {
                parts.unshift('#' + CSS.escape(node.id));
                break;
            }
            const parent = node.parentElement;
            if (parent) {
                const same = Array.from(parent.children).filter(c => c.tagName === node.tagName);
                if (same.length > 1) s += ':nth-of-type(' + (same.indexOf(node) + 1) + ')';
            }
            parts.unshift(s);
            node = parent;
        }
        return parts.join(' > ');
    }

    function visit(el) {
        const rect = el.getBoundingClientRect();
        if (rect.width < 2 || rect.height < 2) return;
        const style = getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden') return;
        if (parseFloat(style.opacity) < 0.1) return;
        if (__rover_viewport_only) {
            if (rect.bottom < 0 || rect.top > window.innerHeight) return;
            if (rect.right < 0 || rect.left > window.innerWidth) return;
        }

        const tag = el.tagName.toLowerCase();
        const isForm = tag === 'input' || tag === 'select' || tag === 'textarea';
        const inputType = el.getAttribute('type') || '';
        const ariaLabel = el.getAttribute('aria-label') || '';
        const placeholder = el.getAttribute('placeholder') || '';

        let text = ariaLabel;
        if (!text) {
            text = isForm ? labelFor(el) : (el.textContent || '').trim().replace(/\s+/g, ' ');
        }
        if (text.length > 60) text = text.substring(0, 57) + '...';
        if (!text && !placeholder && !isForm && !el.getAttribute('title')) return;

        const selector = selectorFor(el, tag, inputType, ariaLabel, placeholder);
        if (seen.has(selector)) return;
        seen.add(selector);

        let value = '';
        if (isForm && inputType !== 'password') {
            value = tag === 'select'
                ? ((el.options && el.options[el.selectedIndex]) || {}).value || ''
                : (el.value || '').trim();
            if (value.length > 40) value = value.substring(0, 37) + '...';
        }

        results.push({
            tag,
            role: el.getAttribute('role') || null,
            text,
            placeholder: placeholder || null,
            input_type: tag === 'input'
                ? (inputType || 'text')
                : (tag === 'select' ? 'select' : null),
            selector,
            checked: !!el.checked,
            value,
        });
    }

    function collect(root) {
        for (const node of root.querySelectorAll('*')) {
            if (node.matches(INTERACTIVE)) visit(node);
            if (node.shadowRoot) collect(node.shadowRoot);
        }
    }

    collect(document);
    return JSON.stringify(results);
})()
"#;

/// Run the observe script and return the parsed elements.
pub async fn observe(page: &Page, viewport_only: bool) -> Result<Vec<InteractiveElement>> {
    let js = format!(
        "var __rover_viewport_only = {}; {}",
        viewport_only, OBSERVE_JS
    );
    let json_str: String = page.evaluate(&js).await?;
    parse_elements(&json_str)
}

fn parse_elements(json_str: &str) -> Result<Vec<InteractiveElement>> {
    let raw: Vec<RawElement> = serde_json::from_str(json_str)?;
    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(i, r)| InteractiveElement {
            index: i,
            tag: r.tag,
            role: r.role,
            text: r.text,
            placeholder: r.placeholder,
            input_type: r.input_type,
            selector: r.selector,
            checked: r.checked,
            value: if r.value.is_empty() {
                None
            } else {
                Some(r.value)
            },
        })
        .collect())
}
