//! Style helpers shared by the printers.

use sha2::{Digest, Sha256};

pub const SCOPE_PREFIX: &str = "data-tsr-";

/// Deterministic scope attribute for one component's styles, e.g. `data-tsr-1a2b3c4d`.
pub fn scope_id(component: &str, styles: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(component.as_bytes());
    hasher.update([0]);
    hasher.update(styles.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}{}", SCOPE_PREFIX, &digest[..8])
}

/// Restricts every style rule to the element carrying `scope` and its descendants.
///
/// `p { color: red; }` becomes `:where([scope], [scope] *):is(p) { color: red; }`, so the
/// marked root elements match their own selectors. Rules inside `@media`, `@supports`,
/// `@container` and `@layer` blocks are scoped too; other at-rules are kept as written.
pub fn scope_styles(scope: &str, styles: &str) -> String {
    let prefix = format!(":where([{0}], [{0}] *)", scope);
    scope_rules(&prefix, styles)
}

const GROUPING_RULES: &[&str] = &["@media", "@supports", "@container", "@layer"];

fn scope_rules(prefix: &str, css: &str) -> String {
    let mut rules = Vec::new();
    let mut rest = css.trim();
    while !rest.is_empty() {
        let Some(stop) = find_top_level(rest, b"{;") else {
            rules.push(rest.to_string());
            break;
        };
        if rest.as_bytes()[stop] == b';' {
            // Statement at-rule such as `@import url(a.css);`.
            rules.push(rest[..=stop].to_string());
            rest = rest[stop + 1..].trim_start();
            continue;
        }
        let Some(close) = block_end(rest.as_bytes(), stop) else {
            rules.push(rest.to_string());
            break;
        };
        let prelude = rest[..stop].trim();
        let body = &rest[stop + 1..close];
        let rule = if GROUPING_RULES.iter().any(|r| prelude.starts_with(r)) {
            format!("{} {{ {} }}", prelude, scope_rules(prefix, body))
        } else if prelude.starts_with('@') {
            rest[..=close].to_string()
        } else {
            format!("{} {{{}}}", scope_selector_list(prefix, prelude), body)
        };
        rules.push(rule);
        rest = rest[close + 1..].trim_start();
    }
    rules.join(" ")
}

fn scope_selector_list(prefix: &str, list: &str) -> String {
    let mut selectors = Vec::new();
    let mut rest = list;
    while let Some(comma) = find_top_level(rest, b",") {
        selectors.push(scope_selector(prefix, &rest[..comma]));
        rest = &rest[comma + 1..];
    }
    selectors.push(scope_selector(prefix, rest));
    selectors.join(", ")
}

/// Pseudo-elements cannot sit inside `:is()`, so they stay after it.
fn scope_selector(prefix: &str, selector: &str) -> String {
    let selector = selector.trim();
    let (base, pseudo) = match selector.find("::") {
        Some(i) => selector.split_at(i),
        None => (selector, ""),
    };
    if base.trim().is_empty() {
        format!("{}{}", prefix, pseudo)
    } else {
        format!("{}:is({}){}", prefix, base.trim(), pseudo)
    }
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map(|p| start + 2 + p + 2)
        .unwrap_or(bytes.len())
}

/// First of `targets` outside strings, comments and brackets.
fn find_top_level(text: &str, targets: &[u8]) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_comment(bytes, i),
            b if depth == 0 && targets.contains(&b) => return Some(i),
            b'(' | b'[' | b'{' => {
                depth += 1;
                i += 1;
            }
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// Index of the `}` closing the block opened at `open`.
fn block_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_comment(bytes, i),
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// Escapes text for the inside of a template literal.
pub fn escape_template_literal(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}
