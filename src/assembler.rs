use anyhow::{Context, Result};
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, TreeSink};
use html5ever::{parse_document, Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::path::{Path, PathBuf};

use crate::aggregator::CssOrigin;
use crate::file_manager::{FileManager, CSS_DIR, INDEX_FILE};
use crate::html_parser::is_stylesheet_link;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is written exactly as parsed.
const VERBATIM_ELEMENTS: &[&str] = &[
    "script", "style", "pre", "textarea", "template", "xmp", "iframe", "noembed", "noframes",
    "noscript", "plaintext",
];

pub fn parse_html(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

fn element_name(handle: &Handle) -> Option<String> {
    match handle.data {
        NodeData::Element { ref name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attr_value(handle: &Handle, attr: &str) -> Option<String> {
    match handle.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref() == attr)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if element_name(handle).as_deref() == Some(tag) {
        return Some(handle.clone());
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn is_css_element(handle: &Handle) -> bool {
    match element_name(handle).as_deref() {
        Some("style") => true,
        Some(tag) => is_stylesheet_link(
            tag,
            attr_value(handle, "rel").as_deref(),
            attr_value(handle, "type").as_deref(),
        ),
        None => false,
    }
}

fn collect_css_elements(handle: &Handle, found: &mut Vec<Handle>) {
    for child in handle.children.borrow().iter() {
        if is_css_element(child) {
            found.push(child.clone());
        } else {
            collect_css_elements(child, found);
        }
    }
}

fn html_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(local))
}

fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
        value: StrTendril::from_slice(value),
    }
}

/// Replaces the CSS-bearing elements of the head with one stylesheet link per
/// produced CSS file. Links are appended in the order of `produced`.
pub fn rebuild_head(dom: &mut RcDom, produced: &[CssOrigin]) {
    let document = dom.document.clone();
    let Some(head) = find_element(&document, "head") else {
        tracing::warn!("document has no head, leaving it untouched");
        return;
    };

    let mut originals = Vec::new();
    collect_css_elements(&head, &mut originals);
    for element in &originals {
        tracing::debug!(tag = ?element_name(element), "removing original css element");
        dom.remove_from_parent(element);
    }

    for origin in produced {
        let href = format!("{}/{}", CSS_DIR, origin.file_name());
        let link = dom.create_element(
            html_name("link"),
            vec![
                attribute("href", &href),
                attribute("rel", "stylesheet"),
                attribute("type", "text/css"),
            ],
            ElementFlags::default(),
        );
        dom.append(&head, NodeOrText::AppendNode(link));
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('"', "&quot;")
}

fn start_tag(handle: &Handle) -> String {
    let NodeData::Element { ref name, ref attrs, .. } = handle.data else {
        return String::new();
    };
    let mut tag = format!("<{}", name.local);
    for attr in attrs.borrow().iter() {
        match attr.name.prefix {
            Some(ref prefix) => tag.push_str(&format!(" {}:{}", prefix, attr.name.local)),
            None => tag.push_str(&format!(" {}", attr.name.local)),
        }
        tag.push_str(&format!("=\"{}\"", escape_attr(&attr.value)));
    }
    tag.push('>');
    tag
}

fn write_verbatim(handle: &Handle, out: &mut String) -> Result<()> {
    let mut buffer = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    serialize(&mut buffer, &SerializableHandle::from(handle.clone()), opts)
        .context("Failed to serialize element")?;
    out.push_str(&String::from_utf8_lossy(&buffer));
    Ok(())
}

fn write_node(handle: &Handle, depth: usize, out: &mut String) -> Result<()> {
    let indent = " ".repeat(depth);
    match handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                write_node(child, depth, out)?;
            }
        }
        NodeData::Doctype { ref name, .. } => {
            out.push_str(&format!("{}<!DOCTYPE {}>\n", indent, name));
        }
        NodeData::Comment { ref contents } => {
            out.push_str(&format!("{}<!--{}-->\n", indent, contents));
        }
        NodeData::Text { ref contents } => {
            let text = contents.borrow();
            let text = text.trim();
            if !text.is_empty() {
                out.push_str(&format!("{}{}\n", indent, escape_text(text)));
            }
        }
        NodeData::ProcessingInstruction { .. } => {}
        NodeData::Element { ref name, .. } => {
            let tag = name.local.to_string();
            out.push_str(&indent);
            if VERBATIM_ELEMENTS.contains(&tag.as_str()) {
                write_verbatim(handle, out)?;
                out.push('\n');
                return Ok(());
            }

            out.push_str(&start_tag(handle));
            out.push('\n');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return Ok(());
            }
            for child in handle.children.borrow().iter() {
                write_node(child, depth + 1, out)?;
            }
            out.push_str(&format!("{}</{}>\n", indent, tag));
        }
    }
    Ok(())
}

/// Serializes the document with one node per line, indented by depth.
pub fn prettify(dom: &RcDom) -> Result<String> {
    let mut out = String::new();
    write_node(&dom.document, 0, &mut out)?;
    Ok(out)
}

/// Rebuilds the head of `html` for the produced CSS files and writes the
/// result to `index.html` under the output root.
pub fn write_index(file_manager: &FileManager, html: &str, produced: &[CssOrigin]) -> Result<PathBuf> {
    let mut dom = parse_html(html);
    rebuild_head(&mut dom, produced);
    let formatted = prettify(&dom)?;
    file_manager.save_file(Path::new(INDEX_FILE), formatted.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Test &amp; Page</title>
    <meta charset="utf-8">
    <link rel="stylesheet" href="/style.css">
    <link rel="icon" href="/favicon.ico">
    <style>body { background: url("bg.png"); }</style>
    <link type="text/css" href="https://cdn.example.com/lib.css">
    <script>if (a < b) { run(); }</script>
  </head>
  <body>
    <p class="intro">Hello <b>world</b></p>
    <style>.body-style {}</style>
  </body>
</html>"#;

    fn rebuilt(produced: &[CssOrigin]) -> String {
        let mut dom = parse_html(PAGE);
        rebuild_head(&mut dom, produced);
        prettify(&dom).unwrap()
    }

    #[test]
    fn test_rebuild_head_replaces_css_elements() {
        let html = rebuilt(&[CssOrigin::Linked, CssOrigin::Inline]);

        assert!(!html.contains("/style.css"));
        assert!(!html.contains("lib.css"));
        assert!(!html.contains(r#"url("bg.png")"#));
        assert!(html.contains(r#"<link href="css/links.css" rel="stylesheet" type="text/css">"#));
        assert!(html.contains(r#"<link href="css/styles.css" rel="stylesheet" type="text/css">"#));
        assert!(html.find("css/links.css").unwrap() < html.find("css/styles.css").unwrap());
        assert!(html.contains(r#"<link rel="icon" href="/favicon.ico">"#));
    }

    #[test]
    fn test_css_removed_even_when_not_produced() {
        let html = rebuilt(&[CssOrigin::Inline]);

        assert!(!html.contains("/style.css"));
        assert!(!html.contains("css/links.css"));
        assert_eq!(html.matches("<link href=\"css/").count(), 1);
    }

    #[test]
    fn test_body_is_untouched() {
        let html = rebuilt(&[]);

        assert!(html.contains(".body-style"));
        assert!(html.contains("<p class=\"intro\">"));
    }

    #[test]
    fn test_prettify_layout() {
        let html = rebuilt(&[CssOrigin::Inline]);

        assert!(html.starts_with("<!DOCTYPE html>\n<html>\n <head>\n  <title>\n"));
        assert!(html.contains("   Test &amp; Page\n"));
        assert!(html.contains("<script>if (a < b) { run(); }</script>"));
        assert!(html.contains("   Hello\n"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_write_index() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_manager = FileManager::new(temp_dir.path()).unwrap();

        let path = write_index(&file_manager, PAGE, &[CssOrigin::Linked]).unwrap();

        assert_eq!(path, temp_dir.path().join("index.html"));
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("css/links.css"));
    }
}
