use anyhow::{Context, Result};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Matches the target of a `url(...)` that ends in `.<ext>`, optionally
/// followed by query or fragment noise. The opening (`url(`, whitespace and a
/// single quote) is captured separately so rewriting only touches `target`.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<open>url\(\s*["']?)(?P<target>[^)"'\s]+\.(?P<ext>\w+)[^)"'\s]*)"#)
        .expect("url pattern is valid")
});

/// Browsers the beautified output must keep working in. Below these versions
/// lightningcss prints `min-width`/`max-width` media features and `rgba()`
/// instead of range syntax and 8-digit hex colors.
const LEGACY_BROWSERS: Browsers = Browsers {
    android: Some(4 << 16),
    chrome: Some(49 << 16),
    edge: Some(16 << 16),
    firefox: Some(45 << 16),
    ie: Some(11 << 16),
    ios_saf: Some(9 << 16),
    opera: Some(36 << 16),
    safari: Some(9 << 16),
    samsung: Some(5 << 16),
};

static BASENAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w-]+\.\w+").expect("basename pattern is valid"));

/// A resource referenced from CSS text, as written in the stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    pub reference: String,
    pub extension: String,
}

impl ResourceReference {
    pub fn new(reference: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            extension: extension.into(),
        }
    }

    pub fn basename(&self) -> String {
        basename(&self.reference)
    }

    /// Path of the localized copy, relative to the `css/` folder.
    pub fn local_path(&self) -> String {
        format!("resources/{}/{}", self.extension, self.basename())
    }

    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let target = caps.name("target")?.as_str();
        if is_data_uri(target) {
            return None;
        }
        let extension = caps.name("ext")?.as_str();
        Some(Self::new(target, extension))
    }
}

fn is_data_uri(target: &str) -> bool {
    target
        .get(..5)
        .map(|prefix| prefix.eq_ignore_ascii_case("data:"))
        .unwrap_or(false)
}

/// Scans `css` for resource references in document order. `data:` URIs are
/// never returned.
pub fn extract_references(css: &str) -> impl Iterator<Item = ResourceReference> + '_ {
    URL_PATTERN
        .captures_iter(css)
        .filter_map(|caps| ResourceReference::from_captures(&caps))
}

/// Rewrites every reference `extract_references` would return to its
/// `resources/<ext>/<basename>` location. Everything else is left untouched.
pub fn rewrite_references(css: &str) -> String {
    URL_PATTERN
        .replace_all(css, |caps: &Captures<'_>| {
            match ResourceReference::from_captures(caps) {
                Some(reference) => format!("{}{}", &caps["open"], reference.local_path()),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Rewrites the references of the CSS file at `path` in place.
pub fn rewrite_file(path: &Path) -> Result<()> {
    let css = fs::read_to_string(path)
        .with_context(|| format!("Failed to read CSS file: {:?}", path))?;
    let rewritten = rewrite_references(&css);
    fs::write(path, rewritten)
        .with_context(|| format!("Failed to write CSS file: {:?}", path))?;
    Ok(())
}

/// File name used for the localized copy of `reference`.
///
/// Takes the last `/`-separated segment and cuts it right after the first
/// `name.ext` run, which drops query strings (`a.woff2?v=2` -> `a.woff2`).
/// Segments without such a run are returned unchanged.
pub fn basename(reference: &str) -> String {
    let segment = reference.rsplit('/').next().unwrap_or(reference);
    match BASENAME_PATTERN.find(segment) {
        Some(m) => segment[..m.end()].to_string(),
        None => segment.to_string(),
    }
}

/// Pretty-prints a stylesheet for legacy browser targets. Input lightningcss
/// cannot make sense of is returned unchanged.
pub fn beautify(css: &str) -> String {
    let options = ParserOptions {
        error_recovery: true,
        ..ParserOptions::default()
    };
    let printed = StyleSheet::parse(css, options)
        .ok()
        .and_then(|stylesheet| {
            stylesheet
                .to_css(PrinterOptions {
                    targets: Targets::from(LEGACY_BROWSERS),
                    ..PrinterOptions::default()
                })
                .ok()
        });

    match printed {
        Some(result) => result.code,
        None => {
            tracing::debug!("lightningcss could not parse stylesheet, keeping it verbatim");
            css.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_references_in_order() {
        let css = r#"
            @font-face { src: url("fonts/a.woff2") format("woff2"), url('fonts/a.woff') format("woff"); }
            .hero { background: url(/img/hero.jpg) no-repeat; }
            .icon { background-image: url("https://cdn.example.com/icons/star.svg"); }
        "#;

        let refs: Vec<_> = extract_references(css).collect();

        assert_eq!(
            refs,
            vec![
                ResourceReference::new("fonts/a.woff2", "woff2"),
                ResourceReference::new("fonts/a.woff", "woff"),
                ResourceReference::new("/img/hero.jpg", "jpg"),
                ResourceReference::new("https://cdn.example.com/icons/star.svg", "svg"),
            ]
        );
    }

    #[test]
    fn test_extension_skips_query_noise() {
        let refs: Vec<_> =
            extract_references("src: url(https://cdn.example.com/fonts/a.woff2?v=2);").collect();

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].reference, "https://cdn.example.com/fonts/a.woff2?v=2");
        assert_eq!(refs[0].extension, "woff2");
    }

    #[test]
    fn test_data_uris_are_never_extracted() {
        let css = r#"
            a { background: url(data:image/png;base64,iVBORw0KGgo.AAAA); }
            b { background: url("data:image/svg+xml;utf8,<svg.xml>"); }
            c { background: url('DATA:image/gif;base64,R0lG.ODlh'); }
            d { background: url("real.gif"); }
        "#;

        let refs: Vec<_> = extract_references(css).collect();

        assert_eq!(refs, vec![ResourceReference::new("real.gif", "gif")]);
    }

    #[test]
    fn test_references_without_extension_are_ignored() {
        let css = "a { background: url(#gradient); } b { mask: url(/api/mask); }";

        assert_eq!(extract_references(css).count(), 0);
    }

    #[test]
    fn test_whitespace_inside_url() {
        let refs: Vec<_> = extract_references("a { background: url( 'x/y.png' ); }").collect();

        assert_eq!(refs, vec![ResourceReference::new("x/y.png", "png")]);
    }

    #[test]
    fn test_basename() {
        let test_cases = vec![
            ("bg.png", "bg.png"),
            ("/img/bg.png", "bg.png"),
            ("https://cdn.example.com/fonts/a.woff2?v=2", "a.woff2"),
            ("fonts/icons.eot?#iefix", "icons.eot"),
            ("../img/logo-dark.svg#logo", "logo-dark.svg"),
            ("img/@2x.png", "@2x.png"),
            ("jquery.min.css", "jquery.min"),
            ("no-extension", "no-extension"),
        ];

        for (input, expected) in test_cases {
            assert_eq!(basename(input), expected, "Failed for input: {}", input);
        }
    }

    #[test]
    fn test_local_path() {
        let reference = ResourceReference::new("https://cdn.example.com/fonts/a.woff2?v=2", "woff2");

        assert_eq!(reference.local_path(), "resources/woff2/a.woff2");
    }

    #[test]
    fn test_rewrite_references() {
        let css = r#"body { background: url("bg.png"); }
@font-face { src: url(https://cdn.example.com/fonts/a.woff2?v=2) format("woff2"); }
.x { background: url(data:image/png;base64,AAAA.BBBB); }"#;

        let rewritten = rewrite_references(css);

        assert!(rewritten.contains(r#"url("resources/png/bg.png")"#));
        assert!(rewritten.contains("url(resources/woff2/a.woff2) format"));
        assert!(rewritten.contains("url(data:image/png;base64,AAAA.BBBB)"));
    }

    #[test]
    fn test_every_extracted_reference_is_rewritten() {
        let css = r#"a { background: url('../img/a.png'); } b { background: url(//cdn.example.com/b.jpg?x=1); }"#;
        let expected: Vec<String> = extract_references(css).map(|r| r.local_path()).collect();

        let rewritten = rewrite_references(css);
        let targets: Vec<String> = extract_references(&rewritten).map(|r| r.reference).collect();

        assert_eq!(targets, expected);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let css = r#"a { background: url("img/a.png?v=3"); } b { src: url(fonts/b.ttf); }"#;

        let once = rewrite_references(css);
        let twice = rewrite_references(&once);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_rewrite_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("styles.css");
        fs::write(&path, r#"body { background: url("bg.png"); }"#).unwrap();

        rewrite_file(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, r#"body { background: url("resources/png/bg.png"); }"#);
    }

    #[test]
    fn test_beautify_keeps_legacy_syntax() {
        let formatted = beautify(
            "@media screen and (min-width:768px) and (max-width:1024px){a{color:rgba(0,0,0,.5)}}",
        );

        assert!(formatted.contains("min-width: 768px"), "got: {}", formatted);
        assert!(formatted.contains("max-width: 1024px"), "got: {}", formatted);
        assert!(!formatted.contains(">="), "got: {}", formatted);
        assert!(!formatted.contains("<="), "got: {}", formatted);
        assert!(formatted.contains("rgba("), "got: {}", formatted);
        assert!(!formatted.contains("#00000080"), "got: {}", formatted);
    }

    #[test]
    fn test_beautify_formats_rules() {
        let formatted = beautify("body{color:red;background:url(bg.png)}");

        assert!(formatted.contains("body {"));
        assert!(formatted.contains('\n'));
        assert_eq!(extract_references(&formatted).count(), 1);
    }
}
