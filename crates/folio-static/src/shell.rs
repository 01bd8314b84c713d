//! Server-rendered markup injection into the client HTML shell.

/// The element the client entry mounts into.
pub const MOUNT_PLACEHOLDER: &str = r#"<div id="root"></div>"#;

/// Global the client reads to learn which route was prerendered.
pub const SSR_GLOBAL: &str = "window.__folioSSR";

/// Whether `shell` contains the mount placeholder.
pub fn has_mount_point(shell: &str) -> bool {
    shell.contains(MOUNT_PLACEHOLDER)
}

/// Replace the mount placeholder with the route marker script and the
/// server-rendered `fragment`.
///
/// Only the first placeholder is replaced. Returns `None` when the shell has
/// no placeholder.
pub fn render_route_html(shell: &str, route_id: &str, fragment: &str) -> Option<String> {
    if !has_mount_point(shell) {
        return None;
    }

    let ssr_info = serde_json::json!({ "routePath": route_id })
        .to_string()
        .replace("</", r"<\/");
    let replacement = format!(
        "<script>{SSR_GLOBAL}={ssr_info};</script>\n<div id=\"root\">{fragment}</div>"
    );

    Some(shell.replacen(MOUNT_PLACEHOLDER, &replacement, 1))
}

/// Relative output file for a route: `/` -> `index.html`,
/// `/docs/intro` -> `docs/intro/index.html`.
///
/// `.` and `..` segments are dropped so a route can never escape the output
/// directory.
pub fn route_output_file(route_id: &str) -> std::path::PathBuf {
    let mut path = std::path::PathBuf::new();
    for segment in route_id.split('/').filter(|s| !matches!(*s, "" | "." | "..")) {
        path.push(segment);
    }
    path.push("index.html");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const SHELL: &str = r#"<html><head></head><body><div id="root"></div><script src="/_assets/app.js"></script></body></html>"#;

    #[test]
    fn injects_marker_and_fragment() {
        let html = render_route_html(SHELL, "/about", "<h1>About</h1>").unwrap();

        assert_eq!(
            html,
            r#"<html><head></head><body><script>window.__folioSSR={"routePath":"/about"};</script>
<div id="root"><h1>About</h1></div><script src="/_assets/app.js"></script></body></html>"#
        );
    }

    #[test]
    fn missing_placeholder_is_none() {
        assert_eq!(render_route_html("<div id=\"app\"></div>", "/", ""), None);
        assert!(!has_mount_point("<div id='root'></div>"));
    }

    #[test]
    fn replaces_only_first_placeholder() {
        let shell = format!("{MOUNT_PLACEHOLDER}{MOUNT_PLACEHOLDER}");

        let html = render_route_html(&shell, "/", "x").unwrap();

        assert!(html.ends_with(MOUNT_PLACEHOLDER));
        assert_eq!(html.matches("<div id=\"root\">x</div>").count(), 1);
    }

    #[test]
    fn escapes_closing_tags_in_route_id() {
        let html = render_route_html(SHELL, "/</script>", "").unwrap();

        assert!(html.contains(r#"{"routePath":"/<\/script>"}"#));
    }

    #[test]
    fn maps_routes_to_output_files() {
        assert_eq!(route_output_file("/"), PathBuf::from("index.html"));
        assert_eq!(route_output_file("/404"), PathBuf::from("404/index.html"));
        assert_eq!(
            route_output_file("/docs/intro/"),
            PathBuf::from("docs/intro/index.html")
        );
        assert_eq!(route_output_file("/../etc"), PathBuf::from("etc/index.html"));
    }
}
