//! Route gate run before every admin screen.
//!
//! Checks only whether the auth cookie is present. Whether the token is
//! still good is the backend's call on the next API request.

/// Login screen
pub const LOGIN_PATH: &str = "/";

/// Where a signed-in user lands
pub const LANDING_PATH: &str = "/dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// Decide what happens to a request for `path`
///
/// - no cookie, any path but `/` → back to `/`
/// - cookie, on `/` → on to the dashboard
/// - anything else goes through
pub fn gate(path: &str, cookie_present: bool) -> GateDecision {
    let path = normalize(path);

    if is_passthrough(&path) {
        return GateDecision::Allow;
    }

    let on_login = path == LOGIN_PATH;
    match (cookie_present, on_login) {
        (false, false) => GateDecision::Redirect(LOGIN_PATH.to_string()),
        (true, true) => GateDecision::Redirect(LANDING_PATH.to_string()),
        _ => GateDecision::Allow,
    }
}

/// Strip query/fragment and trailing slashes; empty becomes `/`
fn normalize(path: &str) -> String {
    let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        LOGIN_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// File extensions served as static assets
const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "css", "js", "map", "woff", "woff2",
    "ttf", "txt", "json", "xml",
];

/// Framework internals and static files never hit the gate
fn is_passthrough(path: &str) -> bool {
    if path.starts_with("/_next/") || path.starts_with("/static/") || path == "/favicon.ico" {
        return true;
    }
    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .is_some_and(|(stem, ext)| {
            !stem.is_empty() && ASSET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_out_is_sent_to_login() {
        assert_eq!(
            gate("/bookings", false),
            GateDecision::Redirect("/".to_string())
        );
        assert_eq!(
            gate("/property/p1/edit?tab=images", false),
            GateDecision::Redirect("/".to_string())
        );
    }

    #[test]
    fn test_signed_out_may_see_login() {
        assert_eq!(gate("/", false), GateDecision::Allow);
        assert_eq!(gate("", false), GateDecision::Allow);
    }

    #[test]
    fn test_signed_in_skips_login() {
        assert_eq!(
            gate("/", true),
            GateDecision::Redirect("/dashboard".to_string())
        );
        assert_eq!(
            gate("/?next=x", true),
            GateDecision::Redirect("/dashboard".to_string())
        );
    }

    #[test]
    fn test_signed_in_reaches_screens() {
        assert_eq!(gate("/dashboard", true), GateDecision::Allow);
        assert_eq!(gate("/reviews/", true), GateDecision::Allow);
    }

    #[test]
    fn test_static_assets_pass() {
        assert_eq!(gate("/_next/static/chunk.js", false), GateDecision::Allow);
        assert_eq!(gate("/favicon.ico", false), GateDecision::Allow);
        assert_eq!(gate("/images/logo.png", false), GateDecision::Allow);
        assert_eq!(gate("/robots.txt", false), GateDecision::Allow);
    }

    #[test]
    fn test_dotted_screen_path_is_gated() {
        assert_eq!(
            gate("/users/john.doe", false),
            GateDecision::Redirect("/".to_string())
        );
        assert_eq!(
            gate("/property/cliff.house/edit", false),
            GateDecision::Redirect("/".to_string())
        );
        assert_eq!(gate("/users/john.doe", true), GateDecision::Allow);
    }

    #[test]
    fn test_relative_path_is_normalized() {
        assert_eq!(gate("users", false), GateDecision::Redirect("/".to_string()));
    }
}
