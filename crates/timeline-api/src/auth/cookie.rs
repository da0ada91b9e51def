//! The `session` cookie carrying the login token

use timeline_core::constants::SESSION_COOKIE;

/// `Set-Cookie` value for a fresh session
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session
pub fn expired_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        SESSION_COOKIE
    )
}

/// Token from a `Cookie` request header, if a non-empty session is present
pub fn session_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_cookie_header() {
        assert_eq!(
            session_from_cookie_header("theme=dark; session=abc.def; other=1"),
            Some("abc.def")
        );
        assert_eq!(session_from_cookie_header("session="), None);
        assert_eq!(session_from_cookie_header("sessionid=x"), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("tok", 60, true);
        assert!(cookie.starts_with("session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("; Secure"));
        assert!(!session_cookie("tok", 60, false).contains("Secure"));
        assert!(expired_session_cookie().contains("Max-Age=0"));
    }
}
