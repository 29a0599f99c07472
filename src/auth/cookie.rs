//! Access-token cookie handling

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue, Uri,
};

use crate::error::AppError;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// `Set-Cookie` value carrying a freshly issued token
pub fn access_token_cookie(
    token: &str,
    secure: bool,
    max_age_secs: u64,
) -> Result<HeaderValue, AppError> {
    let secure = if secure { "; Secure" } else { "" };
    let value = format!(
        "{}={}; HttpOnly{}; Path=/; Max-Age={}; SameSite=Strict",
        ACCESS_TOKEN_COOKIE, token, secure, max_age_secs
    );

    HeaderValue::from_str(&value).map_err(|e| {
        tracing::error!("Failed to build access token cookie: {}", e);
        AppError::Internal
    })
}

/// `Set-Cookie` value instructing the client to drop the access token
pub fn clear_access_token_cookie() -> HeaderValue {
    HeaderValue::from_static("access_token=; HttpOnly; Path=/; Max-Age=0")
}

/// Read a cookie by name across all `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

/// Whether the request arrived over a secure transport
pub fn is_secure_request(uri: &Uri, headers: &HeaderMap, trust_proxy: bool) -> bool {
    if uri.scheme_str() == Some("https") {
        return true;
    }

    trust_proxy
        && headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false)
}

/// Collect every `Set-Cookie` header of a response as text
pub fn set_cookie_values(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_cookie_flags() {
        let cookie = access_token_cookie("abc.def.ghi", true, 86400).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "access_token=abc.def.ghi; HttpOnly; Secure; Path=/; Max-Age=86400; SameSite=Strict"
        );

        let cookie = access_token_cookie("abc.def.ghi", false, 60).unwrap();
        assert!(!cookie.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn test_clear_cookie() {
        let cookie = clear_access_token_cookie();
        let text = cookie.to_str().unwrap();
        assert!(text.starts_with("access_token=;"));
        assert!(text.contains("Max-Age=0"));
        assert!(text.contains("HttpOnly"));
        assert!(text.contains("Path=/"));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, "theme=dark; access_token=tok.en.value".parse().unwrap());
        headers.append(COOKIE, "other=1".parse().unwrap());

        assert_eq!(read_cookie(&headers, ACCESS_TOKEN_COOKIE).as_deref(), Some("tok.en.value"));
        assert_eq!(read_cookie(&headers, "other").as_deref(), Some("1"));
        assert!(read_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn test_is_secure_request() {
        let plain: Uri = "/login".parse().unwrap();
        let https: Uri = "https://api.example.com/login".parse().unwrap();
        let mut headers = HeaderMap::new();

        assert!(!is_secure_request(&plain, &headers, true));
        assert!(is_secure_request(&https, &headers, false));

        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert!(is_secure_request(&plain, &headers, true));
        assert!(!is_secure_request(&plain, &headers, false));
    }
}
