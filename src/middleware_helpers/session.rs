use crate::config::AppConfig;
use crate::session::SessionKey;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

/// Cookie attributes for the visitor session
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub max_age_secs: u64,
    pub secure: bool,
}

impl SessionCookie {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            name: cfg.session_cookie_name.clone(),
            max_age_secs: cfg.session_ttl_secs,
            secure: cfg.is_production(),
        }
    }

    fn set_cookie_value(&self, key: &SessionKey) -> String {
        let mut value = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.name, key, self.max_age_secs
        );
        if self.secure {
            value.push_str("; Secure");
        }
        value
    }
}

/// Finds `name` among the request's `Cookie` headers
fn find_cookie(request: &Request, name: &str) -> Option<SessionKey> {
    request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| SessionKey::parse(v))
}

/// Resolves the visitor's session key from the session cookie, minting a new
/// one when the cookie is absent or malformed. Handlers read the key through
/// `Extension<SessionKey>`.
pub async fn session_middleware(
    State(cookie): State<SessionCookie>,
    mut request: Request,
    next: Next,
) -> Response {
    let (key, minted) = match find_cookie(&request, &cookie.name) {
        Some(key) => (key, false),
        None => {
            let key = SessionKey::generate();
            debug!("Issued new session key");
            (key, true)
        }
    };

    request.extensions_mut().insert(key.clone());
    let mut response = next.run(request).await;

    if minted {
        match HeaderValue::from_str(&cookie.set_cookie_value(&key)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Could not encode session cookie: {}", e),
        }
    }

    response
}
