//! Navigation boundary between public, auth and protected views.

const LOGIN_PATH: &str = "/login";
const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    /// `from` holds the path the caller tried to reach, as given.
    RedirectToLogin { from: String },
    RedirectToDashboard,
}

impl RouteDecision {
    pub fn redirect_target(&self, guard: &RouteGuard) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin { from } => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("from", from)
                    .finish();
                Some(format!("{}?{query}", guard.login_path))
            }
            Self::RedirectToDashboard => Some(guard.dashboard_path.clone()),
        }
    }
}

/// Pure per-navigation predicate. Never fetches data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteGuard {
    login_path: String,
    dashboard_path: String,
    auth_pages: Vec<String>,
    public_exact: Vec<String>,
    public_prefixes: Vec<String>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            login_path: LOGIN_PATH.to_owned(),
            dashboard_path: DASHBOARD_PATH.to_owned(),
            auth_pages: vec![LOGIN_PATH.to_owned(), "/register".to_owned()],
            public_exact: vec!["/".to_owned()],
            public_prefixes: vec!["/_next".to_owned(), "/static".to_owned(), "/api".to_owned()],
        }
    }
}

impl RouteGuard {
    pub fn with_public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefixes.push(prefix.into());
        self
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn dashboard_path(&self) -> &str {
        &self.dashboard_path
    }

    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize(path);
        self.public_exact.iter().any(|exact| exact == path)
            || self
                .public_prefixes
                .iter()
                .any(|prefix| has_segment_prefix(path, prefix))
    }

    pub fn is_auth_page(&self, path: &str) -> bool {
        let path = normalize(path);
        self.auth_pages.iter().any(|page| page == path)
    }

    pub fn is_protected(&self, path: &str) -> bool {
        !self.is_public(path) && !self.is_auth_page(path)
    }

    pub fn evaluate(&self, path: &str, authenticated: bool) -> RouteDecision {
        if self.is_public(path) {
            return RouteDecision::Allow;
        }

        if self.is_auth_page(path) {
            return if authenticated {
                RouteDecision::RedirectToDashboard
            } else {
                RouteDecision::Allow
            };
        }

        if authenticated {
            RouteDecision::Allow
        } else {
            RouteDecision::RedirectToLogin {
                from: path.to_owned(),
            }
        }
    }
}

fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
