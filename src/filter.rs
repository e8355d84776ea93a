use crate::parse::Endpoint;
use std::collections::BTreeSet;

/// Which endpoints to keep by authentication evidence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuthFilter {
    #[default]
    Any,
    Authenticated,
    Unauthenticated,
}

impl std::str::FromStr for AuthFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(AuthFilter::Any),
            "authenticated" | "auth" => Ok(AuthFilter::Authenticated),
            "unauthenticated" | "no-auth" => Ok(AuthFilter::Unauthenticated),
            _ => Err(format!("unknown auth filter: {s}")),
        }
    }
}

impl std::fmt::Display for AuthFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthFilter::Any => write!(f, "any"),
            AuthFilter::Authenticated => write!(f, "authenticated"),
            AuthFilter::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

/// Post-analysis endpoint filters. Verbs are stored upper-case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointFilter {
    pub include_verbs: BTreeSet<String>,
    pub exclude_verbs: BTreeSet<String>,
    pub auth: AuthFilter,
}

impl EndpointFilter {
    pub fn new<I, S>(include_verbs: I, exclude_verbs: I, auth: AuthFilter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            include_verbs: normalize_verbs(include_verbs),
            exclude_verbs: normalize_verbs(exclude_verbs),
            auth,
        }
    }

    /// True when no filter would drop anything.
    pub fn is_noop(&self) -> bool {
        self.include_verbs.is_empty() && self.exclude_verbs.is_empty() && self.auth == AuthFilter::Any
    }

    pub fn keeps(&self, endpoint: &Endpoint) -> bool {
        let verb = endpoint.http_method.to_uppercase();
        if !self.include_verbs.is_empty() && !self.include_verbs.contains(&verb) {
            return false;
        }
        if self.exclude_verbs.contains(&verb) {
            return false;
        }
        match self.auth {
            AuthFilter::Any => true,
            AuthFilter::Authenticated => endpoint.is_authenticated(),
            AuthFilter::Unauthenticated => !endpoint.is_authenticated(),
        }
    }

    pub fn apply(&self, endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
        endpoints.into_iter().filter(|e| self.keeps(e)).collect()
    }
}

fn normalize_verbs<I, S>(verbs: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    verbs
        .into_iter()
        .map(|v| v.as_ref().trim().to_uppercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Split a comma-separated option value, dropping empty items.
pub fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
