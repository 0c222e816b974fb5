//! Declarative route authorization.
//!
//! An ordered list of `(method, path pattern, requirement)` rules. The first
//! rule matching a request decides; requests no rule matches need an
//! authenticated principal.
//!
//! Pattern syntax: `*` and `{name}` match exactly one path segment, `**`
//! matches any number of trailing segments (including none). A trailing `/`
//! on either side is ignored.

use http::Method;

use super::AuthError;
use crate::models::auth::{Principal, Role};

/// What a route demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Public,
    AuthenticatedAny,
    RequiresRole(Role),
    RequiresAnyRole(Vec<Role>),
}

static FAIL_CLOSED: Requirement = Requirement::AuthenticatedAny;

impl Requirement {
    /// `Unauthenticated` when a principal is needed but absent,
    /// `InsufficientRole` when one is present without the role.
    pub fn check(&self, principal: Option<&Principal>) -> Result<(), AuthError> {
        let principal = match (self, principal) {
            (Requirement::Public, _) => return Ok(()),
            (_, None) => return Err(AuthError::Unauthenticated),
            (_, Some(p)) => p,
        };
        match self {
            Requirement::Public | Requirement::AuthenticatedAny => Ok(()),
            Requirement::RequiresRole(role) if principal.has_role(*role) => Ok(()),
            Requirement::RequiresRole(role) => Err(AuthError::InsufficientRole(format!(
                "Access denied: requires role {role}"
            ))),
            Requirement::RequiresAnyRole(roles) if principal.has_any_role(roles) => Ok(()),
            Requirement::RequiresAnyRole(roles) => {
                let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
                Err(AuthError::InsufficientRole(format!(
                    "Access denied: requires one of {}",
                    names.join(", ")
                )))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    One,
    Rest,
}

/// Compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|s| match s {
                "**" => Segment::Rest,
                "*" => Segment::One,
                s if s.starts_with('{') && s.ends_with('}') => Segment::One,
                s => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            source: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = split(path).collect();
        let mut i = 0;
        for seg in &self.segments {
            match seg {
                Segment::Rest => return true,
                Segment::One if i < path.len() => {}
                Segment::Literal(lit) if i < path.len() && path[i] == lit => {}
                _ => return false,
            }
            i += 1;
        }
        i == path.len()
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone)]
struct Rule {
    method: Option<Method>,
    pattern: PathPattern,
    requirement: Requirement,
}

/// First-match rule table.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: Vec<Rule>,
}

impl AccessPolicy {
    /// An empty policy: every request needs authentication.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule restricted to `method`.
    pub fn rule(mut self, method: Method, pattern: &str, requirement: Requirement) -> Self {
        self.rules.push(Rule {
            method: Some(method),
            pattern: PathPattern::parse(pattern),
            requirement,
        });
        self
    }

    /// Append a rule for every method.
    pub fn any(mut self, pattern: &str, requirement: Requirement) -> Self {
        self.rules.push(Rule {
            method: None,
            pattern: PathPattern::parse(pattern),
            requirement,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Requirement of the first matching rule, or `AuthenticatedAny`.
    pub fn requirement(&self, method: &Method, path: &str) -> &Requirement {
        self.rules
            .iter()
            .find(|r| r.method.as_ref().is_none_or(|m| m == method) && r.pattern.matches(path))
            .map(|r| &r.requirement)
            .unwrap_or(&FAIL_CLOSED)
    }

    pub fn check(
        &self,
        method: &Method,
        path: &str,
        principal: Option<&Principal>,
    ) -> Result<(), AuthError> {
        self.requirement(method, path).check(principal)
    }

    /// The platform's route table.
    pub fn default_rules() -> Self {
        use Requirement::*;
        let admin = || RequiresRole(Role::Admin);
        let user = || RequiresRole(Role::User);
        let user_or_admin = || RequiresAnyRole(vec![Role::User, Role::Admin]);

        Self::new()
            .any("/error", Public)
            .any("/health", Public)
            .any("/actuator/health", Public)
            .any("/api/users/register", Public)
            .any("/api/users/login", Public)
            .any("/api/users/refresh-token", Public)
            .rule(Method::GET, "/api/categories/**", Public)
            .rule(Method::POST, "/api/posts/*/comments", user())
            .rule(Method::POST, "/api/comments/*/replies", user())
            .rule(Method::GET, "/api/posts/*/comments", Public)
            .rule(Method::GET, "/api/comments/*", Public)
            .rule(Method::PUT, "/api/comments/*", AuthenticatedAny)
            .rule(Method::DELETE, "/api/comments/*", AuthenticatedAny)
            .rule(Method::GET, "/api/category/{categoryId}/posts", Public)
            .rule(Method::GET, "/api/user/{userId}/posts", Public)
            .rule(Method::GET, "/api/posts/**", Public)
            .rule(Method::GET, "/api/dashboard/**", Public)
            .any("/api/notifications/**", AuthenticatedAny)
            .any("/api/saved-posts/**", AuthenticatedAny)
            .rule(Method::GET, "/api/users/", admin())
            .rule(Method::GET, "/api/users/{userId}", AuthenticatedAny)
            .rule(Method::POST, "/api/users/profile-image/upload/*", AuthenticatedAny)
            .rule(Method::GET, "/api/users/profile-image/*", Public)
            .rule(Method::PUT, "/api/posts/**", user())
            .rule(Method::DELETE, "/api/posts/**", user_or_admin())
            .rule(Method::DELETE, "/api/comments/**", user_or_admin())
            .rule(Method::PUT, "/api/users/{userId}", AuthenticatedAny)
            .rule(Method::DELETE, "/api/users/{userId}", admin())
            .any("/api/categories/**", admin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Principal {
        Principal::new("alice@example.com", 1, [Role::User])
    }

    fn admin() -> Principal {
        Principal::new("boss@admin.com", 2, [Role::Admin])
    }

    #[test]
    fn pattern_wildcards() {
        let one = PathPattern::parse("/api/posts/*/comments");
        assert!(one.matches("/api/posts/7/comments"));
        assert!(one.matches("/api/posts/7/comments/"));
        assert!(!one.matches("/api/posts/comments"));
        assert!(!one.matches("/api/posts/7/8/comments"));

        let named = PathPattern::parse("/api/users/{userId}");
        assert!(named.matches("/api/users/9"));
        assert!(!named.matches("/api/users"));
        assert!(!named.matches("/api/users/9/extra"));

        let rest = PathPattern::parse("/api/posts/**");
        assert!(rest.matches("/api/posts"));
        assert!(rest.matches("/api/posts/search"));
        assert!(rest.matches("/api/posts/1/comments"));
        assert!(!rest.matches("/api/postsX"));
    }

    #[test]
    fn unmatched_requests_fail_closed() {
        let policy = AccessPolicy::new();
        assert_eq!(
            policy.requirement(&Method::GET, "/anything"),
            &Requirement::AuthenticatedAny
        );
        assert!(matches!(
            policy.check(&Method::GET, "/anything", None),
            Err(AuthError::Unauthenticated)
        ));
        assert!(policy.check(&Method::GET, "/anything", Some(&user())).is_ok());
    }

    #[test]
    fn first_match_wins() {
        let policy = AccessPolicy::new()
            .rule(Method::GET, "/a/**", Requirement::Public)
            .any("/a/b", Requirement::RequiresRole(Role::Admin));
        assert!(policy.check(&Method::GET, "/a/b", None).is_ok());
        assert!(matches!(
            policy.check(&Method::POST, "/a/b", Some(&user())),
            Err(AuthError::InsufficientRole(_))
        ));
    }

    #[test]
    fn public_surfaces_need_no_principal() {
        let policy = AccessPolicy::default_rules();
        for (method, path) in [
            (Method::POST, "/api/users/register"),
            (Method::POST, "/api/users/login"),
            (Method::POST, "/api/users/refresh-token"),
            (Method::GET, "/api/categories"),
            (Method::GET, "/api/categories/3"),
            (Method::GET, "/api/posts"),
            (Method::GET, "/api/posts/5"),
            (Method::GET, "/api/posts/search"),
            (Method::GET, "/api/posts/5/comments"),
            (Method::GET, "/api/comments/8"),
            (Method::GET, "/api/category/2/posts"),
            (Method::GET, "/api/user/2/posts"),
            (Method::GET, "/health"),
        ] {
            assert!(
                policy.check(&method, path, None).is_ok(),
                "{method} {path} should be public"
            );
        }
    }

    #[test]
    fn admin_only_surfaces() {
        let policy = AccessPolicy::default_rules();
        for (method, path) in [
            (Method::GET, "/api/users"),
            (Method::GET, "/api/users/"),
            (Method::DELETE, "/api/users/4"),
            (Method::POST, "/api/categories"),
            (Method::PUT, "/api/categories/1"),
            (Method::DELETE, "/api/categories/1"),
        ] {
            assert!(matches!(
                policy.check(&method, path, None),
                Err(AuthError::Unauthenticated)
            ));
            assert!(
                matches!(
                    policy.check(&method, path, Some(&user())),
                    Err(AuthError::InsufficientRole(_))
                ),
                "{method} {path} should reject USER"
            );
            assert!(policy.check(&method, path, Some(&admin())).is_ok());
        }
    }

    #[test]
    fn role_gated_writes() {
        let policy = AccessPolicy::default_rules();
        assert!(policy.check(&Method::POST, "/api/posts/1/comments", Some(&user())).is_ok());
        assert!(matches!(
            policy.check(&Method::POST, "/api/posts/1/comments", Some(&admin())),
            Err(AuthError::InsufficientRole(_))
        ));
        assert!(policy.check(&Method::DELETE, "/api/posts/1", Some(&admin())).is_ok());
        assert!(policy.check(&Method::DELETE, "/api/posts/1", Some(&user())).is_ok());
        assert!(matches!(
            policy.check(&Method::PUT, "/api/posts/1", Some(&admin())),
            Err(AuthError::InsufficientRole(_))
        ));
    }

    #[test]
    fn comment_mutations_need_only_authentication() {
        let policy = AccessPolicy::default_rules();
        assert!(matches!(
            policy.check(&Method::DELETE, "/api/comments/3", None),
            Err(AuthError::Unauthenticated)
        ));
        assert!(policy.check(&Method::DELETE, "/api/comments/3", Some(&admin())).is_ok());
        assert!(policy.check(&Method::PUT, "/api/comments/3", Some(&user())).is_ok());
    }

    #[test]
    fn unlisted_paths_require_authentication() {
        let policy = AccessPolicy::default_rules();
        assert!(matches!(
            policy.check(&Method::POST, "/api/user/1/category/2/posts", None),
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            policy.check(&Method::GET, "/nope", None),
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            policy.check(&Method::POST, "/api/users/logout", None),
            Err(AuthError::Unauthenticated)
        ));
    }
}
