use std::collections::HashSet;

use super::config::PolicyConfig;
use super::error::AuthzError;
use super::gate::CompiledArea;
use super::path::{PathPattern, RequestPath};
use super::principal::Principal;
use super::role::Role;
use super::routes::{RouteAccess, RouteTable};
use super::scope::{PredicateExpr, ScopeRules};

/// The validated, immutable authorization policy.
///
/// Built once at startup and shared behind an `Arc`; every method takes
/// `&self` and none of them mutate, so concurrent requests never contend.
#[derive(Debug, Clone)]
pub struct Policy {
    sign_in: String,
    public: Vec<PathPattern>,
    pub(crate) areas: Vec<CompiledArea>,
    pub(crate) routes: RouteTable,
    scopes: ScopeRules,
}

impl Policy {
    pub fn from_config(config: PolicyConfig) -> Result<Self, AuthzError> {
        let public = config
            .public
            .iter()
            .map(|raw| raw.parse::<PathPattern>())
            .collect::<Result<Vec<_>, _>>()?;

        let sign_in = RequestPath::parse(&config.sign_in_path);
        if !config.sign_in_path.starts_with('/') || sign_in.is_root() {
            return Err(AuthzError::configuration(format!(
                "sign-in path {:?} must be an absolute, non-root path",
                config.sign_in_path
            )));
        }
        if !public.iter().any(|p| p.matches(&sign_in)) {
            return Err(AuthzError::configuration(format!(
                "sign-in path {sign_in} is not public; anonymous users would loop"
            )));
        }

        let areas = compile_areas(&config, &public)?;
        let routes = RouteTable::from_config(&config.routes)?;
        if let Some(area) = areas
            .iter()
            .find(|area| !config.routes.iter().any(|route| route.roles.contains(&area.role)))
        {
            return Err(AuthzError::configuration(format!(
                "private area {} belongs to {}, which has no route table entry",
                area.home, area.role
            )));
        }
        let scopes = ScopeRules::from_config(&config.scopes)?;

        tracing::debug!(
            public = public.len(),
            private_areas = areas.len(),
            routes = routes.len(),
            scopes = scopes.len(),
            "authorization policy loaded"
        );

        Ok(Self {
            sign_in: sign_in.to_string(),
            public,
            areas,
            routes,
            scopes,
        })
    }

    /// Loads `AUTHZ_POLICY_FILE` when set, the built-in school policy otherwise.
    pub fn from_env() -> Result<Self, AuthzError> {
        Self::from_config(PolicyConfig::from_env()?)
    }

    pub fn sign_in_path(&self) -> &str {
        &self.sign_in
    }

    pub fn home_for(&self, role: Role) -> Option<&str> {
        self.areas
            .iter()
            .find(|area| area.role == role)
            .map(|area| area.home.as_str())
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn is_public(&self, path: &RequestPath) -> bool {
        self.public.iter().any(|pattern| pattern.matches(path))
    }

    /// Route table entry governing `path`, first match wins.
    pub fn lookup(&self, path: &str) -> RouteAccess<'_> {
        self.routes.lookup(&RequestPath::parse(path))
    }

    pub fn scope_for(&self, resource: &str, principal: &Principal) -> PredicateExpr {
        self.scopes.scope_for(resource, principal)
    }
}

fn compile_areas(config: &PolicyConfig, public: &[PathPattern]) -> Result<Vec<CompiledArea>, AuthzError> {
    let mut owners: HashSet<Role> = HashSet::new();
    let mut areas: Vec<CompiledArea> = Vec::with_capacity(config.private_areas.len());

    for entry in &config.private_areas {
        let covers = PathPattern::subtree(&entry.prefix)?;
        let home = RequestPath::parse(&entry.prefix);
        if home.is_root() {
            return Err(AuthzError::configuration(format!(
                "private area for {} cannot cover the whole site",
                entry.role
            )));
        }
        if !owners.insert(entry.role) {
            return Err(AuthzError::configuration(format!(
                "role {} owns more than one private area",
                entry.role
            )));
        }
        if let Some(p) = public.iter().find(|p| p.matches(&home)) {
            return Err(AuthzError::configuration(format!(
                "private area {home} is made public by pattern {p}"
            )));
        }
        if let Some(other) = areas
            .iter()
            .find(|a| a.covers.matches(&home) || covers.matches(&RequestPath::parse(&a.home)))
        {
            return Err(AuthzError::configuration(format!(
                "private areas {home} and {} overlap",
                other.home
            )));
        }

        areas.push(CompiledArea {
            home: home.to_string(),
            role: entry.role,
            covers,
        });
    }

    Ok(areas)
}
