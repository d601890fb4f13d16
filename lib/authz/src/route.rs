//! Static per-route access requirements.
//!
//! The table is built once at startup and keyed by the router's matched path
//! template (for example `/teams/{team_id}/members`). Routes that are not
//! registered are not gated.

use league_gate_core::TeamId;
use league_gate_platform_access::TeamRole;
use std::collections::BTreeMap;
use tracing::warn;

/// Default name of the route parameter carrying the team id.
pub const DEFAULT_TEAM_PARAM: &str = "team_id";

/// What a caller must prove to reach a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any valid session.
    Authenticated,
    /// At least `minimum` within the team named by `team_param`.
    TeamRole {
        minimum: TeamRole,
        team_param: &'static str,
    },
    /// A global administrator.
    GlobalAdmin,
}

/// Requirement attached to one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRequirement {
    access: Access,
    allow_shared_secret: bool,
}

impl RouteRequirement {
    /// Requires a valid session and nothing else.
    #[must_use]
    pub const fn authenticated() -> Self {
        Self {
            access: Access::Authenticated,
            allow_shared_secret: false,
        }
    }

    /// Requires at least `minimum` in the team bound to `team_id`.
    #[must_use]
    pub const fn team_role(minimum: TeamRole) -> Self {
        Self::team_role_in(minimum, DEFAULT_TEAM_PARAM)
    }

    /// Requires at least `minimum` in the team bound to `team_param`.
    #[must_use]
    pub const fn team_role_in(minimum: TeamRole, team_param: &'static str) -> Self {
        Self {
            access: Access::TeamRole {
                minimum,
                team_param,
            },
            allow_shared_secret: false,
        }
    }

    /// Requires a global administrator.
    #[must_use]
    pub const fn global_admin() -> Self {
        Self {
            access: Access::GlobalAdmin,
            allow_shared_secret: false,
        }
    }

    /// Marks the route as reachable with the shared administrative secret.
    #[must_use]
    pub const fn with_shared_secret(mut self) -> Self {
        self.allow_shared_secret = true;
        self
    }

    /// Returns the access rule.
    #[must_use]
    pub const fn access(&self) -> Access {
        self.access
    }

    /// Returns true if the shared secret is accepted on this route.
    #[must_use]
    pub const fn allows_shared_secret(&self) -> bool {
        self.allow_shared_secret
    }

    /// Returns the minimum team role, for team-scoped routes.
    #[must_use]
    pub const fn minimum_role(&self) -> Option<TeamRole> {
        match self.access {
            Access::TeamRole { minimum, .. } => Some(minimum),
            Access::Authenticated | Access::GlobalAdmin => None,
        }
    }
}

/// Route template to requirement map.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, RouteRequirement>,
}

impl RouteTable {
    /// Starts an empty table.
    #[must_use]
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Returns the requirement registered for `route`.
    #[must_use]
    pub fn requirement(&self, route: &str) -> Option<&RouteRequirement> {
        self.routes.get(route)
    }

    /// Lists every registered route in template order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &RouteRequirement)> {
        self.routes.iter().map(|(route, req)| (route.as_str(), req))
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Builder for [`RouteTable`].
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: BTreeMap<String, RouteRequirement>,
}

impl RouteTableBuilder {
    /// Registers `requirement` for `route`. A later registration replaces an
    /// earlier one.
    #[must_use]
    pub fn route(mut self, route: impl Into<String>, requirement: RouteRequirement) -> Self {
        let route = route.into();
        if let Access::TeamRole { team_param, .. } = requirement.access {
            if !route.contains(&format!("{{{team_param}}}")) {
                warn!(route = %route, team_param, "team parameter not present in route template");
            }
        }
        if self.routes.insert(route.clone(), requirement).is_some() {
            warn!(route = %route, "route requirement registered twice");
        }
        self
    }

    /// Finishes the table.
    #[must_use]
    pub fn build(self) -> RouteTable {
        RouteTable {
            routes: self.routes,
        }
    }
}

/// Finds a team id by scanning `path` for a `teams/<id>` segment pair.
///
/// This is the fallback when the route exposes no team parameter. If the
/// path names more than one distinct team the result is `None`.
#[must_use]
pub fn scan_team_id(path: &str) -> Option<TeamId> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut found: Option<&str> = None;

    for pair in segments.windows(2) {
        if pair[0].eq_ignore_ascii_case("teams") {
            match found {
                None => found = Some(pair[1]),
                Some(existing) if existing == pair[1] => {}
                Some(_) => return None,
            }
        }
    }

    found.and_then(|id| id.parse().ok())
}
