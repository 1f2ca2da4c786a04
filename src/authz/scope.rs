//! Row-scoping policy.
//!
//! Every resource read goes through [`ScopeRules::scope_for`], which turns a
//! `(resource, principal)` pair into a declarative [`PredicateExpr`]. The
//! persistence layer compiles that predicate and ANDs it onto its query; this
//! module never touches the database.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::AuthzError;
use super::principal::Principal;
use super::role::Role;

/// Right-hand side of an equality test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Placeholder for the requesting principal's id.
    #[serde(rename = "self")]
    SelfId,
    Literal(String),
}

/// Abstract row filter, written against the columns of the scoped table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PredicateExpr {
    #[serde(rename = "all")]
    MatchAll,
    #[serde(rename = "none")]
    MatchNone,
    IsNull {
        column: String,
    },
    Eq {
        column: String,
        value: Operand,
    },
    /// A row of `table` exists whose `remote` column equals this row's
    /// `local` column and which satisfies `filter`.
    Exists {
        table: String,
        local: String,
        remote: String,
        filter: Box<PredicateExpr>,
    },
    Any {
        of: Vec<PredicateExpr>,
    },
    Every {
        of: Vec<PredicateExpr>,
    },
}

impl PredicateExpr {
    pub fn is_null(column: &str) -> Self {
        Self::IsNull {
            column: column.to_string(),
        }
    }

    pub fn eq_self(column: &str) -> Self {
        Self::Eq {
            column: column.to_string(),
            value: Operand::SelfId,
        }
    }

    pub fn eq(column: &str, value: impl Into<String>) -> Self {
        Self::Eq {
            column: column.to_string(),
            value: Operand::Literal(value.into()),
        }
    }

    pub fn exists(table: &str, local: &str, remote: &str, filter: PredicateExpr) -> Self {
        Self::Exists {
            table: table.to_string(),
            local: local.to_string(),
            remote: remote.to_string(),
            filter: Box::new(filter),
        }
    }

    pub fn any(of: Vec<PredicateExpr>) -> Self {
        Self::Any { of }
    }

    pub fn every(of: Vec<PredicateExpr>) -> Self {
        Self::Every { of }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Self::MatchAll)
    }

    pub fn is_match_none(&self) -> bool {
        matches!(self, Self::MatchNone)
    }

    /// Replaces every `self` placeholder with `id`.
    pub fn bind_self(&self, id: &str) -> Self {
        match self {
            Self::Eq {
                column,
                value: Operand::SelfId,
            } => Self::eq(column, id),
            Self::Exists {
                table,
                local,
                remote,
                filter,
            } => Self::Exists {
                table: table.clone(),
                local: local.clone(),
                remote: remote.clone(),
                filter: Box::new(filter.bind_self(id)),
            },
            Self::Any { of } => Self::any(of.iter().map(|p| p.bind_self(id)).collect()),
            Self::Every { of } => Self::every(of.iter().map(|p| p.bind_self(id)).collect()),
            other => other.clone(),
        }
    }

    pub fn has_placeholder(&self) -> bool {
        match self {
            Self::Eq { value, .. } => *value == Operand::SelfId,
            Self::Exists { filter, .. } => filter.has_placeholder(),
            Self::Any { of } | Self::Every { of } => of.iter().any(Self::has_placeholder),
            Self::MatchAll | Self::MatchNone | Self::IsNull { .. } => false,
        }
    }

    /// Table and column names end up in SQL text, so they are restricted to
    /// plain identifiers.
    pub fn validate(&self) -> Result<(), AuthzError> {
        match self {
            Self::MatchAll | Self::MatchNone => Ok(()),
            Self::IsNull { column } | Self::Eq { column, .. } => check_identifier(column),
            Self::Exists {
                table,
                local,
                remote,
                filter,
            } => {
                check_identifier(table)?;
                check_identifier(local)?;
                check_identifier(remote)?;
                filter.validate()
            }
            Self::Any { of } | Self::Every { of } => of.iter().try_for_each(Self::validate),
        }
    }
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn check_identifier(name: &str) -> Result<(), AuthzError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(AuthzError::configuration(format!(
            "{name:?} is not a valid table or column name"
        )))
    }
}

/// One `(resource, role) -> predicate` rule as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRule {
    pub resource: String,
    pub role: Role,
    pub predicate: PredicateExpr,
}

impl ScopeRule {
    pub fn new(resource: &str, role: Role, predicate: PredicateExpr) -> Self {
        Self {
            resource: resource.to_string(),
            role,
            predicate,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeRules {
    rules: HashMap<(String, Role), PredicateExpr>,
}

impl ScopeRules {
    pub fn from_config(entries: &[ScopeRule]) -> Result<Self, AuthzError> {
        let mut rules = HashMap::with_capacity(entries.len());
        for entry in entries {
            if entry.resource.trim().is_empty() {
                return Err(AuthzError::configuration("scope rule with an empty resource type"));
            }
            if entry.role.is_unrestricted() {
                return Err(AuthzError::configuration(format!(
                    "scope rule for {:?} narrows unrestricted role {}",
                    entry.resource, entry.role
                )));
            }
            entry.predicate.validate()?;

            let key = (entry.resource.clone(), entry.role);
            if rules.insert(key, entry.predicate.clone()).is_some() {
                return Err(AuthzError::configuration(format!(
                    "more than one scope rule for ({:?}, {})",
                    entry.resource, entry.role
                )));
            }
        }
        Ok(Self { rules })
    }

    /// Predicate restricting `resource` rows for `principal`.
    ///
    /// Unrestricted roles see everything. A restricted role without a rule,
    /// and the anonymous principal, see nothing.
    pub fn scope_for(&self, resource: &str, principal: &Principal) -> PredicateExpr {
        let (Some(role), Some(id)) = (principal.role(), principal.id()) else {
            return PredicateExpr::MatchNone;
        };

        if role.is_unrestricted() {
            return PredicateExpr::MatchAll;
        }

        match self.rules.get(&(resource.to_string(), role)) {
            Some(template) => template.bind_self(id),
            None => {
                tracing::debug!(resource, role = %role, "no scope rule configured, matching nothing");
                PredicateExpr::MatchNone
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
