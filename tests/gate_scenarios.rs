use anyhow::Result;

use school_portal::authz::{
    resolve, AuthzError, Decision, Policy, PolicyConfig, PredicateExpr, Principal, Role, RouteAccess, RouteConfig,
    SessionClaims,
};

fn school() -> Result<Policy> {
    Ok(Policy::from_config(PolicyConfig::school())?)
}

#[test]
fn teacher_on_admin_reports_is_sent_to_teacher_area() -> Result<()> {
    let decision = school()?.decide("/admin/reports", &Principal::new("t1", Role::Teacher));
    assert_eq!(decision, Decision::RedirectTo("/teacher".to_string()));
    Ok(())
}

#[test]
fn student_on_public_root_is_allowed() -> Result<()> {
    let decision = school()?.decide("/", &Principal::new("s1", Role::Student));
    assert_eq!(decision, Decision::Allow);
    Ok(())
}

#[test]
fn anonymous_is_sent_to_sign_in() -> Result<()> {
    let policy = school()?;
    for path in ["/dashboard/parent", "/parent", "/list/events", "/api/me"] {
        assert_eq!(
            policy.decide(path, &Principal::anonymous()),
            Decision::RedirectTo("/auth/signin".to_string()),
            "{path}"
        );
    }
    Ok(())
}

#[test]
fn parent_announcement_scope_follows_children() -> Result<()> {
    let scope = school()?.scope_for("announcements", &Principal::new("p1", Role::Parent));
    let expected = PredicateExpr::any(vec![
        PredicateExpr::is_null("class_id"),
        PredicateExpr::exists(
            "students",
            "class_id",
            "class_id",
            PredicateExpr::eq("parent_id", "p1"),
        ),
    ]);
    assert_eq!(scope, expected);
    Ok(())
}

#[test]
fn admin_announcement_scope_is_match_all() -> Result<()> {
    let scope = school()?.scope_for("announcements", &Principal::new("a1", Role::Admin));
    assert!(scope.is_match_all());
    Ok(())
}

#[test]
fn empty_role_set_is_rejected_at_load() {
    let mut config = PolicyConfig::school();
    config.routes.insert(0, RouteConfig::new("/list/reports", &[]));
    let err = Policy::from_config(config).unwrap_err();
    assert!(matches!(err, AuthzError::Configuration(_)), "got {err:?}");
}

#[test]
fn unknown_role_claim_resolves_to_anonymous_and_goes_to_sign_in() -> Result<()> {
    let claims = SessionClaims::new("u9", "janitor");
    let principal = resolve(Some(&claims));
    assert!(!principal.is_authenticated());
    assert_eq!(
        school()?.decide("/list/events", &principal),
        Decision::RedirectTo("/auth/signin".to_string())
    );
    Ok(())
}

#[test]
fn public_paths_are_allowed_for_every_principal() -> Result<()> {
    let policy = school()?;
    let mut principals = vec![Principal::anonymous()];
    principals.extend(Role::ALL.map(|role| Principal::new("x", role)));

    for principal in &principals {
        for path in ["/", "/auth/signin", "/api/health", "/?next=/admin"] {
            assert_eq!(policy.decide(path, principal), Decision::Allow, "{path} {principal:?}");
        }
    }
    Ok(())
}

#[test]
fn owners_enter_their_area_and_nobody_else_does() -> Result<()> {
    let policy = school()?;
    for owner in Role::ALL {
        let home = policy.home_for(owner).map(str::to_string);
        let Some(home) = home else { continue };
        for visitor in Role::ALL {
            let decision = policy.decide(&format!("{home}/overview"), &Principal::new("x", visitor));
            if visitor == owner {
                assert_eq!(decision, Decision::Allow);
            } else {
                assert_eq!(decision, Decision::RedirectTo(policy.fallback_for(visitor).to_string()));
                assert_ne!(policy.fallback_for(visitor), home);
            }
        }
    }
    Ok(())
}

#[test]
fn visitor_without_an_area_is_sent_to_sign_in() -> Result<()> {
    let config = PolicyConfig::from_json(
        r#"{
            "public": ["/", "/auth/signin"],
            "private_areas": [{ "prefix": "/teacher", "role": "teacher" }],
            "routes": [
                { "pattern": "/list/fees/**", "roles": ["teacher"] },
                { "pattern": "/list/**", "roles": ["teacher", "parent"] }
            ]
        }"#,
    )?;
    let policy = Policy::from_config(config)?;
    let parent = Principal::new("p1", Role::Parent);

    assert_eq!(policy.home_for(Role::Parent), None);
    assert_eq!(policy.fallback_for(Role::Parent), "/auth/signin");
    assert_eq!(
        policy.decide("/teacher/x", &parent),
        Decision::RedirectTo("/auth/signin".to_string())
    );
    assert_eq!(policy.decide("/list/fees", &parent), Decision::Deny);
    Ok(())
}

#[test]
fn route_table_is_first_match_wins() -> Result<()> {
    let policy = school()?;
    // `/list/subjects` precedes the `/list/**` catch-all
    assert!(!policy.lookup("/list/subjects").permits(Role::Student));
    assert!(policy.lookup("/list/events").permits(Role::Student));
    assert_eq!(policy.lookup("/about"), RouteAccess::Universal);
    Ok(())
}

#[test]
fn decisions_are_stable_across_calls() -> Result<()> {
    let policy = school()?;
    let principal = Principal::new("p1", Role::Parent);
    for path in ["/list/fees", "/list/subjects", "/teacher", "/parent"] {
        let first = policy.decide(path, &principal);
        for _ in 0..3 {
            assert_eq!(policy.decide(path, &principal), first);
        }
    }
    Ok(())
}

#[test]
fn shared_policy_answers_from_many_threads() -> Result<()> {
    let policy = std::sync::Arc::new(school()?);
    let handles: Vec<_> = Role::ALL
        .into_iter()
        .map(|role| {
            let policy = policy.clone();
            std::thread::spawn(move || policy.decide("/list/subjects", &Principal::new("x", role)))
        })
        .collect();

    for (role, handle) in Role::ALL.into_iter().zip(handles) {
        let decision = handle.join().map_err(|_| anyhow::anyhow!("worker panicked"))?;
        assert_eq!(decision.is_allowed(), role.is_unrestricted(), "{role}");
    }
    Ok(())
}

#[test]
fn policy_file_round_trips_through_the_loader() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("policy.json");
    std::fs::write(
        &path,
        r#"{
            "public": ["/", "/auth/signin"],
            "private_areas": [{ "prefix": "/teacher", "role": "teacher" }],
            "routes": [{ "pattern": "/list/**", "roles": ["teacher", "student"] }],
            "scopes": [{
                "resource": "class_schedules",
                "role": "teacher",
                "predicate": { "op": "eq", "column": "teacher_id", "value": "self" }
            }]
        }"#,
    )?;

    let policy = Policy::from_config(PolicyConfig::from_file(&path)?)?;
    assert_eq!(policy.decide("/list/events", &Principal::new("s1", Role::Student)), Decision::Allow);
    assert_eq!(policy.decide("/list/events", &Principal::new("p1", Role::Parent)), Decision::Deny);
    assert_eq!(
        policy.scope_for("class_schedules", &Principal::new("t1", Role::Teacher)),
        PredicateExpr::eq("teacher_id", "t1")
    );
    Ok(())
}
