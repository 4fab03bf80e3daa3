//! End-to-end analysis runs against the in-memory directory

use ocipa_analyzer::{
    AnalysisError, AnalysisState, AnalyzerOptions, MatchMode, PolicyAnalyzer, WarningKind,
};
use ocipa_core::memory::InMemoryDirectory;
use ocipa_core::{Compartment, DirectoryError, Group, LifecycleState, Policy, User};
use std::sync::Arc;
use tracing_test::traced_test;

const TENANCY: &str = "ocid1.tenancy.oc1..t";
const USER: &str = "ocid1.user.oc1..u";
const FINANCE: &str = "ocid1.compartment.oc1..aaa";

fn alice() -> User {
    User::new(USER, "alice").with_email("alice@example.com")
}

fn admins_and_auditors() -> Vec<Group> {
    vec![
        Group::new("ocid1.group.oc1..auditors", "Auditors"),
        Group::new("ocid1.group.oc1..admins", "Admins"),
    ]
}

#[tokio::test]
async fn test_end_to_end_substitution() {
    let directory = InMemoryDirectory::new(TENANCY)
        .with_user(alice(), admins_and_auditors())
        .with_compartment(Compartment::new(FINANCE, "Finance", TENANCY))
        .with_policy(
            Policy::new("ocid1.policy.oc1..p", "P", FINANCE)
                .with_statement("Allow group Admins to manage all-resources in compartment ocid1.compartment.oc1..aaa")
                .with_statement("Allow group Developers to use instances in compartment ocid1.compartment.oc1..aaa"),
        );
    let directory = Arc::new(directory);

    let mut analyzer = PolicyAnalyzer::new(directory.clone(), AnalyzerOptions::default());
    let report = analyzer.analyze(USER).await.unwrap();

    assert_eq!(analyzer.state(), AnalysisState::Done);
    assert_eq!(report.sections.len(), 1);
    assert_eq!(report.sections[0].policy_name, "P");
    assert_eq!(report.sections[0].compartment_name, "Finance");
    assert_eq!(
        report.sections[0].statements,
        vec!["Allow group Admins to manage all-resources in compartment Finance"]
    );

    let text = report.to_string();
    assert!(text.contains("=== Policy: P (Compartment: Finance) ==="));
    assert!(text.starts_with("User: alice (ocid1.user.oc1..u)\nGroups: Admins, Auditors\n"));

    // Known compartments come from the listing, never from a lookup
    assert_eq!(directory.calls().get_compartment(), 0);
}

#[tokio::test]
async fn test_partial_failure_keeps_other_compartments() {
    let directory = InMemoryDirectory::new(TENANCY)
        .with_user(alice(), admins_and_auditors())
        .with_compartment(Compartment::new("ocid1.compartment.oc1..a", "A", TENANCY))
        .with_compartment(Compartment::new("ocid1.compartment.oc1..b", "B", TENANCY))
        .with_compartment(Compartment::new("ocid1.compartment.oc1..c", "C", TENANCY))
        .with_policy(Policy::new("pa", "PolicyA", "ocid1.compartment.oc1..a").with_statement("Allow group Admins to read buckets in compartment A"))
        .with_policy(Policy::new("pb", "PolicyB", "ocid1.compartment.oc1..b").with_statement("Allow group Admins to read buckets in compartment B"))
        .with_policy(Policy::new("pc", "PolicyC", "ocid1.compartment.oc1..c").with_statement("Allow group Auditors to read buckets in compartment C"))
        .deny_policies("ocid1.compartment.oc1..b");

    let mut analyzer = PolicyAnalyzer::new(Arc::new(directory), AnalyzerOptions::default());
    let report = analyzer.analyze(USER).await.unwrap();

    let policies: Vec<&str> = report.sections.iter().map(|s| s.policy_name.as_str()).collect();
    assert_eq!(policies, vec!["PolicyA", "PolicyC"]);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].compartment_name, "B");
    assert_eq!(report.warnings[0].kind, WarningKind::PoliciesSkipped);
    assert!(report.warnings[0].to_string().contains("ocid1.compartment.oc1..b"));
    assert_eq!(analyzer.state(), AnalysisState::Done);
}

#[tokio::test]
async fn test_user_without_groups_has_no_sections() {
    let directory = InMemoryDirectory::new(TENANCY)
        .with_user(alice(), vec![])
        .with_policy(Policy::new("p", "P", TENANCY).with_statement("Allow any-user to inspect users in tenancy"));
    let directory = Arc::new(directory);

    let mut analyzer = PolicyAnalyzer::new(directory.clone(), AnalyzerOptions::default());
    let report = analyzer.analyze(USER).await.unwrap();

    assert!(report.groups.is_empty());
    assert!(report.sections.is_empty());
    assert_eq!(directory.calls().list_policies(), 0);
    assert!(report.to_string().contains("No policy statements found"));
}

#[tokio::test]
async fn test_unknown_user_aborts() {
    let directory = Arc::new(InMemoryDirectory::new(TENANCY));
    let mut analyzer = PolicyAnalyzer::new(directory, AnalyzerOptions::default());

    let err = analyzer.analyze("ocid1.user.oc1..missing").await.unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::ResolveUser { source: DirectoryError::NotFound(_), .. }
    ));
    assert_eq!(analyzer.state(), AnalysisState::Aborted);
}

#[tokio::test]
async fn test_malformed_user_id_rejected_without_calls() {
    let directory = Arc::new(InMemoryDirectory::new(TENANCY));
    let mut analyzer = PolicyAnalyzer::new(directory.clone(), AnalyzerOptions::default());

    let err = analyzer.analyze("ocid1.group.oc1..g").await.unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidUserId(_)));
    assert_eq!(analyzer.state(), AnalysisState::Aborted);
    assert_eq!(directory.calls().list_compartments(), 0);
}

#[tokio::test]
async fn test_rejected_credentials_abort() {
    let directory = InMemoryDirectory::new(TENANCY)
        .with_user(alice(), admins_and_auditors())
        .fail_with(USER, DirectoryError::auth("token expired"));

    let mut analyzer = PolicyAnalyzer::new(Arc::new(directory), AnalyzerOptions::default());
    let err = analyzer.analyze(USER).await.unwrap_err();
    assert!(err.directory_error().is_some_and(|e| e.is_fatal()));
    assert_eq!(analyzer.state(), AnalysisState::Aborted);
}

#[tokio::test]
async fn test_auth_failure_during_scan_aborts() {
    let directory = InMemoryDirectory::new(TENANCY)
        .with_user(alice(), admins_and_auditors())
        .fail_with(TENANCY, DirectoryError::auth("key revoked"));

    let mut analyzer = PolicyAnalyzer::new(Arc::new(directory), AnalyzerOptions::default());
    let err = analyzer.analyze(USER).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Collection(DirectoryError::Auth(_))));
}

#[tokio::test]
async fn test_compartment_listing_failure_degrades_to_root() {
    let directory = InMemoryDirectory::new(TENANCY)
        .with_user(alice(), admins_and_auditors())
        .with_policy(Policy::new("p", "TenancyAdmins", TENANCY).with_statement("Allow group Admins to manage all-resources in tenancy"))
        .fail_with(TENANCY, DirectoryError::transient("HTTP 503"));

    let mut analyzer = PolicyAnalyzer::new(Arc::new(directory), AnalyzerOptions::default());
    let report = analyzer.analyze(USER).await.unwrap();

    assert_eq!(report.compartments_scanned, 1);
    assert_eq!(report.sections.len(), 1);
    assert_eq!(report.sections[0].compartment_name, "root");
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::ListingFailed);
    let text = report.warnings[0].to_string();
    assert!(text.starts_with("Could not list compartments in tenancy ocid1.tenancy.oc1..t"));
    assert!(text.contains("only the root compartment was scanned"));
    assert!(text.contains("HTTP 503"));
    assert!(!text.contains("Could not fetch policies"));
}

#[tokio::test]
async fn test_output_follows_hierarchy_then_listing_order() {
    let directory = InMemoryDirectory::new(TENANCY)
        .with_user(alice(), admins_and_auditors())
        .with_compartment(Compartment::new("ocid1.compartment.oc1..ops", "Ops", TENANCY))
        .with_compartment(Compartment::new("ocid1.compartment.oc1..net", "Network", "ocid1.compartment.oc1..ops"))
        .with_compartment(Compartment::new(FINANCE, "Finance", TENANCY))
        .with_policy(Policy::new("p3", "FinancePolicy", FINANCE).with_statement("Allow group Admins to read buckets in compartment Finance"))
        .with_policy(Policy::new("p2", "NetPolicy", "ocid1.compartment.oc1..net").with_statement("Allow group Admins to manage vcns in compartment Ops:Network"))
        .with_policy(Policy::new("p1", "RootPolicy", TENANCY).with_statement("Allow group Auditors to inspect all-resources in tenancy"))
        .with_policy(Policy::new("p1b", "RootPolicy2", TENANCY).with_statement("Allow group Admins to inspect users in tenancy"));

    let options = AnalyzerOptions {
        concurrency: 4,
        ..AnalyzerOptions::default()
    };
    let mut analyzer = PolicyAnalyzer::new(Arc::new(directory), options);
    let report = analyzer.analyze(USER).await.unwrap();

    let order: Vec<(&str, &str)> = report
        .sections
        .iter()
        .map(|s| (s.policy_name.as_str(), s.compartment_name.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("RootPolicy", "root"),
            ("RootPolicy2", "root"),
            ("NetPolicy", "Network"),
            ("FinancePolicy", "Finance"),
        ]
    );
}

#[tokio::test]
async fn test_deleted_compartments_skipped_by_default() {
    let build = || {
        InMemoryDirectory::new(TENANCY)
            .with_user(alice(), admins_and_auditors())
            .with_compartment(
                Compartment::new("ocid1.compartment.oc1..old", "Old", TENANCY)
                    .with_state(LifecycleState::Deleted),
            )
            .with_policy(Policy::new("p", "OldPolicy", "ocid1.compartment.oc1..old").with_statement("Allow group Admins to read buckets in compartment Old"))
    };

    let mut analyzer = PolicyAnalyzer::new(Arc::new(build()), AnalyzerOptions::default());
    assert!(analyzer.analyze(USER).await.unwrap().sections.is_empty());

    let options = AnalyzerOptions {
        include_deleted_compartments: true,
        ..AnalyzerOptions::default()
    };
    let mut analyzer = PolicyAnalyzer::new(Arc::new(build()), options);
    assert_eq!(analyzer.analyze(USER).await.unwrap().sections.len(), 1);
}

#[tokio::test]
#[traced_test]
async fn test_unresolvable_reference_left_verbatim() {
    let statement = "Allow group Admins to read buckets in compartment id ocid1.compartment.oc1..elsewhere";
    let directory = InMemoryDirectory::new(TENANCY)
        .with_user(alice(), admins_and_auditors())
        .with_policy(Policy::new("p", "P", TENANCY).with_statement(statement).with_statement(statement));
    let directory = Arc::new(directory);

    let mut analyzer = PolicyAnalyzer::new(directory.clone(), AnalyzerOptions::default());
    let report = analyzer.analyze(USER).await.unwrap();

    assert_eq!(report.sections[0].statements, vec![statement, statement]);
    assert!(report.warnings.is_empty());
    assert_eq!(directory.calls().get_compartment(), 1);
    assert_eq!(analyzer.cache().stats().failures, 1);
    assert!(logs_contain("Could not resolve compartment ocid1.compartment.oc1..elsewhere"));
}

#[tokio::test]
async fn test_group_clause_mode_is_stricter() {
    let directory = InMemoryDirectory::new(TENANCY)
        .with_user(alice(), vec![Group::new("g", "Admins")])
        .with_policy(
            Policy::new("p", "P", TENANCY)
                .with_statement("Allow group SuperAdmins to manage all-resources in tenancy")
                .with_statement("allow group admins to inspect users in tenancy"),
        );

    let options = AnalyzerOptions {
        match_mode: MatchMode::GroupClause,
        ..AnalyzerOptions::default()
    };
    let mut analyzer = PolicyAnalyzer::new(Arc::new(directory), options);
    let report = analyzer.analyze(USER).await.unwrap();

    assert_eq!(
        report.sections[0].statements,
        vec!["allow group admins to inspect users in tenancy"]
    );
}
