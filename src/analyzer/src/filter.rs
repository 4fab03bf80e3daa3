//! Statement selection and compartment-name substitution

use once_cell::sync::Lazy;
use ocipa_core::Group;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cache::NameCache;
use crate::collector::CollectedPolicy;
use crate::report::PolicySection;

/// Compartment or tenancy identifier, optionally introduced by `compartment id`
static COMPARTMENT_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<kw>\bcompartment\s+id\s+)?(?P<ocid>\bocid1\.(?:compartment|tenancy)\.[a-z0-9._-]+)")
        .expect("compartment identifier pattern is valid")
});

/// How a statement is tested against the user's group names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Case-sensitive substring of any group name
    #[default]
    Substring,
    /// Case-insensitive `group <name>`, `group '<name>'` or `group "<name>"`
    GroupClause,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "substring" => Ok(MatchMode::Substring),
            "group-clause" => Ok(MatchMode::GroupClause),
            other => Err(format!(
                "unknown match mode '{}' (expected 'substring' or 'group-clause')",
                other
            )),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Substring => write!(f, "substring"),
            MatchMode::GroupClause => write!(f, "group-clause"),
        }
    }
}

/// Selects statements that reference any of a set of group names
#[derive(Debug, Clone)]
pub struct StatementFilter {
    mode: MatchMode,
    names: Vec<String>,
    /// Lowercased clause forms, only populated in `GroupClause` mode
    clauses: Vec<String>,
}

impl StatementFilter {
    pub fn new(groups: &[Group], mode: MatchMode) -> Self {
        let names: Vec<String> = groups
            .iter()
            .map(|g| g.name.clone())
            .filter(|n| !n.is_empty())
            .collect();

        let clauses = match mode {
            MatchMode::Substring => Vec::new(),
            MatchMode::GroupClause => names
                .iter()
                .flat_map(|name| {
                    let name = name.to_lowercase();
                    [
                        format!("group {}", name),
                        format!("group '{}'", name),
                        format!("group \"{}\"", name),
                    ]
                })
                .collect(),
        };

        Self {
            mode,
            names,
            clauses,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether the statement references one of the groups
    pub fn matches(&self, statement: &str) -> bool {
        match self.mode {
            MatchMode::Substring => self.names.iter().any(|name| statement.contains(name.as_str())),
            MatchMode::GroupClause => {
                let lowered = statement.to_lowercase();
                self.clauses.iter().any(|clause| lowered.contains(clause.as_str()))
            }
        }
    }
}

/// Replace compartment identifiers in a statement with their names
///
/// `compartment id <ocid>` becomes `compartment <name>` when the identifier
/// resolves; identifiers that do not resolve are left exactly as written.
/// Applying the substitution to its own output changes nothing.
pub async fn substitute_compartment_ids(statement: &str, cache: &NameCache) -> String {
    let mut rendered = String::with_capacity(statement.len());
    let mut last = 0;

    for caps in COMPARTMENT_ID_PATTERN.captures_iter(statement) {
        let (Some(whole), Some(ocid_match)) = (caps.get(0), caps.name("ocid")) else {
            continue;
        };
        // Identifiers never end in '.', so a trailing one is sentence punctuation
        let ocid = ocid_match.as_str().trim_end_matches('.');
        let ocid_end = ocid_match.start() + ocid.len();

        rendered.push_str(&statement[last..whole.start()]);
        let name = cache.resolve(ocid).await;
        if name == ocid {
            rendered.push_str(&statement[whole.start()..ocid_end]);
        } else {
            if let Some(keyword) = caps.name("kw") {
                let word = keyword.as_str().split_whitespace().next().unwrap_or("compartment");
                rendered.push_str(word);
                rendered.push(' ');
            }
            rendered.push_str(&name);
        }
        last = ocid_end;
    }

    rendered.push_str(&statement[last..]);
    rendered
}

/// Turns collected policies into report sections
pub struct StatementRenderer<'a> {
    cache: &'a NameCache,
    mode: MatchMode,
}

impl<'a> StatementRenderer<'a> {
    pub fn new(cache: &'a NameCache, mode: MatchMode) -> Self {
        Self { cache, mode }
    }

    /// One section per policy with at least one matching statement, in
    /// collection order; statements keep their order within the policy
    pub async fn render(&self, groups: &[Group], collected: &[CollectedPolicy]) -> Vec<PolicySection> {
        let filter = StatementFilter::new(groups, self.mode);
        if filter.is_empty() {
            return Vec::new();
        }

        let mut sections = Vec::new();
        for entry in collected {
            let mut statements = Vec::new();
            for statement in entry.policy.statements.iter().filter(|s| filter.matches(s)) {
                statements.push(substitute_compartment_ids(statement, self.cache).await);
            }
            if statements.is_empty() {
                continue;
            }

            sections.push(PolicySection {
                policy_name: entry.policy.name.clone(),
                compartment_name: self.cache.resolve(&entry.policy.compartment_id).await,
                statements,
            });
        }
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocipa_core::memory::InMemoryDirectory;
    use ocipa_core::Compartment;
    use std::sync::Arc;

    const TENANCY: &str = "ocid1.tenancy.oc1..t";
    const FINANCE: &str = "ocid1.compartment.oc1..aaa";

    fn cache() -> (Arc<InMemoryDirectory>, NameCache) {
        let dir = Arc::new(
            InMemoryDirectory::new(TENANCY)
                .with_compartment(Compartment::new(FINANCE, "Finance", TENANCY)),
        );
        let cache = NameCache::new(dir.clone());
        (dir, cache)
    }

    #[test]
    fn test_substring_is_case_sensitive() {
        let filter = StatementFilter::new(&[Group::new("g", "Admins")], MatchMode::Substring);
        assert!(filter.matches("Allow group Admins to read all-resources in tenancy"));
        assert!(!filter.matches("Allow group admins to read all-resources in tenancy"));
        // Known false positive of substring matching
        assert!(filter.matches("Allow group NetworkAdminsX to read all-resources in tenancy"));
    }

    #[test]
    fn test_group_clause_mode() {
        let filter = StatementFilter::new(&[Group::new("g", "Admins")], MatchMode::GroupClause);
        assert!(filter.matches("allow GROUP admins to read all-resources in tenancy"));
        assert!(filter.matches("Allow group 'Admins' to read buckets in tenancy"));
        assert!(filter.matches("Allow group \"Admins\" to read buckets in tenancy"));
        assert!(!filter.matches("Allow group Readers to read buckets where target.group.name = 'Admins'"));
    }

    #[test]
    fn test_match_mode_parsing() {
        assert_eq!("substring".parse::<MatchMode>(), Ok(MatchMode::Substring));
        assert_eq!("group-clause".parse::<MatchMode>(), Ok(MatchMode::GroupClause));
        assert!("exact".parse::<MatchMode>().is_err());
        assert_eq!(MatchMode::GroupClause.to_string(), "group-clause");
    }

    #[tokio::test]
    async fn test_substitutes_known_identifier() {
        let (_, cache) = cache();
        let out = substitute_compartment_ids(
            "Allow group Admins to manage all-resources in compartment ocid1.compartment.oc1..aaa",
            &cache,
        )
        .await;
        assert_eq!(out, "Allow group Admins to manage all-resources in compartment Finance");
    }

    #[tokio::test]
    async fn test_compartment_id_keyword_dropped() {
        let (_, cache) = cache();
        let out = substitute_compartment_ids(
            "Allow group Admins to read buckets in compartment id ocid1.compartment.oc1..aaa.",
            &cache,
        )
        .await;
        assert_eq!(out, "Allow group Admins to read buckets in compartment Finance.");
    }

    #[tokio::test]
    async fn test_unresolvable_identifier_left_verbatim() {
        let (_, cache) = cache();
        let statement =
            "Allow group Admins to read buckets in compartment id ocid1.compartment.oc1..gone";
        assert_eq!(substitute_compartment_ids(statement, &cache).await, statement);
    }

    #[tokio::test]
    async fn test_tenancy_identifier_becomes_root() {
        let (dir, cache) = cache();
        let out = substitute_compartment_ids(
            "Allow group Admins to inspect users in compartment ocid1.tenancy.oc1..t",
            &cache,
        )
        .await;
        assert_eq!(out, "Allow group Admins to inspect users in compartment root");
        assert_eq!(dir.calls().get_compartment(), 0);
    }

    #[tokio::test]
    async fn test_substitution_idempotent() {
        let (_, cache) = cache();
        let statement = "Allow group Admins to use instances in compartment ocid1.compartment.oc1..aaa where request.region = 'phx'";
        let once = substitute_compartment_ids(statement, &cache).await;
        let twice = substitute_compartment_ids(&once, &cache).await;
        assert_eq!(once, twice);
    }
}
