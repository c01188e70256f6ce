//! Version Ordering Tests

use crate::common::*;

fn v(s: &str) -> VersionId {
    s.parse().unwrap()
}

#[test]
fn documented_ordering_chain() {
    let chain = ["1.2-BETA", "1.2.1-BETA", "1.2.1-GA", "1.2.1-GA-5"];
    for pair in chain.windows(2) {
        assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
    }
}

#[test]
fn domains_of_different_versions_are_distinct() {
    let registry = DomainRegistry::new();
    let old: DomainId = "billing@1.0-GA".parse().unwrap();
    let new: DomainId = "billing@2.0-RC-1".parse().unwrap();

    registry.get_or_create(&old);
    registry.get_or_create(&new);

    assert_eq!(registry.ids(), vec![old, new]);
}

#[test]
fn malformed_domain_version_rejected() {
    assert!(matches!(
        "billing@one-GA".parse::<DomainId>(),
        Err(ModelError::InvalidVersion(_))
    ));
    assert!(matches!(
        "@1.0-GA".parse::<DomainId>(),
        Err(ModelError::InvalidDomain(_))
    ));
}
