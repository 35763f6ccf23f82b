//! Tests for the host routing table

mod common;

use common::site;
use hostgate::config::SiteConfig;
use hostgate::proxy::RoutingTable;

#[test]
fn test_build_flattens_sites_in_order() {
    let sites = vec![
        site(&[("blog", "blog.example", "127.0.0.1:9001"), ("shop", "shop.example", "127.0.0.1:9002")]),
        site(&[("api", "api.example", "127.0.0.1:9003")]),
    ];

    let table = RoutingTable::build(&sites);

    let names: Vec<&str> = table.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["blog", "shop", "api"]);
    assert_eq!(table.len(), 3);
    assert!(!table.is_empty());
}

#[test]
fn test_resolve_exact_match() {
    let table = RoutingTable::build(&[site(&[
        ("blog", "blog.example", "127.0.0.1:9001"),
        ("shop", "shop.example", "127.0.0.1:9002"),
    ])]);

    let entry = table.resolve("shop.example").unwrap();
    assert_eq!(entry.name, "shop");
    assert_eq!(entry.upstream, "127.0.0.1:9002");

    assert!(table.resolve("unknown.example").is_none());
}

#[test]
fn test_resolve_is_case_sensitive() {
    let table = RoutingTable::build(&[site(&[("blog", "blog.example", "127.0.0.1:9001")])]);

    assert!(table.resolve("Blog.Example").is_none());
    assert!(table.resolve("blog.example").is_some());
}

#[test]
fn test_resolve_does_not_strip_port() {
    let table = RoutingTable::build(&[site(&[
        ("plain", "example.com", "127.0.0.1:9001"),
        ("ported", "example.com:8000", "127.0.0.1:9002"),
    ])]);

    assert_eq!(table.resolve("example.com:8000").unwrap().name, "ported");
    assert_eq!(table.resolve("example.com").unwrap().name, "plain");
    assert!(table.resolve("example.com:9999").is_none());
}

#[test]
fn test_resolve_no_prefix_or_wildcard_match() {
    let table = RoutingTable::build(&[site(&[("wild", "*.example", "127.0.0.1:9001")])]);

    assert!(table.resolve("a.example").is_none());
    assert!(table.resolve("*.exam").is_none());
    assert!(table.resolve("*.example").is_some());
}

#[test]
fn test_resolve_empty_host_never_matches() {
    let table = RoutingTable::build(&[SiteConfig::default_site()]);

    assert_eq!(table.len(), 1);
    assert!(table.resolve("").is_none());
}

#[test]
fn test_duplicate_host_first_declaration_wins() {
    let table = RoutingTable::build(&[
        site(&[("first", "dup.example", "127.0.0.1:9001"), ("second", "dup.example", "127.0.0.1:9002")]),
        site(&[("third", "dup.example", "127.0.0.1:9003")]),
    ]);

    assert_eq!(table.len(), 3);
    assert_eq!(table.resolve("dup.example").unwrap().name, "first");
}

#[test]
fn test_empty_table() {
    let table = RoutingTable::build(&[]);

    assert!(table.is_empty());
    assert!(table.resolve("anything").is_none());
}
