use ce_view::web::router::{Charset, Endpoint, Pattern, RouteParams, RouteTable, Segment};

#[test]
fn test_earlier_route_wins_over_more_specific() {
    let table = RouteTable::new()
        .route(
            Pattern::new(vec![Segment::Literal("graphs"), Segment::Capture(Charset::Name)]),
            "generic",
        )
        .route(
            Pattern::new(vec![Segment::Literal("graphs"), Segment::Literal("ce")]),
            "specific",
        );

    let m = table.lookup("/graphs/ce").unwrap();
    assert_eq!(*m.handler, "generic");
    assert_eq!(m.params.get(0), Some("ce"));
}

#[test]
fn test_reordering_changes_the_winner() {
    let table = RouteTable::new()
        .route(
            Pattern::new(vec![Segment::Literal("graphs"), Segment::Literal("ce")]),
            "specific",
        )
        .route(
            Pattern::new(vec![Segment::Literal("graphs"), Segment::Capture(Charset::Name)]),
            "generic",
        );

    assert_eq!(*table.lookup("graphs/ce").unwrap().handler, "specific");
    assert_eq!(*table.lookup("graphs/vos").unwrap().handler, "generic");
}

#[test]
fn test_selection_is_deterministic() {
    let table = RouteTable::standard();
    for path in ["/", "/vos", "/json/pilots", "/graphs/vos/cms", "/nope"] {
        let first = table.lookup(path).map(|m| (*m.handler, m.params));
        let second = table.lookup(path).map(|m| (*m.handler, m.params));
        assert_eq!(first, second, "{}", path);
    }
}

#[test]
fn test_standard_table_order() {
    let table = RouteTable::standard();
    assert_eq!(table.len(), 10);

    let expected = [
        ("/", Endpoint::Index),
        ("/vos", Endpoint::Vos),
        ("/metrics", Endpoint::Metrics),
        ("/json/totals", Endpoint::Totals),
        ("/json/pilots", Endpoint::Pilots),
        ("/json/schedd", Endpoint::Schedd),
        ("/json/vos", Endpoint::VosJson),
        ("/graphs/ce", Endpoint::CeGraph),
        ("/graphs/vos/OSG", Endpoint::VoGraph),
        ("/graphs/metrics/schedd/JobsRunning", Endpoint::MetricsGraph),
    ];
    for (path, endpoint) in expected {
        assert_eq!(
            table.lookup(path).map(|m| *m.handler),
            Some(endpoint),
            "{}",
            path
        );
    }
}

#[test]
fn test_vo_graph_with_interval() {
    let table = RouteTable::standard();
    let m = table.lookup("/graphs/vos/OSG/weekly").unwrap();

    assert_eq!(*m.handler, Endpoint::VoGraph);
    assert_eq!(
        m.params,
        RouteParams(vec![Some("OSG".to_string()), Some("weekly".to_string())])
    );
}

#[test]
fn test_vo_names_allow_dots_and_underscores() {
    let table = RouteTable::standard();
    let m = table.lookup("/graphs/vos/fermilab.test_vo").unwrap();

    assert_eq!(*m.handler, Endpoint::VoGraph);
    assert_eq!(m.params.get(0), Some("fermilab.test_vo"));
    assert_eq!(m.params.get(1), None);
}

#[test]
fn test_unmatched_paths() {
    let table = RouteTable::standard();
    for path in [
        "/unknown/thing<script>",
        "/json",
        "/json/totals/extra",
        "/graphs",
        "/graphs/vos",
        "/graphs/metrics/schedd",
        "/Vos",
    ] {
        assert!(table.lookup(path).is_none(), "{}", path);
    }
}

#[test]
fn test_matching_is_case_sensitive() {
    let table = RouteTable::standard();
    assert!(table.lookup("/JSON/totals").is_none());
    assert!(table.lookup("/graphs/CE").is_none());
}
