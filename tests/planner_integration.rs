//! End-to-end planning scenarios over a small catalog.

use rapids::catalog::{Format, MemoryCatalog, Source};
use rapids::expr::Expression;
use rapids::function::CoreFunctionRegistry;
use rapids::insert::{FixedClock, InsertRequest};
use rapids::plan::{
    JoinParams, JoinType, KeyField, NodeType, PlanNode, SelectExpression, Stacker, WindowType,
    WithinExpression,
};
use rapids::schema::{ColumnName, FormatOptions, LogicalSchema, SourceName};
use rapids::types::{SqlType, Value};
use rapids::{Planner, PlannerConfig, RapidsError};

/// Catalog with:
///   stream S(a INT, b STRING, ts BIGINT) keyed on a, 4 partitions
///   stream S2(a INT, v2 STRING) keyed on a, 4 partitions
///   stream S3(a INT) keyed on a, 2 partitions
///   table  T(a INT, v DOUBLE) keyed on a, 4 partitions
///   table  T2(a INT, x INT) keyed on x, 4 partitions
fn catalog() -> MemoryCatalog {
    let catalog = MemoryCatalog::new();

    let s = LogicalSchema::builder()
        .value_column(ColumnName::of("a"), SqlType::Integer)
        .value_column(ColumnName::of("b"), SqlType::String)
        .value_column(ColumnName::of("ts"), SqlType::Bigint)
        .build()
        .unwrap();
    catalog.register(
        Source::builder(SourceName::of("S"), NodeType::Stream, s)
            .key_field(KeyField::of(ColumnName::of("a")))
            .value_format(Format::Json)
            .topic("s-topic")
            .partition_count(4)
            .build(),
    );

    let s2 = LogicalSchema::builder()
        .value_column(ColumnName::of("a"), SqlType::Integer)
        .value_column(ColumnName::of("v2"), SqlType::String)
        .build()
        .unwrap();
    catalog.register(
        Source::builder(SourceName::of("S2"), NodeType::Stream, s2)
            .key_field(KeyField::of(ColumnName::of("a")))
            .partition_count(4)
            .build(),
    );

    let s3 = LogicalSchema::builder()
        .value_column(ColumnName::of("a"), SqlType::Integer)
        .build()
        .unwrap();
    catalog.register(
        Source::builder(SourceName::of("S3"), NodeType::Stream, s3)
            .key_field(KeyField::of(ColumnName::of("a")))
            .partition_count(2)
            .build(),
    );

    let t = LogicalSchema::builder()
        .value_column(ColumnName::of("a"), SqlType::Integer)
        .value_column(ColumnName::of("v"), SqlType::Double)
        .build()
        .unwrap();
    catalog.register(
        Source::builder(SourceName::of("T"), NodeType::Table, t)
            .key_field(KeyField::of(ColumnName::of("a")))
            .partition_count(4)
            .build(),
    );

    let t2 = LogicalSchema::builder()
        .value_column(ColumnName::of("a"), SqlType::Integer)
        .value_column(ColumnName::of("x"), SqlType::Integer)
        .build()
        .unwrap();
    catalog.register(
        Source::builder(SourceName::of("T2"), NodeType::Table, t2)
            .key_field(KeyField::of(ColumnName::of("x")))
            .partition_count(4)
            .build(),
    );

    catalog
}

fn source_name(name: &str) -> SourceName {
    SourceName::of(name)
}

fn select(name: &str, expression: Expression) -> SelectExpression {
    SelectExpression::new(ColumnName::of(name), expression)
}

/// SELECT a, b FROM S
#[test]
fn project_preserves_key_field_and_schema() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let project = builder
        .project(
            source,
            vec![
                select("a", Expression::qualified_column("S", "a")),
                select("b", Expression::qualified_column("S", "b")),
            ],
            &stacker,
        )
        .unwrap();

    assert_eq!(
        project.schema().to_string_opts(&FormatOptions::none()),
        "[ROWKEY STRING KEY, a INTEGER, b STRING]"
    );
    assert_eq!(
        project.key_field().name().map(|n| n.as_str()),
        Some("a")
    );
    assert_eq!(project.node_type(), NodeType::Stream);
    assert!(!contains_repartition(&project));
}

/// SELECT COUNT(*) FROM S GROUP BY b
#[test]
fn group_by_non_key_column_repartitions() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let grouped = builder
        .group_by(
            source,
            vec![Expression::qualified_column("S", "b")],
            &stacker,
        )
        .unwrap();

    assert!(contains_repartition(&grouped));
    assert_eq!(grouped.key_field().name().map(|n| n.as_str()), Some("b"));

    let output_schema = LogicalSchema::builder()
        .value_column(ColumnName::of("b"), SqlType::String)
        .value_column(ColumnName::of("COL_0"), SqlType::Bigint)
        .build()
        .unwrap();

    let aggregate = builder
        .aggregate(
            grouped,
            output_schema,
            1,
            vec![Expression::function("COUNT", vec![])],
            None,
            &stacker,
        )
        .unwrap();

    assert_eq!(aggregate.node_type(), NodeType::Table);
    assert_eq!(
        aggregate.schema().to_string_opts(&FormatOptions::none()),
        "[ROWKEY STRING KEY, b STRING, COL_0 BIGINT]"
    );
}

/// SELECT s.a, t.v FROM S s JOIN T t ON s.a = t.a
#[test]
fn stream_table_join_keyed_by_left_field() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let left = builder
        .source(&source_name("S"), Some(&source_name("s")), &stacker)
        .unwrap();
    let right = builder
        .source(&source_name("T"), Some(&source_name("t")), &stacker)
        .unwrap();

    let join = builder
        .join(
            left,
            right,
            JoinParams::new(
                JoinType::Inner,
                ColumnName::of("s.a"),
                ColumnName::of("t.a"),
            ),
            &stacker,
        )
        .unwrap();

    assert!(matches!(join, PlanNode::StreamTableJoin { .. }));
    assert_eq!(join.node_type(), NodeType::Stream);
    assert_eq!(join.key_field().name().map(|n| n.as_str()), Some("s.a"));

    // Output schema: synthetic ROWKEY key, then left values, then right.
    let rendered = join.schema().to_string_opts(&FormatOptions::none());
    assert!(rendered.starts_with("[ROWKEY STRING KEY, s.ROWTIME BIGINT, s.ROWKEY STRING, s.a INTEGER"));
    assert!(rendered.contains("t.v DOUBLE"));

    // Already keyed by the join field on both sides: no repartition.
    assert!(!contains_repartition(&join));
}

/// SELECT * FROM S s LEFT JOIN S2 s2 WITHIN 10 SECONDS ON s.a = s2.a
#[test]
fn stream_stream_join_carries_window() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let left = builder
        .source(&source_name("S"), Some(&source_name("s")), &stacker)
        .unwrap();
    let right = builder
        .source(&source_name("S2"), Some(&source_name("s2")), &stacker)
        .unwrap();

    let join = builder
        .join(
            left,
            right,
            JoinParams::new(
                JoinType::Left,
                ColumnName::of("s.a"),
                ColumnName::of("s2.a"),
            )
            .within(WithinExpression::of(10_000)),
            &stacker,
        )
        .unwrap();

    match &join {
        PlanNode::StreamStreamJoin { window, .. } => {
            assert_eq!(window.before_ms, 10_000);
            assert_eq!(window.after_ms, 10_000);
        }
        other => panic!("expected a stream-stream join, got {}", other),
    }
    assert_eq!(join.node_type(), NodeType::Stream);
    assert_eq!(join.key_field().name().map(|n| n.as_str()), Some("s.a"));
}

/// SELECT * FROM S WHERE ROWTIME > '2020-01-02T03:04:05'
#[test]
fn filter_rewrites_rowtime_literal() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let filter = builder
        .filter(
            source,
            Expression::column("ROWTIME").gt(Expression::string("2020-01-02T03:04:05")),
            &stacker,
        )
        .unwrap();

    match &filter {
        PlanNode::Filter { predicate, .. } => {
            assert_eq!(
                *predicate,
                Expression::column("ROWTIME").gt(Expression::long(1_577_934_245_000))
            );
        }
        other => panic!("expected a filter, got {}", other),
    }
    assert_eq!(filter.key_field(), filter.children()[0].key_field());
}

/// INSERT INTO S (a, b) VALUES (1, 'x')
#[test]
fn insert_values_builds_key_and_row() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let clock = FixedClock(1_234);
    let planner =
        Planner::new(&catalog, &registry, PlannerConfig::default()).with_clock(&clock);

    let row = planner
        .insert_values(&InsertRequest {
            target: source_name("S"),
            columns: vec![ColumnName::of("a"), ColumnName::of("b")],
            values: vec![Expression::integer(1), Expression::string("x")],
        })
        .unwrap();

    assert_eq!(row.timestamp, 1_234);
    assert_eq!(
        row.key,
        Value::Struct(vec![("ROWKEY".to_string(), Value::from("1"))])
    );
    assert_eq!(
        row.value.columns(),
        &[Value::Integer(1), Value::from("x"), Value::Null]
    );
}

// ---- join and grouping laws ----

#[test]
fn stream_stream_join_requires_within() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let left = builder
        .source(&source_name("S"), Some(&source_name("s")), &stacker)
        .unwrap();
    let right = builder
        .source(&source_name("S2"), Some(&source_name("s2")), &stacker)
        .unwrap();

    let err = builder.join(
        left,
        right,
        JoinParams::new(
            JoinType::Inner,
            ColumnName::of("s.a"),
            ColumnName::of("s2.a"),
        ),
        &stacker,
    );
    assert!(matches!(err, Err(RapidsError::WithinRequired { .. })));
}

#[test]
fn non_stream_joins_reject_within() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let stream = builder
        .source(&source_name("S"), Some(&source_name("s")), &stacker)
        .unwrap();
    let table = builder
        .source(&source_name("T"), Some(&source_name("t")), &stacker)
        .unwrap();
    let err = builder.join(
        stream,
        table,
        JoinParams::new(
            JoinType::Inner,
            ColumnName::of("s.a"),
            ColumnName::of("t.a"),
        )
        .within(WithinExpression::of(1_000)),
        &stacker,
    );
    assert!(matches!(err, Err(RapidsError::WithinForbidden { .. })));

    let t_left = builder
        .source(&source_name("T"), Some(&source_name("t")), &stacker)
        .unwrap();
    let t2_right = builder
        .source(&source_name("T2"), Some(&source_name("t2")), &stacker)
        .unwrap();
    let err = builder.join(
        t_left,
        t2_right,
        JoinParams::new(
            JoinType::Inner,
            ColumnName::of("t.a"),
            ColumnName::of("t2.x"),
        )
        .within(WithinExpression::of(1_000)),
        &stacker,
    );
    assert!(matches!(err, Err(RapidsError::WithinForbidden { .. })));
}

#[test]
fn table_stream_join_is_illegal() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let table = builder
        .source(&source_name("T"), Some(&source_name("t")), &stacker)
        .unwrap();
    let stream = builder
        .source(&source_name("S"), Some(&source_name("s")), &stacker)
        .unwrap();

    let err = builder.join(
        table,
        stream,
        JoinParams::new(
            JoinType::Inner,
            ColumnName::of("t.a"),
            ColumnName::of("s.a"),
        ),
        &stacker,
    );
    assert!(matches!(err, Err(RapidsError::JoinCombinationIllegal { .. })));
}

#[test]
fn outer_join_has_no_key_field() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let left = builder
        .source(&source_name("S"), Some(&source_name("s")), &stacker)
        .unwrap();
    let right = builder
        .source(&source_name("S2"), Some(&source_name("s2")), &stacker)
        .unwrap();

    let join = builder
        .join(
            left,
            right,
            JoinParams::new(
                JoinType::Outer,
                ColumnName::of("s.a"),
                ColumnName::of("s2.a"),
            )
            .within(WithinExpression::of(5_000)),
            &stacker,
        )
        .unwrap();

    assert!(join.key_field().name().is_none());
}

#[test]
fn join_rejects_mismatched_partition_counts() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let left = builder
        .source(&source_name("S"), Some(&source_name("s")), &stacker)
        .unwrap();
    let right = builder
        .source(&source_name("S3"), Some(&source_name("s3")), &stacker)
        .unwrap();

    let err = builder.join(
        left,
        right,
        JoinParams::new(
            JoinType::Inner,
            ColumnName::of("s.a"),
            ColumnName::of("s3.a"),
        )
        .within(WithinExpression::of(1_000)),
        &stacker,
    );
    assert!(matches!(err, Err(RapidsError::PartitionCountMismatch { .. })));
}

#[test]
fn table_join_key_must_match() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let stream = builder
        .source(&source_name("S"), Some(&source_name("s")), &stacker)
        .unwrap();
    // T2 is keyed on x; joining on its 'a' column is rejected.
    let table = builder
        .source(&source_name("T2"), Some(&source_name("t2")), &stacker)
        .unwrap();

    let err = builder.join(
        stream,
        table,
        JoinParams::new(
            JoinType::Inner,
            ColumnName::of("s.a"),
            ColumnName::of("t2.a"),
        ),
        &stacker,
    );
    assert!(matches!(err, Err(RapidsError::TableJoinKeyMismatch { .. })));
}

#[test]
fn group_by_rowkey_needs_no_repartition() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let grouped = builder
        .group_by(source, vec![Expression::column("ROWKEY")], &stacker)
        .unwrap();

    assert!(!contains_repartition(&grouped));
}

#[test]
fn group_by_current_key_needs_no_repartition() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let grouped = builder
        .group_by(
            source,
            vec![Expression::qualified_column("S", "a")],
            &stacker,
        )
        .unwrap();

    assert!(!contains_repartition(&grouped));
    assert_eq!(grouped.key_field().name().map(|n| n.as_str()), Some("S.a"));
}

#[test]
fn legacy_mode_repartitions_on_rowkey() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let config = PlannerConfig::default().with_legacy_key_field_semantics(true);
    let planner = Planner::new(&catalog, &registry, config);
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let grouped = builder
        .group_by(source, vec![Expression::column("ROWKEY")], &stacker)
        .unwrap();

    assert!(contains_repartition(&grouped));
}

#[test]
fn partition_by_current_key_is_noop() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let repartitioned = builder
        .partition_by(source, ColumnName::of("S.a"), &stacker)
        .unwrap();
    assert!(!contains_repartition(&repartitioned));

    let rekeyed = builder
        .partition_by(repartitioned, ColumnName::of("S.b"), &stacker)
        .unwrap();
    assert!(contains_repartition(&rekeyed));
    assert_eq!(
        rekeyed.key_field().name().map(|n| n.as_str()),
        Some("S.b")
    );
}

#[test]
fn planning_is_deterministic() {
    let registry = CoreFunctionRegistry::new();

    let build = || {
        let catalog = catalog();
        let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
        let builder = planner.builder();
        let stacker = Stacker::new();

        let source = builder.source(&source_name("S"), None, &stacker).unwrap();
        let filtered = builder
            .filter(
                source,
                Expression::qualified_column("S", "a").gt(Expression::integer(0)),
                &stacker,
            )
            .unwrap();
        let grouped = builder
            .group_by(
                filtered,
                vec![Expression::qualified_column("S", "b")],
                &stacker,
            )
            .unwrap();
        let output_schema = LogicalSchema::builder()
            .value_column(ColumnName::of("b"), SqlType::String)
            .value_column(ColumnName::of("COL_0"), SqlType::Bigint)
            .build()
            .unwrap();
        builder
            .aggregate(
                grouped,
                output_schema,
                1,
                vec![Expression::function("COUNT", vec![])],
                None,
                &stacker,
            )
            .unwrap()
    };

    let first = build();
    let second = build();
    assert_eq!(first, second);
    assert_eq!(first.display_indent(0), second.display_indent(0));
}

#[test]
fn sink_passes_schema_through() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let source_schema = source.schema().clone();
    let sink = builder
        .sink(source, "out-topic", Format::Json, &stacker)
        .unwrap();

    assert_eq!(sink.schema(), &source_schema);
    assert!(matches!(sink, PlanNode::Sink { .. }));
}

#[test]
fn windowed_aggregate_carries_window() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let grouped = builder
        .group_by(
            source,
            vec![Expression::qualified_column("S", "b")],
            &stacker,
        )
        .unwrap();

    let output_schema = LogicalSchema::builder()
        .value_column(ColumnName::of("b"), SqlType::String)
        .value_column(ColumnName::of("COL_0"), SqlType::Bigint)
        .value_column(ColumnName::of("COL_1"), SqlType::Bigint)
        .build()
        .unwrap();

    let aggregate = builder
        .aggregate(
            grouped,
            output_schema,
            1,
            vec![
                Expression::function("COUNT", vec![]),
                Expression::function("WINDOWSTART", vec![]),
            ],
            Some(WindowType::Hopping {
                size_ms: 60_000,
                advance_ms: 30_000,
            }),
            &stacker,
        )
        .unwrap();

    match &aggregate {
        PlanNode::WindowedAggregate {
            window, key_window, ..
        } => {
            assert_eq!(
                *window,
                WindowType::Hopping {
                    size_ms: 60_000,
                    advance_ms: 30_000
                }
            );
            assert_eq!(key_window, window);
        }
        other => panic!("expected a windowed aggregate, got {}", other),
    }
    assert_eq!(aggregate.node_type(), NodeType::Table);
}

#[test]
fn hopping_window_advance_checked() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let grouped = builder
        .group_by(
            source,
            vec![Expression::qualified_column("S", "b")],
            &stacker,
        )
        .unwrap();

    let output_schema = LogicalSchema::builder()
        .value_column(ColumnName::of("b"), SqlType::String)
        .value_column(ColumnName::of("COL_0"), SqlType::Bigint)
        .build()
        .unwrap();

    let err = builder.aggregate(
        grouped,
        output_schema,
        1,
        vec![Expression::function("COUNT", vec![])],
        Some(WindowType::Hopping {
            size_ms: 10_000,
            advance_ms: 20_000,
        }),
        &stacker,
    );
    assert!(matches!(err, Err(RapidsError::InvalidArgument { .. })));
}

#[test]
fn legacy_session_key_encoding() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let config = PlannerConfig::default().with_windowed_session_key_legacy(true);
    let planner = Planner::new(&catalog, &registry, config);
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let grouped = builder
        .group_by(
            source,
            vec![Expression::qualified_column("S", "b")],
            &stacker,
        )
        .unwrap();

    let output_schema = LogicalSchema::builder()
        .value_column(ColumnName::of("b"), SqlType::String)
        .value_column(ColumnName::of("COL_0"), SqlType::Bigint)
        .build()
        .unwrap();

    let aggregate = builder
        .aggregate(
            grouped,
            output_schema,
            1,
            vec![Expression::function("COUNT", vec![])],
            Some(WindowType::Session { gap_ms: 30_000 }),
            &stacker,
        )
        .unwrap();

    match &aggregate {
        PlanNode::WindowedAggregate {
            window, key_window, ..
        } => {
            assert_eq!(*window, WindowType::Session { gap_ms: 30_000 });
            assert_eq!(
                *key_window,
                WindowType::Tumbling { size_ms: u64::MAX }
            );
        }
        other => panic!("expected a windowed aggregate, got {}", other),
    }
}

#[test]
fn aggregate_schema_arity_is_checked() {
    let catalog = catalog();
    let registry = CoreFunctionRegistry::new();
    let planner = Planner::new(&catalog, &registry, PlannerConfig::default());
    let builder = planner.builder();
    let stacker = Stacker::new();

    let source = builder.source(&source_name("S"), None, &stacker).unwrap();
    let grouped = builder
        .group_by(
            source,
            vec![Expression::qualified_column("S", "b")],
            &stacker,
        )
        .unwrap();

    // One group column + one aggregation needs two value columns.
    let too_narrow = LogicalSchema::builder()
        .value_column(ColumnName::of("b"), SqlType::String)
        .build()
        .unwrap();

    let err = builder.aggregate(
        grouped,
        too_narrow,
        1,
        vec![Expression::function("COUNT", vec![])],
        None,
        &stacker,
    );
    assert!(matches!(err, Err(RapidsError::SchemaArityMismatch { .. })));
}

fn contains_repartition(node: &PlanNode) -> bool {
    if matches!(node, PlanNode::Repartition { .. }) {
        return true;
    }
    node.children().into_iter().any(contains_repartition)
}
