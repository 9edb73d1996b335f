use std::collections::BTreeSet;
use std::sync::Arc;

use jsonmux::conformance::{assert_conforms_to, ModelField, ModelSchema, ModelValueKind};
use jsonmux::{Demux, DemuxValue, SchemaBuilder, SinkKind, ValueKind};

#[tokio::test]
async fn multiple_awaiters_observe_the_same_resolution() {
    let schema = SchemaBuilder::new()
        .field("n", SinkKind::Single, ValueKind::Integer)
        .build();
    let demux = Demux::new(schema);

    let sink = demux.get("n").unwrap();
    let a = sink.get();
    let b = sink.get();
    demux.feed_chunks(r#"{"n":7}"#).unwrap();
    let (a, b) = tokio::join!(a, b);

    match (a.unwrap(), b.unwrap()) {
        (DemuxValue::Integer(7), DemuxValue::Integer(7)) => {}
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn conformance_checker_accepts_a_matching_model() {
    let schema = SchemaBuilder::new()
        .field("role", SinkKind::Single, ValueKind::Enumerated(Arc::new(BTreeSet::from(["user".to_string(), "assistant".to_string()]))))
        .field("content", SinkKind::Stream, ValueKind::String)
        .build();

    let model = ModelSchema::new(vec![
        ModelField {
            name: "role".to_string(),
            kind: ModelValueKind::Enumerated(BTreeSet::from(["user".to_string(), "assistant".to_string()])),
        },
        ModelField { name: "content".to_string(), kind: ModelValueKind::String },
    ]);

    assert!(assert_conforms_to(&schema, &model).is_ok());
}

#[tokio::test]
async fn conformance_checker_rejects_a_diverging_model() {
    let schema = SchemaBuilder::new()
        .field("role", SinkKind::Single, ValueKind::String)
        .build();
    let model = ModelSchema::new(vec![ModelField { name: "role".to_string(), kind: ModelValueKind::Integer }]);

    let err = assert_conforms_to(&schema, &model).unwrap_err();
    assert!(matches!(err, jsonmux::DemuxError::SchemaMismatch { .. }));
}

#[tokio::test]
async fn a_whole_chat_message_streams_end_to_end() {
    let inner = SchemaBuilder::new()
        .field("tokens", SinkKind::Single, ValueKind::Integer)
        .build();
    let schema = SchemaBuilder::new()
        .field("role", SinkKind::Single, ValueKind::Enumerated(Arc::new(BTreeSet::from(["assistant".to_string()]))))
        .field("content", SinkKind::Stream, ValueKind::String)
        .field("usage", SinkKind::Single, ValueKind::Nested(Arc::new(inner)))
        .build();
    let demux = Demux::new(schema);

    let mut content = demux.stream("content").unwrap().iterate();
    let role = demux.get("role").unwrap();
    let usage = demux.nested("usage").unwrap().clone();

    demux.feed_chunks(r#"{"role":"assistant","content":"hel"#).unwrap();
    demux
        .feed_chunks(r#"lo","usage":{"tokens":12}}"#)
        .unwrap();

    match role.get().await.unwrap() {
        DemuxValue::Enumerated(r) => assert_eq!(r, "assistant"),
        other => panic!("unexpected {other:?}"),
    }

    let mut text = String::new();
    while let Some(Ok(c)) = content.next().await {
        text.push(c);
    }
    assert_eq!(text, "hello");

    match usage.get("tokens").unwrap().get().await.unwrap() {
        DemuxValue::Integer(12) => {}
        other => panic!("unexpected {other:?}"),
    }
}
