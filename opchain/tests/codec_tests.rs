use opchain::{
    encode, CallStep, CapabilityTable, Chain, ChainSource, ChainStep, GotoStep, Runtime,
    RuntimeError, StepOutcome, Value,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn sample_runtime() -> Runtime {
    let mut counter = CapabilityTable::new();
    counter
        .register("add", |_ctx, data, args| {
            let base = data.as_integer().unwrap_or(0);
            let delta = args.first().and_then(Value::as_integer).unwrap_or(0);
            Ok(StepOutcome::value(Value::Integer(base + delta)))
        })
        .unwrap();

    let mut root = CapabilityTable::new();
    root.register("mul", |_ctx, data, args| {
        let base = data.as_integer().unwrap_or(0);
        let factor = args.first().and_then(Value::as_integer).unwrap_or(1);
        Ok(StepOutcome::value(Value::Integer(base * factor)))
    })
    .unwrap();
    root.register("emit", |_ctx, data, _args| Ok(StepOutcome::value(data)))
        .unwrap();
    root.register_namespace("counter", counter).unwrap();
    Runtime::new(root, Value::Nil)
}

#[test]
fn empty_source_decodes_to_empty_chain() {
    let rt = sample_runtime();
    let chain = rt.decode(ChainSource::Empty).unwrap();
    assert!(chain.is_empty());
}

#[test]
fn encode_decode_round_trips_builder_chains() {
    let rt = sample_runtime();
    let chain = rt
        .navigator()
        .enter("counter")
        .unwrap()
        .call("add", vec![Value::Integer(2)])
        .unwrap()
        .call("mul", vec![Value::Integer(3)])
        .unwrap()
        .into_chain();

    let decoded = rt.decode(encode(&chain)).unwrap();
    assert_eq!(decoded, chain);
    assert_eq!(encode(&decoded), encode(&chain));
}

#[test]
fn round_tripped_chains_behave_identically() {
    let rt = sample_runtime();
    let chain = rt
        .navigator()
        .enter("counter")
        .unwrap()
        .call("add", vec![Value::Integer(2)])
        .unwrap()
        .call("mul", vec![Value::Integer(3)])
        .unwrap()
        .into_chain();
    let decoded = rt.decode(encode(&chain)).unwrap();

    let original = rt.run(&chain, Value::Integer(1)).unwrap();
    let replayed = rt.run(&decoded, Value::Integer(1)).unwrap();
    assert_eq!(original.into_complete(), replayed.into_complete());
}

#[test]
fn nested_chain_arguments_round_trip_structurally() {
    let rt = sample_runtime();
    let inner = rt
        .navigator()
        .enter("counter")
        .unwrap()
        .call("add", vec![Value::Integer(1)])
        .unwrap();
    let chain = rt
        .navigator()
        .call("emit", vec![Value::from(inner.chain().clone())])
        .unwrap()
        .into_chain();

    let encoded = encode(&chain);
    assert_eq!(
        encoded,
        json!([
            {"method": "emit", "args": [[{"method": "counter.add", "args": [1]}]]},
        ])
    );

    let decoded = rt.decode(encoded).unwrap();
    assert_eq!(decoded, chain);
    match &decoded.steps()[0] {
        ChainStep::Call(call) => assert!(matches!(call.args[0], Value::Chain(_))),
        ChainStep::Goto(_) => unreachable!(),
    }
}

#[test]
fn expression_decodes_like_the_builder() {
    let rt = sample_runtime();
    let from_expression = rt.decode("counter.add(2).mul(3)").unwrap();
    let from_builder = rt
        .navigator()
        .enter("counter")
        .unwrap()
        .call("add", vec![Value::Integer(2)])
        .unwrap()
        .call("mul", vec![Value::Integer(3)])
        .unwrap()
        .into_chain();
    assert_eq!(from_expression, from_builder);
}

#[test]
fn expression_supports_goto_and_nested_chains() {
    let rt = sample_runtime();
    let chain = rt
        .decode("emit(\"a\").goto(emit(\"a\")).emit(counter.add(1))")
        .unwrap();

    assert!(matches!(&chain.steps()[1], ChainStep::Goto(jump) if jump.target == "emit"));
    match &chain.steps()[2] {
        ChainStep::Call(call) => match &call.args[0] {
            Value::Chain(inner) => {
                assert!(
                    matches!(&inner.steps()[0], ChainStep::Call(c) if c.method == "counter.add")
                );
            }
            other => panic!("expected embedded chain, got {}", other.type_name()),
        },
        ChainStep::Goto(_) => unreachable!(),
    }
}

#[test]
fn malformed_expressions_fail_at_decode_time() {
    let rt = sample_runtime();
    assert!(matches!(
        rt.decode("counter.add("),
        Err(RuntimeError::ExpressionError(_))
    ));
    assert!(matches!(
        rt.decode("unknown.op(1)"),
        Err(RuntimeError::ExpressionError(_))
    ));
}

#[test]
fn decoding_existing_chains_renormalizes_arguments() {
    let rt = sample_runtime();
    // A hand-built chain carrying a structurally encoded sub-chain.
    let chain = Chain::from_steps(vec![ChainStep::Call(CallStep::new(
        "emit",
        vec![Value::from(json!([{"method": "emit", "args": []}]))],
    ))]);
    let decoded = rt.decode(&chain).unwrap();
    match &decoded.steps()[0] {
        ChainStep::Call(call) => assert!(matches!(call.args[0], Value::Chain(_))),
        ChainStep::Goto(_) => unreachable!(),
    }
}

// Strategies for the structural round-trip property: args avoid the two
// step-object shapes, which decode canonicalizes into embedded chains.
fn arb_method() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z]{1,6}(\\.[a-z]{1,6}){0,2}").unwrap()
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Boolean),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9..1.0e9f64).prop_map(Value::Float),
        "[a-z0-9 ]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Vector),
            prop::collection::vec(("k[0-9]", inner), 0..4).prop_map(|entries| {
                Value::Map(entries.into_iter().collect())
            }),
        ]
    })
}

fn arb_step() -> impl Strategy<Value = ChainStep> {
    prop_oneof![
        (arb_method(), prop::collection::vec(arb_value(), 0..3))
            .prop_map(|(method, args)| ChainStep::Call(CallStep::new(method, args))),
        (arb_method(), prop::collection::vec(arb_value(), 0..3)).prop_map(|(target, args)| ChainStep::Goto(GotoStep {
            target,
            args,
        })),
    ]
}

proptest! {
    #[test]
    fn encode_decode_is_structurally_stable(steps in prop::collection::vec(arb_step(), 0..6)) {
        let rt = sample_runtime();
        let chain = Chain::from_steps(steps);
        let encoded = encode(&chain);
        let decoded = rt.decode(encoded.clone()).unwrap();
        prop_assert_eq!(encode(&decoded), encoded);
    }
}
