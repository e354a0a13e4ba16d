use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arrow::array::Array;
use arrow::array::BinaryArray;
use arrow::array::Int64Array;
use compute::convert;
use compute::convert::to_boolean::ToBooleanFromString;
use compute::convert::to_long::ToLongFromString;
use compute::convert::ConversionError;
use compute::convert::ConversionFunction;
use compute::convert::ConversionPolicy;
use compute::convert::ConvertEvaluator;
use compute::convert::Source;
use compute::data::BooleanType;
use compute::data::BytesRefType;
use compute::data::ElementKind;
use compute::data::LongType;
use compute::operator::DriverContext;
use compute::operator::ExpressionEvaluator;
use compute::operator::ExpressionEvaluatorFactory;
use compute::operator::LoadFromPageFactory;
use compute::operator::TypedEvaluator;
use compute::test_util::block_of;
use compute::test_util::driver_context;
use compute::test_util::page_of;
use compute::test_util::rows_of;
use compute::test_util::text_block;
use compute::test_util::typed;
use compute::BlockFactory;
use compute::ComputeError;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tracing_test::traced_test;

const WORDS: [&str; 12] = [
    "true", "TRUE", "t", "Yes", "1", "false", "F", "no", "0", "maybe", "", "ÿes",
];

fn field() -> Arc<dyn ExpressionEvaluatorFactory> {
    Arc::new(LoadFromPageFactory::new(0))
}

fn to_boolean(ctx: &Arc<DriverContext>) -> Box<dyn ExpressionEvaluator> {
    convert::factory(
        ElementKind::Boolean,
        ElementKind::BytesRef,
        field(),
        Source::new(1, 1, "to_boolean(f)"),
    )
    .unwrap()
    .get(ctx)
    .unwrap()
}

fn typed_to_boolean(ctx: &Arc<DriverContext>) -> ConvertEvaluator<ToBooleanFromString> {
    ConvertEvaluator::new(
        ctx.clone(),
        LoadFromPageFactory::new(0).get(ctx).unwrap(),
        Source::default(),
    )
}

fn random_rows(rng: &mut StdRng, positions: usize, max_values: usize) -> Vec<Vec<&'static str>> {
    (0..positions)
        .map(|_| {
            let values = rng.gen_range(0..=max_values);
            (0..values)
                .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
                .collect()
        })
        .collect()
}

#[test]
fn multivalued_block() {
    let ctx = driver_context();
    let block = text_block(ctx.block_factory(), &[
        vec!["TRUE"],
        vec![],
        vec!["false"],
        vec!["T", "0"],
    ])
    .unwrap();
    let page = page_of(block).unwrap();

    let out = to_boolean(&ctx).eval(&page).unwrap();
    let out_block = typed::<BooleanType>(&out).unwrap();

    assert_eq!(rows_of::<BooleanType>(&out).unwrap(), vec![
        vec![true],
        vec![],
        vec![false],
        vec![true, false],
    ]);
    assert_eq!(out_block.value_count(0), 1);
    assert!(out_block.is_null(1));
    assert_eq!(out_block.value_count(2), 1);
    assert_eq!(out_block.value_count(3), 2);
    assert!(ctx.warnings().is_empty());
}

#[test]
fn constant_vector() {
    let ctx = driver_context();
    let block = ctx
        .block_factory()
        .new_constant_block::<BytesRefType>(b"YES".as_slice(), 5)
        .unwrap();
    let page = page_of(block).unwrap();

    let out = to_boolean(&ctx).eval(&page).unwrap();
    let vector = typed::<BooleanType>(&out).unwrap().as_vector().unwrap();

    assert!(vector.is_constant());
    assert_eq!(vector.position_count(), 5);
    assert_eq!(vector.values().len(), 1);
    assert!((0..5).all(|p| vector.value(p)));
}

static NON_EMPTY_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct CountingNonEmpty;

impl ConversionFunction for CountingNonEmpty {
    type Input = BytesRefType;
    type Output = BooleanType;
    type Scratch = ();

    const NAME: &'static str = "CountingNonEmpty";
    const POLICY: ConversionPolicy = ConversionPolicy::Total;

    fn apply<'s>(value: &[u8], _scratch: &'s mut ()) -> Result<bool, ConversionError> {
        NON_EMPTY_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(!value.is_empty())
    }
}

#[test]
fn function_called_once_per_value() {
    let ctx = driver_context();
    let mut eval = ConvertEvaluator::<CountingNonEmpty>::new(
        ctx.clone(),
        LoadFromPageFactory::new(0).get(&ctx).unwrap(),
        Source::default(),
    );

    let block = text_block(ctx.block_factory(), &[
        vec!["a"],
        vec![],
        vec![],
        vec!["b", "c"],
    ])
    .unwrap();
    NON_EMPTY_CALLS.store(0, Ordering::SeqCst);
    let out = eval.eval(&page_of(block).unwrap()).unwrap();
    assert_eq!(NON_EMPTY_CALLS.load(Ordering::SeqCst), 3);
    assert_eq!(rows_of::<BooleanType>(&out).unwrap(), vec![
        vec![true],
        vec![],
        vec![],
        vec![true, true],
    ]);

    let constant = ctx
        .block_factory()
        .new_constant_block::<BytesRefType>(b"a".as_slice(), 1000)
        .unwrap();
    NON_EMPTY_CALLS.store(0, Ordering::SeqCst);
    let out = eval.eval(&page_of(constant).unwrap()).unwrap();
    assert_eq!(NON_EMPTY_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(out.position_count(), 1000);
}

#[test]
fn cardinality_and_null_propagation() {
    let ctx = driver_context();
    let mut rng = StdRng::seed_from_u64(42);
    let mut eval = to_boolean(&ctx);

    for _ in 0..20 {
        let positions = rng.gen_range(0..64);
        let rows = random_rows(&mut rng, positions, 3);
        let block = text_block(ctx.block_factory(), &rows).unwrap();
        let out = eval.eval(&page_of(block).unwrap()).unwrap();
        let out = typed::<BooleanType>(&out).unwrap();

        assert_eq!(out.position_count(), rows.len());
        for (p, row) in rows.iter().enumerate() {
            assert_eq!(out.value_count(p), row.len());
            assert_eq!(out.is_null(p), row.is_empty());
        }
    }
}

#[test]
fn vector_and_block_paths_agree() {
    let ctx = driver_context();
    let mut rng = StdRng::seed_from_u64(7);
    let mut eval = typed_to_boolean(&ctx);

    for _ in 0..20 {
        let words = (0..rng.gen_range(1..64))
            .map(|_| WORDS[rng.gen_range(0..WORDS.len())].as_bytes())
            .collect::<Vec<_>>();
        let vector = ctx
            .block_factory()
            .new_vector::<BytesRefType>(BinaryArray::from_vec(words.clone()))
            .unwrap();
        let rows = words.iter().map(|w| vec![w.to_vec()]).collect::<Vec<_>>();
        let block = block_of::<BytesRefType>(ctx.block_factory(), &rows).unwrap();

        let from_vector = eval.eval_vector(&vector).unwrap();
        let from_block = eval.eval_block(&block).unwrap();

        assert_eq!(from_vector, from_block);
    }
}

#[test]
fn constant_path_agrees_with_block_path() {
    let ctx = driver_context();
    let mut eval = typed_to_boolean(&ctx);

    for word in WORDS {
        let block = ctx
            .block_factory()
            .new_constant_block::<BytesRefType>(word.as_bytes(), 9)
            .unwrap();
        let vector = block.as_vector().unwrap();

        let fast = eval.eval_vector(vector).unwrap();
        let general = eval.eval_block(&block).unwrap();

        assert_eq!(fast, general, "{word}");
    }
}

#[test]
fn repeated_evaluation_is_identical() {
    let ctx = driver_context();
    let mut rng = StdRng::seed_from_u64(3);
    let rows = random_rows(&mut rng, 128, 4);
    let page = page_of(text_block(ctx.block_factory(), &rows).unwrap()).unwrap();

    let mut eval = to_boolean(&ctx);
    let first = eval.eval(&page).unwrap();
    let second = eval.eval(&page).unwrap();

    assert_eq!(first, second);
}

#[test]
fn partial_function_nulls_and_warnings() {
    let ctx = driver_context();
    let block = text_block(ctx.block_factory(), &[
        vec!["1"],
        vec!["x"],
        vec!["2", "y"],
        vec!["z", "w"],
        vec![],
    ])
    .unwrap();

    let mut eval = convert::factory(
        ElementKind::Long,
        ElementKind::BytesRef,
        field(),
        Source::new(2, 5, "to_long(f)"),
    )
    .unwrap()
    .get(&ctx)
    .unwrap();
    let out = eval.eval(&page_of(block).unwrap()).unwrap();

    assert_eq!(rows_of::<LongType>(&out).unwrap(), vec![
        vec![1],
        vec![],
        vec![2],
        vec![],
        vec![],
    ]);
    assert_eq!(ctx.warnings(), vec![
        "Line 2:5: evaluation of [to_long(f)] failed, treating result as null. Only first 20 failures recorded.",
        "Line 2:5: cannot parse [x] as a number",
        "Line 2:5: cannot parse [y] as a number",
        "Line 2:5: cannot parse [z] as a number",
        "Line 2:5: cannot parse [w] as a number",
    ]);
}

#[test]
fn partial_function_paths_register_same_warnings() {
    let words = ["7", "seven", "7.5", "x"];

    let vector_ctx = driver_context();
    let mut eval = ConvertEvaluator::<ToLongFromString>::new(
        vector_ctx.clone(),
        LoadFromPageFactory::new(0).get(&vector_ctx).unwrap(),
        Source::new(1, 1, "to_long(f)"),
    );
    let vector = vector_ctx
        .block_factory()
        .new_vector::<BytesRefType>(BinaryArray::from_vec(
            words.iter().map(|w| w.as_bytes()).collect(),
        ))
        .unwrap();
    let from_vector = eval.eval_vector(&vector).unwrap();

    let block_ctx = driver_context();
    let mut eval = ConvertEvaluator::<ToLongFromString>::new(
        block_ctx.clone(),
        LoadFromPageFactory::new(0).get(&block_ctx).unwrap(),
        Source::new(1, 1, "to_long(f)"),
    );
    let rows = words.iter().map(|w| vec![*w]).collect::<Vec<_>>();
    let block = text_block(block_ctx.block_factory(), &rows).unwrap();
    let from_block = eval.eval_block(&block).unwrap();

    assert_eq!(from_vector, from_block);
    assert_eq!(eval.warnings().failures(), 2);
    assert_eq!(vector_ctx.warnings(), block_ctx.warnings());
    assert_eq!(block_ctx.warnings().len(), 3);
}

#[test]
fn constant_failure_is_constant_null() {
    let ctx = driver_context();
    let block = ctx
        .block_factory()
        .new_constant_block::<BytesRefType>(b"n/a".as_slice(), 4)
        .unwrap();

    let mut eval = convert::factory(ElementKind::Double, ElementKind::BytesRef, field(), Source::default())
        .unwrap()
        .get(&ctx)
        .unwrap();
    let out = eval.eval(&page_of(block).unwrap()).unwrap();

    assert_eq!(out.position_count(), 4);
    assert!(rows_of::<compute::data::DoubleType>(&out)
        .unwrap()
        .iter()
        .all(|row| row.is_empty()));
    // one failure, one header
    assert_eq!(ctx.warnings().len(), 2);
}

#[traced_test]
#[test]
fn logs_evaluator_and_warnings() {
    let ctx = driver_context();
    let block = text_block(ctx.block_factory(), &[vec!["x"]]).unwrap();

    let mut eval = convert::factory(ElementKind::Long, ElementKind::BytesRef, field(), Source::default())
        .unwrap()
        .get(&ctx)
        .unwrap();
    eval.eval(&page_of(block).unwrap()).unwrap();

    assert!(logs_contain(
        "ToLongFromStringEvaluator[field=Attribute[channel=0]]"
    ));
    assert!(logs_contain("cannot parse [x] as a number"));
}

#[test]
fn memory_limit_fails_and_releases() {
    let input = BlockFactory::unbounded();
    let block = input
        .new_vector::<LongType>(Int64Array::from((0..1000).collect::<Vec<i64>>()))
        .unwrap()
        .into_block();
    let page = page_of(block).unwrap();

    let ctx = Arc::new(DriverContext::new(BlockFactory::with_memory_limit(1024)));
    let mut eval = convert::factory(ElementKind::BytesRef, ElementKind::Long, field(), Source::default())
        .unwrap()
        .get(&ctx)
        .unwrap();

    let res = eval.eval(&page);
    assert!(matches!(res, Err(ComputeError::DataFusion(_))));
    assert_eq!(ctx.block_factory().reserved(), 0);
}

#[test]
fn output_memory_is_released_on_drop() {
    let ctx = driver_context();
    let block = text_block(ctx.block_factory(), &[vec!["t"], vec!["f", "t"]]).unwrap();
    let page = page_of(block).unwrap();
    let input_bytes = ctx.block_factory().reserved();

    let out = to_boolean(&ctx).eval(&page).unwrap();
    assert!(ctx.block_factory().reserved() > input_bytes);

    drop(out);
    assert_eq!(ctx.block_factory().reserved(), input_bytes);
    drop(page);
    assert_eq!(ctx.block_factory().reserved(), 0);
}
