use std::sync::Arc;

use arrow::array::Array;
use arrow::array::ArrayRef;
use arrow::array::BooleanArray;
use arrow::array::Int64Array;
use arrow::array::ListArray;
use arrow::array::ListBuilder;
use arrow::array::RecordBatch;
use arrow::array::StringArray;
use arrow::array::StringBuilder;
use compute::test_util::driver_context;
use compute::udf::register_conversions;
use datafusion::error::Result;
use datafusion::prelude::SessionContext;

fn batch() -> RecordBatch {
    let s = Arc::new(StringArray::from(vec![
        Some("TRUE"),
        None,
        Some("false"),
        Some("12"),
    ])) as ArrayRef;

    let mut l = ListBuilder::new(StringBuilder::new());
    l.values().append_value("TRUE");
    l.append(true);
    l.append(false);
    l.values().append_value("false");
    l.append(true);
    l.values().append_value("T");
    l.values().append_value("0");
    l.append(true);
    let l = Arc::new(l.finish()) as ArrayRef;

    RecordBatch::try_from_iter(vec![("s", s), ("l", l)]).unwrap()
}

#[tokio::test]
async fn to_boolean_columns() -> Result<()> {
    let ctx = driver_context();
    let session = SessionContext::new();
    register_conversions(&session, ctx.clone());
    session.register_batch("t", batch())?;

    let batches = session
        .sql("select to_boolean(s) as b, to_boolean(l) as lb from t")
        .await?
        .collect()
        .await?;
    assert_eq!(batches.len(), 1);
    let res = &batches[0];

    let b = res
        .column(0)
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap();
    assert_eq!(
        b,
        &BooleanArray::from(vec![Some(true), None, Some(false), Some(false)])
    );

    let lb = res.column(1).as_any().downcast_ref::<ListArray>().unwrap();
    assert_eq!(lb.len(), 4);
    assert!(lb.is_null(1));
    let multi = lb.value(3);
    let multi = multi.as_any().downcast_ref::<BooleanArray>().unwrap();
    assert_eq!(multi, &BooleanArray::from(vec![true, false]));

    assert!(ctx.warnings().is_empty());
    Ok(())
}

#[tokio::test]
async fn to_long_registers_warnings() -> Result<()> {
    let ctx = driver_context();
    let session = SessionContext::new();
    register_conversions(&session, ctx.clone());
    session.register_batch("t", batch())?;

    let batches = session
        .sql("select to_long(s) as v from t")
        .await?
        .collect()
        .await?;
    let v = batches[0]
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();

    assert_eq!(v, &Int64Array::from(vec![None, None, None, Some(12)]));
    let warnings = ctx.warnings();
    assert_eq!(warnings.len(), 3);
    assert!(warnings[1].contains("cannot parse [TRUE] as a number"));
    Ok(())
}

#[tokio::test]
async fn to_string_of_literal() -> Result<()> {
    let session = SessionContext::new();
    register_conversions(&session, driver_context());

    let batches = session
        .sql("select to_string(cast(42 as bigint)) as v")
        .await?
        .collect()
        .await?;
    let v = batches[0]
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();

    assert_eq!(v.value(0), "42");
    Ok(())
}
