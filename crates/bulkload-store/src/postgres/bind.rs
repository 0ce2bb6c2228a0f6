use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgRow, PgTypeInfo};
use sqlx::query::Query;
use sqlx::{Column, Decode, Encode, Postgres, Row, Type, TypeInfo};
use uuid::Uuid;

use bulkload_core::{Error, Result, Value};

/// NULL sent with an unspecified type so the server infers it from context.
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(
        &self,
        _buf: &mut PgArgumentBuffer,
    ) -> std::result::Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

pub(super) fn bind_all<'q>(
    query: Query<'q, Postgres, PgArguments>,
    values: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    values.iter().fold(query, bind_value)
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(UntypedNull),
        Value::Bool(flag) => query.bind(*flag),
        Value::Int(int) => query.bind(*int),
        Value::Float(float) => query.bind(*float),
        Value::Text(text) => query.bind(text.clone()),
        Value::Bytes(bytes) => query.bind(bytes.clone()),
        Value::Timestamp(ts) => query.bind(*ts),
        Value::Date(date) => query.bind(*date),
        Value::Uuid(uuid) => query.bind(*uuid),
        Value::Json(json) => query.bind(sqlx::types::Json(json.clone())),
    }
}

/// Decode every column of a row into a [`Value`] by its Postgres type.
pub(super) fn decode_row(row: &PgRow) -> Result<Vec<Value>> {
    (0..row.len()).map(|index| decode_column(row, index)).collect()
}

fn decode_column(row: &PgRow, index: usize) -> Result<Value> {
    let type_name = row.column(index).type_info().name().to_ascii_uppercase();
    let value = match type_name.as_str() {
        "BOOL" => get::<bool>(row, index)?.map(Value::Bool),
        "INT2" => get::<i16>(row, index)?.map(|int| Value::Int(i64::from(int))),
        "INT4" => get::<i32>(row, index)?.map(|int| Value::Int(i64::from(int))),
        "INT8" => get::<i64>(row, index)?.map(Value::Int),
        "FLOAT4" => get::<f32>(row, index)?.map(|float| Value::Float(f64::from(float))),
        "FLOAT8" => get::<f64>(row, index)?.map(Value::Float),
        "NUMERIC" => get::<Decimal>(row, index)?.map(decimal_value),
        "TEXT" | "VARCHAR" | "NAME" | "CITEXT" => get::<String>(row, index)?.map(Value::Text),
        // Fixed-width values come back blank-padded; comparisons ignore the padding.
        "BPCHAR" | "CHAR" => get::<String>(row, index)?
            .map(|text| Value::Text(text.trim_end_matches(' ').to_string())),
        "BYTEA" => get::<Vec<u8>>(row, index)?.map(Value::Bytes),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index)?.map(Value::Timestamp),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index)?
            .map(|ts| Value::Timestamp(ts.and_utc())),
        "DATE" => get::<NaiveDate>(row, index)?.map(Value::Date),
        "UUID" => get::<Uuid>(row, index)?.map(Value::Uuid),
        "JSON" | "JSONB" => get::<sqlx::types::Json<serde_json::Value>>(row, index)?
            .map(|json| Value::Json(json.0)),
        other => {
            return Err(Error::Store(format!(
                "unsupported column type `{other}` for column `{}`",
                row.column(index).name()
            )))
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Integral decimals become `Int`, others `Float`, matching how keys are encoded.
fn decimal_value(decimal: Decimal) -> Value {
    let decimal = decimal.normalize();
    if decimal.scale() == 0 {
        if let Some(int) = decimal.to_i64() {
            return Value::Int(int);
        }
    }
    let text = decimal.to_string();
    text.parse::<f64>()
        .map(Value::Float)
        .unwrap_or(Value::Text(text))
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .map_err(|err| Error::Store(err.to_string()))
}
