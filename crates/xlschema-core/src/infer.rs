use crate::model::DataType;

pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

const BOOL_LITERALS: [&str; 6] = ["true", "false", "yes", "no", "0", "1"];

/// Infers a column type from the first `sample_limit` non-empty values,
/// taken in row order.
///
/// Every sampled value must agree for a candidate to survive. Resolution
/// prefers `bool`, then `int`, then `float`; `string` is the fallback, and
/// also the answer for a column with no non-empty values. A column of bare
/// `0`/`1` therefore comes out as `bool`.
pub fn infer_type<I, S>(samples: I, sample_limit: usize) -> DataType
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut is_bool = true;
    let mut is_int = true;
    let mut is_float = true;
    let mut sampled = 0usize;

    for sample in samples {
        if sampled >= sample_limit {
            break;
        }
        let value = sample.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        sampled += 1;

        if is_bool && !is_bool_literal(value) {
            is_bool = false;
        }
        if is_int && parse_int(value).is_none() {
            is_int = false;
        }
        if is_float && parse_float(value).is_none() {
            is_float = false;
        }
    }

    if sampled == 0 {
        return DataType::String;
    }

    if is_bool {
        DataType::Bool
    } else if is_int {
        DataType::Int
    } else if is_float {
        DataType::Float
    } else {
        DataType::String
    }
}

/// Cells of one column in row order. Rows shorter than the column yield an
/// empty string.
pub fn column_values<'a>(
    rows: &'a [Vec<String>],
    column: usize,
) -> impl Iterator<Item = &'a str> + 'a {
    rows.iter()
        .map(move |row| row.get(column).map(String::as_str).unwrap_or(""))
}

pub(crate) fn is_bool_literal(value: &str) -> bool {
    let lower = value.to_lowercase();
    BOOL_LITERALS.contains(&lower.as_str())
}

pub(crate) fn parse_int(value: &str) -> Option<i64> {
    value.parse::<i64>().ok()
}

/// Decimal parse restricted to finite values; `inf`/`NaN` have no JSON form.
pub(crate) fn parse_float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}
