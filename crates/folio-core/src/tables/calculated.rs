use super::formula::Formula;
use super::CalculatedSpec;
use crate::error::FolioError;
use crate::model::Row;
use rust_decimal::Decimal;

/// Rows `[x, f(x)]` for every integer in the inclusive range, or the
/// expanded lookup pairs. No document access.
pub fn rows(spec: &CalculatedSpec) -> Result<Vec<Row>, FolioError> {
    match (&spec.formula, spec.range) {
        (Some(src), Some((start, end))) => {
            let formula = Formula::parse(src)?;
            (start..=end)
                .map(|x| {
                    let value = formula.eval(Decimal::from(x))?;
                    Ok::<_, FolioError>(Row::new(vec![x.to_string(), format_decimal(value)]))
                })
                .collect()
        }
        (Some(_), None) => Err(FolioError::Config(
            "calculated formula needs a range".into(),
        )),
        (None, _) => Ok(expand_lookup(spec)),
    }
}

fn expand_lookup(spec: &CalculatedSpec) -> Vec<Row> {
    spec.lookup
        .iter()
        .flat_map(|pair| {
            (pair.from..=pair.to).map(move |x| Row::new(vec![x.to_string(), pair.value.clone()]))
        })
        .collect()
}

/// Trailing zeros dropped: `3.0` prints as `3`, `4.50` as `4.5`.
pub fn format_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}
