//! Binds a merged argument bag to a handler's declared parameters.
//!
//! Lookup is by name, the result is positional in declaration order. Values
//! are passed through untouched: a path capture stays the string `"42"`, a
//! JSON body field keeps its JSON type.

use serde_json::{Map, Value};

use crate::{ApiError, ApiResult, Args, ParamSpec};

/// Binds `provided` to `specs`.
///
/// A key that is present wins even when its value is `null`. An absent key
/// falls back to the declared default; without one binding fails with
/// `missing_parameter` naming the first parameter that could not be bound.
///
/// # Example
///
/// ```
/// use feast_core::{bind, ParamSpec};
/// use serde_json::{json, Map};
///
/// let specs = [ParamSpec::required("id"), ParamSpec::optional("verbose", false)];
///
/// let mut provided = Map::new();
/// provided.insert("id".into(), json!("42"));
/// let args = bind(&specs, &provided).unwrap();
/// assert_eq!(args.values(), [json!("42"), json!(false)]);
///
/// provided.insert("verbose".into(), json!("true"));
/// let args = bind(&specs, &provided).unwrap();
/// assert_eq!(args.values(), [json!("42"), json!("true")]);
/// ```
pub fn bind(specs: &[ParamSpec], provided: &Map<String, Value>) -> ApiResult<Args> {
    let mut args = Args::new();
    for spec in specs {
        let value = match (provided.get(spec.name()), spec.default()) {
            (Some(value), _) | (None, Some(value)) => value.clone(),
            (None, None) => {
                tracing::debug!(param = spec.name(), "missing handler parameter");
                return Err(ApiError::missing_parameter(spec.name()));
            }
        };
        args.push(spec.name(), value);
    }
    Ok(args)
}
