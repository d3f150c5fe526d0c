//! Handler trait and declared parameter schemas.
//!
//! A handler states the parameters it wants, in the order it wants them,
//! through [`Handler::params`]. The binder looks each one up by name in the
//! merged argument bag and hands the values over positionally as [`Args`].

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde_json::Value;

use crate::{ApiError, ApiResult, RequestContext};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One declared handler parameter.
///
/// # Example
///
/// ```
/// use feast_core::ParamSpec;
/// use serde_json::json;
///
/// let id = ParamSpec::required("id");
/// let verbose = ParamSpec::optional("verbose", false);
///
/// assert!(id.default().is_none());
/// assert_eq!(verbose.default(), Some(&json!(false)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    name: String,
    default: Option<Value>,
}

impl ParamSpec {
    /// A parameter that must be supplied.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter that falls back to `default` when absent.
    #[must_use]
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default value, `None` for required parameters.
    #[must_use]
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns true when a default is declared.
    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Bound arguments, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    names: Vec<String>,
    values: Vec<Value>,
}

impl Args {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named value.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.names.push(name.into());
        self.values.push(value);
    }

    /// Value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value bound to parameter `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i))
    }

    /// Number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the list into its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Destructures into a fixed-size array.
    ///
    /// Fails with an internal error when the handler's declared schema and
    /// its destructuring disagree on the count.
    pub fn into_array<const N: usize>(self) -> ApiResult<[Value; N]> {
        let got = self.values.len();
        <[Value; N]>::try_from(self.values).map_err(|_| {
            ApiError::internal(format!("handler expected {N} arguments, bound {got}"))
        })
    }
}

/// An invocable unit with a declared parameter schema.
pub trait Handler: Send + Sync + 'static {
    /// Declared parameters, in call order.
    fn params(&self) -> &[ParamSpec];

    /// Invokes the handler with bound arguments.
    ///
    /// The returned future owns everything it needs; implementations copy
    /// what they want out of `ctx` before going async.
    fn call(&self, ctx: &RequestContext, args: Args) -> BoxFuture<'static, ApiResult<Value>>;
}

/// A closure-based handler.
///
/// # Example
///
/// ```
/// use feast_core::{FnHandler, Handler, ParamSpec};
///
/// let handler = FnHandler::new(
///     vec![ParamSpec::required("id"), ParamSpec::optional("verbose", false)],
///     |_ctx, args| async move {
///         let [id, verbose] = args.into_array()?;
///         Ok(serde_json::json!({ "id": id, "verbose": verbose }))
///     },
/// );
/// assert_eq!(handler.params().len(), 2);
/// ```
pub struct FnHandler<F> {
    params: Vec<ParamSpec>,
    func: F,
}

impl<F, Fut, T> FnHandler<F>
where
    F: Fn(&RequestContext, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    /// Wraps `func` with its parameter schema.
    pub fn new(params: Vec<ParamSpec>, func: F) -> Self {
        Self { params, func }
    }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl<F, Fut, T> Handler for FnHandler<F>
where
    F: Fn(&RequestContext, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn call(&self, ctx: &RequestContext, args: Args) -> BoxFuture<'static, ApiResult<Value>> {
        let fut = (self.func)(ctx, args);
        Box::pin(async move {
            let value = fut.await?;
            serde_json::to_value(value)
                .map_err(|e| ApiError::internal(format!("failed to serialize result: {e}")))
        })
    }
}
