//! The contract between an HTTP dispatcher and mappable types.
//!
//! A dispatcher allocates a value, decodes the request body into it, and
//! calls the trait matching the method with the path suffix after the
//! registered prefix (the "element"). What a type GETs is what it accepts
//! on PUT and POST. Errors carry their status through [`Error::code`], and
//! [`Report::from_result`] turns any write outcome into a response body.

use crate::client::Executor;
use crate::error::{Error, Result};
use crate::report::Report;
use std::future::Future;

/// Fetch the object identified by the element into `self`.
pub trait Getter: Send + Sync {
    fn get<C: Executor>(
        &mut self,
        db: &C,
        element: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Idempotently (over-)write the object at the element path.
pub trait Putter: Send + Sync {
    fn put<C: Executor>(
        &self,
        db: &C,
        element: &str,
    ) -> impl Future<Output = Result<Report>> + Send;
}

/// Write the object contained entirely in `self`.
pub trait Poster: Send + Sync {
    fn post<C: Executor>(&self, db: &C) -> impl Future<Output = Result<Report>> + Send;
}

/// Delete the object at the element path; deleting a missing object is not
/// an error.
pub trait Deleter: Send + Sync {
    fn delete<C: Executor>(
        &self,
        db: &C,
        element: &str,
    ) -> impl Future<Output = Result<Report>> + Send;
}

/// Pick the key addressing an object from the URL element and the body.
///
/// Either may be blank, but not both, and when both are given they must
/// agree: the key column is never rewritten, so a mismatch cannot rename.
pub fn element_key<'a>(element: &'a str, body_key: Option<&'a str>) -> Result<&'a str> {
    let element = element.trim_matches('/');
    let body_key = body_key.filter(|k| !k.is_empty());
    match (element.is_empty(), body_key) {
        (true, None) => Err(Error::malformed_predicate(
            "the key can't be blank: give it in the path or the body",
        )),
        (true, Some(key)) => Ok(key),
        (false, Some(key)) if key != element => Err(Error::malformed_predicate(format!(
            "the key in the path ({element}) and the body ({key}) don't match"
        ))),
        (false, _) => Ok(element),
    }
}
