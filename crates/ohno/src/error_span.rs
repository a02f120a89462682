// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::error::Error as StdError;

use crate::{OhnoCore, SpanInfo};

/// Base trait for adding error span to error types.
///
/// This trait provides the fundamental error span addition method and is dyn-compatible.
/// It serves as the base for the more ergonomic `ErrorSpanExt` trait.
pub trait ErrorSpan {
    /// Adds error span information to the error.
    ///
    /// This is the core method that other error span methods build upon.
    fn add_error_span(&mut self, span: SpanInfo);
}

/// Extension trait providing ergonomic error span addition methods.
///
/// This trait extends `ErrorSpan` with convenient methods for adding error spans
/// when converting or working with errors. It provides both immediate and
/// lazy evaluation options.
pub trait ErrorSpanExt: ErrorSpan {
    /// Wraps the error with error span.
    #[must_use]
    fn error_span(mut self, span: impl Into<Cow<'static, str>>) -> Self
    where
        Self: Sized,
    {
        self.add_error_span(SpanInfo::new(span));
        self
    }

    /// Wraps the error with detailed error span including file and line information.
    #[must_use]
    fn detailed_error_span(mut self, span: impl Into<Cow<'static, str>>, file: &'static str, line: u32) -> Self
    where
        Self: Sized,
    {
        self.add_error_span(SpanInfo::detailed(span, file, line));
        self
    }

    /// Wraps the error with lazily evaluated error span.
    #[must_use]
    fn with_error_span<F, R>(mut self, f: F) -> Self
    where
        F: FnOnce() -> R,
        R: Into<Cow<'static, str>>,
        Self: Sized,
    {
        self.add_error_span(SpanInfo::new(f()));
        self
    }

    /// Wraps the error with lazily evaluated detailed error span including file and line information.
    #[must_use]
    fn with_detailed_error_span<F, R>(mut self, f: F, file: &'static str, line: u32) -> Self
    where
        F: FnOnce() -> R,
        R: Into<Cow<'static, str>>,
        Self: Sized,
    {
        self.add_error_span(SpanInfo::detailed(f(), file, line));
        self
    }
}

impl ErrorSpan for OhnoCore {
    fn add_error_span(&mut self, span: SpanInfo) {
        self.data.context.push(span);
    }
}

impl<T, E> ErrorSpan for Result<T, E>
where
    E: StdError + ErrorSpan,
{
    fn add_error_span(&mut self, span: SpanInfo) {
        if let Err(e) = self {
            e.add_error_span(span);
        }
    }
}

// Blanket implementation: all types that implement ErrorSpan automatically get ErrorSpanExt
impl<T: ErrorSpan> ErrorSpanExt for T {}
