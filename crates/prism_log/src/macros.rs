//! Logging macros.

/// Evaluates the expression and returns its value together with the number
/// of milliseconds the evaluation took.
#[doc(hidden)]
#[macro_export]
macro_rules! __timed {
    ($expression:expr) => {{
        let start = ::std::time::Instant::now();
        let value = $expression;
        (value, start.elapsed().as_secs_f64() * 1e3)
    }};
}

/// Evaluates the expression and reports at the info level how long it took.
/// Meant for rare, heavy operations such as tearing down a graphics context.
/// The value of the expression is returned.
#[macro_export]
macro_rules! with_timing_info_logging {
    ($message:expr $(,$arg:expr)*; $expression:expr) => {{
        let (value, ms) = $crate::__timed!($expression);
        $crate::info!(concat!($message, " in {:.2} ms") $(,$arg)*, ms);
        value
    }};
}

/// Like [`with_timing_info_logging`], but reports at the debug level, for
/// operations that happen for every loaded resource.
#[macro_export]
macro_rules! with_timing_debug_logging {
    ($message:expr $(,$arg:expr)*; $expression:expr) => {{
        let (value, ms) = $crate::__timed!($expression);
        $crate::debug!(concat!($message, " in {:.3} ms") $(,$arg)*, ms);
        value
    }};
}

/// Traces the start and end of evaluating the expression, for per-frame
/// steps. The value of the expression is returned.
#[macro_export]
macro_rules! with_trace_logging {
    ($message:expr $(,$arg:expr)*; $expression:expr) => {{
        $crate::trace!(concat!($message, "...") $(,$arg)*);
        let (value, ms) = $crate::__timed!($expression);
        $crate::trace!(concat!($message, " finished after {:.3} ms") $(,$arg)*, ms);
        value
    }};
}
