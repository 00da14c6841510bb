//! Crate-local logging macros.

/// Runs the given expression, logging its wall-clock duration at `trace`
/// level once it completes.
macro_rules! trace_timed {
    ($message:expr; $expression:expr) => {{
        let _start_time = ::std::time::Instant::now();
        let _result = $expression;
        ::log::trace!(
            concat!($message, " took {:.3} ms"),
            _start_time.elapsed().as_secs_f64() * 1e3,
        );
        _result
    }};
}

pub(crate) use trace_timed;
