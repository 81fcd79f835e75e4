// Licensed under the Apache-2.0 license

//! Bounded polling.
//!
//! [`poll_bounded`] is a budgeted `nb::block!`: it retries a non-blocking
//! operation while it reports `WouldBlock`, at most `budget` times. The budget
//! counts loop iterations, so the bound is on work done, not on elapsed time.
//! With budget `0` the operation is never polled.

use crate::i2c::error::Error;

/// Poll `op` until it completes or `budget` attempts have been made.
///
/// # Errors
///
/// Returns [`Error::Timeout`] when every attempt reported `WouldBlock`, or
/// the operation's own error converted into [`Error`].
pub fn poll_bounded<T, E>(
    budget: u32,
    mut op: impl FnMut() -> nb::Result<T, E>,
) -> Result<T, Error>
where
    Error: From<E>,
{
    for _ in 0..budget {
        match op() {
            Ok(value) => return Ok(value),
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => return Err(Error::from(e)),
        }
    }
    Err(Error::Timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::error::Fault;
    use core::convert::Infallible;

    fn ready_after(polls: u32) -> impl FnMut() -> nb::Result<u32, Infallible> {
        let mut seen = 0;
        move || {
            seen += 1;
            if seen > polls {
                Ok(seen)
            } else {
                Err(nb::Error::WouldBlock)
            }
        }
    }

    #[test]
    fn zero_budget_never_polls() {
        let mut calls = 0;
        let result = poll_bounded(0, || -> nb::Result<(), Infallible> {
            calls += 1;
            Ok(())
        });
        assert_eq!(result, Err(Error::Timeout));
        assert_eq!(calls, 0);
    }

    #[test]
    fn budget_of_one_polls_once() {
        assert_eq!(poll_bounded(1, ready_after(0)), Ok(1));
        assert_eq!(poll_bounded(1, ready_after(1)), Err(Error::Timeout));
    }

    #[test]
    fn ready_on_last_iteration() {
        assert_eq!(poll_bounded(5, ready_after(4)), Ok(5));
        assert_eq!(poll_bounded(5, ready_after(5)), Err(Error::Timeout));
    }

    #[test]
    fn never_ready_exhausts_budget() {
        let mut calls = 0u32;
        let result = poll_bounded(100, || -> nb::Result<(), Infallible> {
            calls += 1;
            Err(nb::Error::WouldBlock)
        });
        assert_eq!(result, Err(Error::Timeout));
        assert_eq!(calls, 100);
    }

    #[test]
    fn operation_error_is_returned_immediately() {
        let mut calls = 0;
        let result: Result<(), Error> = poll_bounded(10, || {
            calls += 1;
            Err(nb::Error::Other(Error::Protocol(Fault::BusError)))
        });
        assert_eq!(result, Err(Error::Protocol(Fault::BusError)));
        assert_eq!(calls, 1);
    }
}
