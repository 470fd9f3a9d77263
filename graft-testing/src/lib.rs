//! Shared test helpers for the graft crates.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};

/// Run a closure once per entry of a table of test cases.
///
/// Every case is run even if an earlier one fails. Panics are caught, and
/// once all cases have run, a single panic reports how many cases failed
/// along with their debug representations.
///
/// ```
/// use graft_testing::TestCases;
///
/// #[derive(Debug)]
/// struct Case {
///     ndim: usize,
///     axis: isize,
///     expected: usize,
/// }
///
/// let cases = [
///     Case { ndim: 3, axis: -1, expected: 2 },
///     Case { ndim: 3, axis: 0, expected: 0 },
/// ];
///
/// cases.test_each(|case| {
///     let resolved = if case.axis < 0 {
///         (case.ndim as isize + case.axis) as usize
///     } else {
///         case.axis as usize
///     };
///     assert_eq!(resolved, case.expected);
/// });
/// ```
///
/// Cases and anything the closure captures must be unwind safe. Values with
/// interior mutability should be created inside the closure, or wrapped in
/// [`AssertUnwindSafe`](std::panic::AssertUnwindSafe).
pub trait TestCases {
    /// The data for a single case.
    type Case;

    /// Call `test` with a reference to each case.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Call `test` with each case by value.
    ///
    /// The debug representation of each case is captured before it is moved
    /// into the test function.
    fn test_each_value(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe;
}

fn report_failures<D: Debug>(failures: &[D]) {
    assert!(
        failures.is_empty(),
        "{} test cases failed: {:?}",
        failures.len(),
        failures
    );
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        I::Item: Debug + RefUnwindSafe,
    {
        let failures: Vec<I::Item> = self
            .into_iter()
            .filter(|case| std::panic::catch_unwind(|| test(case)).is_err())
            .collect();
        report_failures(&failures);
    }

    fn test_each_value(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        I::Item: Debug + UnwindSafe,
    {
        let test = &test;
        let mut failures = Vec::new();
        for case in self {
            let desc = format!("{:?}", case);
            if std::panic::catch_unwind(move || test(case)).is_err() {
                failures.push(desc);
            }
        }
        report_failures(&failures);
    }
}
