//! Custom assertion macros
//!
//! Provides assertion macros with more descriptive failure output.

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that a list of received messages has exactly these kinds, in order
#[macro_export]
macro_rules! assert_kinds {
    ($messages:expr, [$($kind:expr),* $(,)?]) => {{
        let kinds: Vec<&'static str> = $messages.iter().map(|m| m.kind()).collect();
        let expected: Vec<&'static str> = vec![$($kind),*];
        assert_eq!(kinds, expected, "unexpected message kinds");
    }};
}
