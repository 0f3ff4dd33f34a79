//! Failpoints (feature: `failpoints`).
//!
//! Without the feature `fail_point!` compiles to nothing. With it, a point
//! panics when armed on the current thread, so a test can stop a merge
//! between two file writes without affecting tests running alongside.

#[cfg(feature = "failpoints")]
mod armed {
    use std::cell::RefCell;
    use std::collections::HashSet;

    thread_local! {
        static ARMED: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
    }

    pub fn arm(name: &str) {
        ARMED.with(|set| {
            set.borrow_mut().insert(name.to_string());
        });
    }

    pub fn disarm(name: &str) {
        ARMED.with(|set| {
            set.borrow_mut().remove(name);
        });
    }

    pub fn is_armed(name: &str) -> bool {
        ARMED.with(|set| set.borrow().contains(name))
    }
}

#[cfg(feature = "failpoints")]
pub use armed::{arm, disarm, is_armed};

#[cfg(feature = "failpoints")]
#[macro_export]
macro_rules! fail_point {
    ($name:expr) => {{
        if $crate::failpoints::is_armed($name) {
            panic!("failpoint triggered: {}", $name);
        }
    }};
}

#[cfg(not(feature = "failpoints"))]
#[macro_export]
macro_rules! fail_point {
    ($name:expr) => {
        let _ = $name;
    };
}
