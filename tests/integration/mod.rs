//! Integration tests for batch sprite generation

mod session_input;
mod session_run;
mod test_utils;
