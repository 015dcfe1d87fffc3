//! ADF JSON format tests

mod json;
