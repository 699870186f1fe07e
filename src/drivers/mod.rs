//! Bus drivers, operator-input debouncing and board bring-up.

pub mod ads1115;
pub mod button;
pub mod expander;
pub mod hw_init;
