//! Background drivers: supervised tasks, button, buzzer, LED patterns.

pub mod button;
pub mod buzzer;
pub mod led_patterns;
pub mod pulse_wave;
pub mod task;
pub mod timeout;
