pub mod alert;
pub mod guidance;
pub mod sentiment;
pub mod utterance;
