pub mod view;
pub mod vote;
pub mod voter;
